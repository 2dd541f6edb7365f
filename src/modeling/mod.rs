//! Sub-element editing: the editable vertex buffer, picking, grouping of
//! coincident vertices and the staged selection transform.
//!
//! Vertices, edges and faces are picked with a ray, classified into groups
//! with stable keys and toggled into a multi-selection. Movement accumulates
//! against a baseline until it is committed as one undoable action or
//! cancelled back to the baseline.

pub mod edit_mesh;
pub mod grouping;
pub mod picking;
pub mod stage;
pub mod triggers;

pub use edit_mesh::{Edge, EditMesh, FaceIndex};
pub use grouping::{ElementGroup, ElementKind, SelectionKey};
pub use stage::{Baseline, FlagsPatch, SelectionGroup, StagePhase, SubEditStage, SubElementFlags};
pub use triggers::{TapOutcome, TriggerItem, TriggerLayer};
