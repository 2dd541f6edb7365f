//! # Bevy Primitive Editor
//!
//! Gizmo-driven editing of primitive meshes for Bevy, with transactional
//! undo/redo.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bevy::prelude::*;
//! use bevy_primitive_editor::EditorPlugin;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(EditorPlugin)
//!         .run();
//! }
//! ```
//!
//! ## Editing
//!
//! - **Object mode**: drag the gizmo to translate (`Q`), rotate (`W`) or
//!   scale (`E`) the selected primitive. Every drag is one undo step.
//! - **Sub-element mode** (`Tab`): double-click vertices, edges or faces to
//!   build a selection and drag it. Moves stay staged until `Enter` commits
//!   them or `Escape` reverts them.
//! - `Ctrl+Z` / `Ctrl+Shift+Z` undo and redo. `Shift+1..6` add primitives.
//!
//! All state lives in the [`EditSession`] resource, which can also be driven
//! directly without a window.

pub mod commands;
pub mod constants;
pub mod editor;
pub mod gizmos;
pub mod modeling;
pub mod scene;
pub mod settings;

// Re-export the main plugin and session
pub use editor::{EditMode, EditSession, EditorPlugin, TransformField, TransformOperation};

// Re-export commonly used types
pub use scene::{ObjectId, PrimitiveShape, SceneObject, SceneRegistry};
pub use settings::EditSettings;

// Re-export editor events
pub use editor::{
    CancelSubEditEvent, ConfirmSubEditEvent, DeleteSelectedEvent, SetEditModeEvent,
    SetSubElementFlagsEvent, SpawnPrimitiveEvent,
};

// Re-export command/history types
pub use commands::{Action, ActionLog, RedoEvent, UndoEvent};
