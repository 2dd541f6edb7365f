//! Centralized constants for the editor
//!
//! Tolerances, pick radii and default values shared by the edit engine.

use bevy::prelude::*;

/// Numeric tolerances
pub mod tolerance {
    /// Grid resolution used to coalesce coincident vertices in merge mode
    pub const GROUP_EPSILON: f32 = 1e-4;
    /// Minimum accumulated sub-element delta length worth recording
    pub const COMMIT_EPSILON: f32 = 1e-6;
    /// Per-component tolerance for considering two transforms equal
    pub const TRANSFORM_EPSILON: f32 = 1e-6;
    /// Cross products shorter than this are treated as degenerate
    pub const DEGENERATE_LENGTH: f32 = 1e-6;
    /// Rays closer to parallel than this never intersect a plane
    pub const PARALLEL_EPSILON: f32 = 1e-8;
}

/// Default sizes for picking and gizmos
pub mod sizes {
    /// Length of gizmo axes
    pub const GIZMO_LENGTH: f32 = 1.5;
    /// Click radius for gizmo axis detection (scaled by camera distance)
    pub const GIZMO_CLICK_RADIUS: f32 = 0.15;
    /// Radius of the centre handle used for free/uniform drags
    pub const GIZMO_CENTER_RADIUS: f32 = 0.2;
    /// Gizmo scale used while editing sub-elements
    pub const SUB_ELEMENT_GIZMO_SCALE: f32 = 0.5;
    /// World distance from the pick ray within which a vertex is hit
    pub const VERTEX_PICK_RADIUS: f32 = 0.1;
    /// World distance from the pick ray within which an edge is hit
    pub const EDGE_PICK_RADIUS: f32 = 0.05;
    /// Smallest object radius used by the camera dolly heuristic
    pub const MIN_OBJECT_RADIUS: f32 = 0.05;
}

/// Gizmo axis colors
pub mod gizmo_colors {
    use super::*;

    pub const X: Color = Color::srgb(1.0, 0.2, 0.2);
    pub const Y: Color = Color::srgb(0.2, 1.0, 0.2);
    pub const Z: Color = Color::srgb(0.2, 0.2, 1.0);
    pub const CENTER: Color = Color::srgb(1.0, 1.0, 1.0);
    /// Selected sub-element markers
    pub const SELECTED: Color = Color::srgb(0.2, 0.7, 1.0);
    /// Unselected sub-element markers
    pub const UNSELECTED: Color = Color::srgba(1.0, 1.0, 1.0, 0.6);
}
