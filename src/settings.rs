use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::constants::{sizes, tolerance};

/// Camera dolly tuning used while dragging near the edge of the view
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DollySettings {
    /// Whether the dolly heuristic runs at all
    pub enabled: bool,
    /// NDC margin from the frustum edge that triggers the dolly (0..1)
    pub edge_margin: f32,
    /// Extra distance per unit of moved distance, relative to object size
    pub gain: f32,
    /// Interpolation factor toward the target distance per pointer move
    pub smoothing: f32,
    /// Closest the camera may get to its target
    pub min_distance: f32,
    /// Farthest the camera may get from its target
    pub max_distance: f32,
}

impl Default for DollySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            edge_margin: 0.15,
            gain: 0.5,
            smoothing: 0.15,
            min_distance: 2.0,
            max_distance: 200.0,
        }
    }
}

/// Editor settings that persist to disk
#[derive(Resource, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EditSettings {
    /// Maximum number of undo history entries
    pub undo_history_size: usize,
    /// Quantization step for merging coincident vertices
    pub group_epsilon: f32,
    /// Accumulated sub-element movement below this is not recorded
    pub commit_epsilon: f32,
    /// World-space vertex pick radius
    pub vertex_pick_radius: f32,
    /// World-space edge pick radius
    pub edge_pick_radius: f32,
    /// When true, face picking also hits back-facing triangles
    pub xray_selection: bool,
    /// Show tappable orbs over sub-elements instead of picking by double tap
    pub trigger_orbs: bool,
    /// Radians per pixel of pointer motion for rotate handles
    pub rotate_sensitivity: f32,
    /// Scale units per pixel of pointer motion for scale handles
    pub scale_sensitivity: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Gizmo size multiplier
    pub gizmo_scale: f32,
    pub dolly: DollySettings,
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            undo_history_size: 100,
            group_epsilon: tolerance::GROUP_EPSILON,
            commit_epsilon: tolerance::COMMIT_EPSILON,
            vertex_pick_radius: sizes::VERTEX_PICK_RADIUS,
            edge_pick_radius: sizes::EDGE_PICK_RADIUS,
            xray_selection: false,
            trigger_orbs: false,
            rotate_sensitivity: 0.01,
            scale_sensitivity: 0.01,
            min_scale: 0.01,
            max_scale: 100.0,
            gizmo_scale: 1.0,
            dolly: DollySettings::default(),
        }
    }
}

impl EditSettings {
    /// Get the settings file path
    fn file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("bevy_primitive_editor");
            p.push("settings.ron");
            p
        })
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::file_path() else {
            return Self::default();
        };

        match fs::read_to_string(&path) {
            Ok(content) => Self::from_ron(&content).unwrap_or_else(|| {
                warn!("Ignoring malformed settings file {:?}", path);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Parse settings from RON text; missing fields take their defaults.
    pub fn from_ron(content: &str) -> Option<Self> {
        ron::from_str::<Self>(content).ok().map(Self::sanitized)
    }

    /// Save settings to disk
    pub fn save(&self) {
        let Some(path) = Self::file_path() else {
            error!("Could not determine config directory");
            return;
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory: {}", e);
                return;
            }
        }

        match ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            Ok(content) => {
                if let Err(e) = fs::write(&path, content) {
                    error!("Failed to save settings: {}", e);
                } else {
                    info!("Settings saved to: {:?}", path);
                }
            }
            Err(e) => {
                error!("Failed to serialize settings: {}", e);
            }
        }
    }

    /// Replace values that would break the engine (zero grid, inverted scale range).
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.group_epsilon.is_finite() && self.group_epsilon > 0.0) {
            self.group_epsilon = defaults.group_epsilon;
        }
        if !(self.commit_epsilon.is_finite() && self.commit_epsilon >= 0.0) {
            self.commit_epsilon = defaults.commit_epsilon;
        }
        if !(self.min_scale > 0.0 && self.min_scale <= self.max_scale) {
            self.min_scale = defaults.min_scale;
            self.max_scale = defaults.max_scale;
        }
        if self.undo_history_size == 0 {
            self.undo_history_size = defaults.undo_history_size;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let settings = EditSettings::from_ron("(undo_history_size: 7)").unwrap();
        assert_eq!(settings.undo_history_size, 7);
        assert_eq!(settings.group_epsilon, tolerance::GROUP_EPSILON);
        assert_eq!(settings.dolly, DollySettings::default());
    }

    #[test]
    fn invalid_values_are_replaced() {
        let settings =
            EditSettings::from_ron("(group_epsilon: 0.0, min_scale: 5.0, max_scale: 1.0)").unwrap();
        assert_eq!(settings.group_epsilon, tolerance::GROUP_EPSILON);
        assert_eq!(settings.min_scale, 0.01);
        assert_eq!(settings.max_scale, 100.0);
    }

    #[test]
    fn round_trips_through_ron() {
        let mut settings = EditSettings::default();
        settings.xray_selection = true;
        settings.dolly.gain = 2.0;
        let text = ron::ser::to_string_pretty(&settings, ron::ser::PrettyConfig::default()).unwrap();
        assert_eq!(EditSettings::from_ron(&text), Some(settings));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(EditSettings::from_ron("not ron at all {").is_none());
    }
}
