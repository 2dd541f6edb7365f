use bevy::prelude::*;

use super::action::{Action, TransformSnapshot};
use crate::constants::tolerance::TRANSFORM_EPSILON;
use crate::scene::{ObjectId, SceneObject, SceneRegistry};

/// Snapshot of an object's transform taken when a whole-object drag starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformCapture {
    pub object: ObjectId,
    pub before: TransformSnapshot,
}

impl TransformCapture {
    pub fn begin(object: &SceneObject) -> Self {
        Self {
            object: object.id,
            before: TransformSnapshot::from(&object.transform),
        }
    }

    /// Diff against the object's current transform.
    ///
    /// Returns `None` if the object is gone or did not move.
    pub fn finish(self, scene: &SceneRegistry) -> Option<Action> {
        let Some(object) = scene.find(self.object) else {
            debug!("Captured object {} no longer exists", self.object);
            return None;
        };
        let after = TransformSnapshot::from(&object.transform);
        if self.before.approx_eq(&after, TRANSFORM_EPSILON) {
            return None;
        }
        Some(Action::Transform {
            object: self.object,
            before: self.before,
            after,
        })
    }
}
