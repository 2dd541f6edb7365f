use bevy::prelude::*;

use crate::constants::tolerance::TRANSFORM_EPSILON;
use crate::scene::{ObjectId, PrimitiveFactory, PrimitiveShape, SceneRegistry};

/// Immutable copy of an object's pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSnapshot {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl From<&Transform> for TransformSnapshot {
    fn from(transform: &Transform) -> Self {
        Self {
            translation: transform.translation,
            rotation: transform.rotation,
            scale: transform.scale,
        }
    }
}

impl From<TransformSnapshot> for Transform {
    fn from(snapshot: TransformSnapshot) -> Self {
        Transform {
            translation: snapshot.translation,
            rotation: snapshot.rotation,
            scale: snapshot.scale,
        }
    }
}

impl TransformSnapshot {
    /// Component-wise comparison; `q` and `-q` are the same rotation.
    pub fn approx_eq(&self, other: &TransformSnapshot, epsilon: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, epsilon)
            && self.scale.abs_diff_eq(other.scale, epsilon)
            && (self.rotation.abs_diff_eq(other.rotation, epsilon)
                || self.rotation.abs_diff_eq(-other.rotation, epsilon))
    }
}

/// Everything needed to bring an object back after it was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionItem {
    pub shape: PrimitiveShape,
    pub id: ObjectId,
    pub transform: TransformSnapshot,
    /// Vertex buffer at the time of removal, so sub-element edits survive
    pub positions: Option<Vec<Vec3>>,
}

/// A reversible scene edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Add {
        items: Vec<ActionItem>,
    },
    Delete {
        items: Vec<ActionItem>,
    },
    Transform {
        object: ObjectId,
        before: TransformSnapshot,
        after: TransformSnapshot,
    },
    SubEdit {
        object: ObjectId,
        /// Unique vertex indices, ascending
        indices: Vec<u32>,
        /// Local-space displacement added to every index
        delta: Vec3,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Inverse,
}

impl Action {
    /// Label for history listings and logs
    pub fn description(&self) -> String {
        match self {
            Action::Add { items } => match items.as_slice() {
                [item] => format!("Add {} {}", item.shape.display_name(), item.id),
                _ => format!("Add {} objects", items.len()),
            },
            Action::Delete { items } => match items.as_slice() {
                [item] => format!("Delete {} {}", item.shape.display_name(), item.id),
                _ => format!("Delete {} objects", items.len()),
            },
            Action::Transform { object, .. } => format!("Transform {object}"),
            Action::SubEdit {
                object, indices, ..
            } => format!("Move {} vertices of {object}", indices.len()),
        }
    }

    /// Objects this action touches.
    pub fn objects(&self) -> Vec<ObjectId> {
        match self {
            Action::Add { items } | Action::Delete { items } => {
                items.iter().map(|item| item.id).collect()
            }
            Action::Transform { object, .. } | Action::SubEdit { object, .. } => vec![*object],
        }
    }

    /// `true` for actions that would not change anything when replayed.
    pub fn is_no_op(&self) -> bool {
        match self {
            Action::Add { items } | Action::Delete { items } => items.is_empty(),
            Action::Transform { before, after, .. } => before.approx_eq(after, TRANSFORM_EPSILON),
            Action::SubEdit { indices, delta, .. } => {
                indices.is_empty() || delta.length() < TRANSFORM_EPSILON
            }
        }
    }

    /// Replay the action onto the scene.
    pub fn apply(
        &self,
        direction: Direction,
        scene: &mut SceneRegistry,
        factory: &dyn PrimitiveFactory,
    ) {
        match (self, direction) {
            (Action::Add { items }, Direction::Forward)
            | (Action::Delete { items }, Direction::Inverse) => {
                instantiate(items, scene, factory);
            }
            (Action::Add { items }, Direction::Inverse)
            | (Action::Delete { items }, Direction::Forward) => {
                for item in items {
                    if scene.remove(item.id).is_none() {
                        warn!("Object {} already gone", item.id);
                    }
                }
            }
            (Action::Transform { object, before, after }, _) => {
                let Some(target) = scene.find_mut(*object) else {
                    warn!("Transform target {object} not found");
                    return;
                };
                let snapshot = match direction {
                    Direction::Forward => after,
                    Direction::Inverse => before,
                };
                target.transform = (*snapshot).into();
            }
            (Action::SubEdit { object, indices, delta }, _) => {
                let Some(target) = scene.find_mut(*object) else {
                    warn!("Sub-element target {object} not found");
                    return;
                };
                let delta = match direction {
                    Direction::Forward => *delta,
                    Direction::Inverse => -*delta,
                };
                target.mesh.translate_vertices(indices, delta);
                target.mesh.recompute();
            }
        }
    }
}

fn instantiate(items: &[ActionItem], scene: &mut SceneRegistry, factory: &dyn PrimitiveFactory) {
    for item in items {
        let mut object = factory.create(item.shape, item.id);
        object.transform = item.transform.into();
        if let Some(positions) = &item.positions {
            if object.mesh.restore_positions(positions) {
                object.mesh.recompute();
            }
        }
        scene.add(object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MeshPrimitiveFactory;

    fn cube_item(id: u32, translation: Vec3) -> ActionItem {
        ActionItem {
            shape: PrimitiveShape::Cube,
            id: ObjectId(id),
            transform: TransformSnapshot::from(&Transform::from_translation(translation)),
            positions: None,
        }
    }

    #[test]
    fn add_and_delete_mirror_each_other() {
        let mut scene = SceneRegistry::default();
        let add = Action::Add {
            items: vec![cube_item(1, Vec3::X)],
        };

        add.apply(Direction::Forward, &mut scene, &MeshPrimitiveFactory);
        assert_eq!(scene.find(ObjectId(1)).unwrap().transform.translation, Vec3::X);

        let delete = Action::Delete {
            items: vec![cube_item(1, Vec3::X)],
        };
        delete.apply(Direction::Forward, &mut scene, &MeshPrimitiveFactory);
        assert!(scene.is_empty());
        delete.apply(Direction::Inverse, &mut scene, &MeshPrimitiveFactory);
        assert!(scene.contains(ObjectId(1)));
        add.apply(Direction::Inverse, &mut scene, &MeshPrimitiveFactory);
        assert!(scene.is_empty());
    }

    #[test]
    fn delete_inverse_restores_edited_positions() {
        let mut scene = SceneRegistry::default();
        let mut object = MeshPrimitiveFactory.create(PrimitiveShape::Cube, ObjectId(3));
        object.mesh.translate_vertices(&[0], Vec3::Y);
        object.mesh.recompute();
        let positions = object.mesh.positions().to_vec();

        let delete = Action::Delete {
            items: vec![ActionItem {
                positions: Some(positions.clone()),
                ..cube_item(3, Vec3::ZERO)
            }],
        };
        delete.apply(Direction::Inverse, &mut scene, &MeshPrimitiveFactory);
        assert_eq!(scene.find(ObjectId(3)).unwrap().mesh.positions(), positions.as_slice());
    }

    #[test]
    fn sub_edit_forward_then_inverse_is_identity() {
        let mut scene = SceneRegistry::default();
        scene.add(MeshPrimitiveFactory.create(PrimitiveShape::Cube, ObjectId(1)));
        let original = scene.find(ObjectId(1)).unwrap().mesh.positions().to_vec();

        let edit = Action::SubEdit {
            object: ObjectId(1),
            indices: vec![0, 5],
            delta: Vec3::new(0.0, 1.0, 0.0),
        };
        edit.apply(Direction::Forward, &mut scene, &MeshPrimitiveFactory);
        let moved = scene.find(ObjectId(1)).unwrap().mesh.position(5).unwrap();
        assert!(moved.abs_diff_eq(original[5] + Vec3::Y, 1e-6));

        edit.apply(Direction::Inverse, &mut scene, &MeshPrimitiveFactory);
        let restored = scene.find(ObjectId(1)).unwrap().mesh.positions();
        for (a, b) in restored.iter().zip(&original) {
            assert!(a.abs_diff_eq(*b, 1e-6));
        }
    }

    #[test]
    fn missing_targets_are_skipped() {
        let mut scene = SceneRegistry::default();
        let edit = Action::Transform {
            object: ObjectId(9),
            before: TransformSnapshot::from(&Transform::IDENTITY),
            after: TransformSnapshot::from(&Transform::from_xyz(1.0, 0.0, 0.0)),
        };
        edit.apply(Direction::Forward, &mut scene, &MeshPrimitiveFactory);
        assert!(scene.is_empty());
    }

    #[test]
    fn negated_quaternion_is_the_same_rotation() {
        let q = Quat::from_rotation_y(0.7);
        let a = TransformSnapshot::from(&Transform::from_rotation(q));
        let b = TransformSnapshot::from(&Transform::from_rotation(-q));
        assert!(a.approx_eq(&b, 1e-6));
    }

    #[test]
    fn descriptions_name_the_edit() {
        let add = Action::Add {
            items: vec![cube_item(1, Vec3::ZERO)],
        };
        assert_eq!(add.description(), "Add Box #1");
        let edit = Action::SubEdit {
            object: ObjectId(2),
            indices: vec![1, 2, 3],
            delta: Vec3::X,
        };
        assert_eq!(edit.description(), "Move 3 vertices of #2");
        assert_eq!(edit.objects(), vec![ObjectId(2)]);
    }
}
