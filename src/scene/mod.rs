mod primitives;

pub use primitives::*;

use bevy::prelude::*;
use std::collections::BTreeMap;
use std::fmt;

use crate::modeling::edit_mesh::EditMesh;
use crate::modeling::picking::{pick_face, world_to_local_ray};

/// Stable identity of an editable object, assigned monotonically by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An editable primitive: identity, transform and owned vertex buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub id: ObjectId,
    pub shape: PrimitiveShape,
    pub transform: Transform,
    pub mesh: EditMesh,
}

impl SceneObject {
    /// Half the largest world-space bounding-box extent.
    pub fn world_radius(&self) -> f32 {
        self.mesh.radius() * self.transform.scale.abs().max_element()
    }

    /// Local-space point to world space.
    pub fn local_to_world(&self, local: Vec3) -> Vec3 {
        self.transform.transform_point(local)
    }
}

/// Result of picking an object with a world-space ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectHit {
    pub id: ObjectId,
    pub point: Vec3,
    pub distance: f32,
}

/// Registry of every editable object in the scene.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    objects: BTreeMap<ObjectId, SceneObject>,
    next_id: u32,
}

impl SceneRegistry {
    /// Reserve a fresh id. Ids are never reused within a registry.
    pub fn allocate_id(&mut self) -> ObjectId {
        self.next_id = self.next_id.max(1);
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register an object, replacing any object with the same id.
    pub fn add(&mut self, object: SceneObject) {
        self.next_id = self.next_id.max(object.id.0 + 1);
        if self.objects.insert(object.id, object).is_some() {
            debug!("Replaced an existing scene object");
        }
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        self.objects.remove(&id)
    }

    pub fn find(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn find_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.keys().copied()
    }

    /// Remove every object and restart id allocation.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.next_id = 1;
    }

    /// Closest object whose surface the ray hits.
    pub fn pick(&self, ray: Ray3d, xray: bool) -> Option<ObjectHit> {
        let mut closest: Option<ObjectHit> = None;

        for object in self.objects.values() {
            let Some(local_ray) = world_to_local_ray(&object.transform, ray) else {
                continue;
            };
            let Some(hit) = pick_face(&object.mesh, local_ray, xray) else {
                continue;
            };
            let point = object.local_to_world(hit.point);
            let distance = point.distance(ray.origin);
            if closest.is_none_or(|c| distance < c.distance) {
                closest = Some(ObjectHit {
                    id: object.id,
                    point,
                    distance,
                });
            }
        }

        closest
    }
}
