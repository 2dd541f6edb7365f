//! Tappable orbs over every pickable sub-element.
//!
//! An alternative to ray picking on touch screens: each vertex group, edge and
//! face gets a sphere at its centre sized by camera distance. Taps route
//! through [`SubEditStage::toggle_group`], so the selection contract is the
//! same as with direct picking.

use bevy::prelude::*;

use super::grouping::{build_vertex_groups, face_group, ElementGroup, SelectionKey};
use super::picking::ray_segment_approach;
use super::stage::{SubEditStage, SubElementFlags};
use crate::scene::{ObjectId, SceneObject};

/// Orb radius relative to the distance-scaled trigger size
const ORB_SCALE: f32 = 0.35;
/// Group orb radius relative to the distance-scaled trigger size
const GROUP_ORB_SCALE: f32 = 0.45;
/// Trigger size per unit of camera distance
const DISTANCE_FACTOR: f32 = 0.03;
const MIN_TRIGGER_SIZE: f32 = 0.02;

/// One tappable element.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerItem {
    pub group: ElementGroup,
    pub center_local: Vec3,
}

/// What a tap did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapOutcome {
    /// Nothing was hit, or the tap was ignored
    None,
    /// Selection changed; no gizmo yet
    Toggled,
    /// Show the transform gizmo at `center` (world space)
    ShowGizmo { center: Vec3 },
}

#[derive(Debug, Clone, Default)]
pub struct TriggerLayer {
    object: Option<ObjectId>,
    items: Vec<TriggerItem>,
    size: f32,
    multi: bool,
    finished: bool,
}

impl TriggerLayer {
    /// Rebuild items for the enabled kinds of `object`.
    pub fn build(&mut self, object: &SceneObject, flags: SubElementFlags, epsilon: f32) {
        let mesh = &object.mesh;
        self.items.clear();
        self.object = Some(object.id);

        if flags.verts {
            if flags.explode {
                self.items.extend((0..mesh.vertex_count() as u32).map(|i| TriggerItem {
                    group: ElementGroup {
                        key: SelectionKey::Vertex(i),
                        indices: vec![i],
                    },
                    center_local: mesh.centroid(&[i]),
                }));
            } else {
                let mut groups: Vec<_> = build_vertex_groups(mesh, epsilon).into_iter().collect();
                groups.sort_unstable_by_key(|(_, indices)| indices[0]);
                self.items.extend(groups.into_iter().map(|(key, indices)| TriggerItem {
                    center_local: mesh.centroid(&indices),
                    group: ElementGroup {
                        key: SelectionKey::MergedVertex(key),
                        indices,
                    },
                }));
            }
        }

        if flags.edges {
            self.items.extend(mesh.unique_edges().into_iter().map(|edge| TriggerItem {
                group: ElementGroup {
                    key: SelectionKey::Edge([edge.0, edge.1]),
                    indices: vec![edge.0, edge.1],
                },
                center_local: mesh.centroid(&[edge.0, edge.1]),
            }));
        }

        if flags.faces {
            self.items.extend(mesh.triangles().iter().map(|tri| {
                let group = face_group(*tri);
                TriggerItem {
                    center_local: mesh.centroid(&group.indices),
                    group,
                }
            }));
        }

        debug!("Built {} trigger orbs for {}", self.items.len(), object.id);
    }

    pub fn clear(&mut self) {
        self.object = None;
        self.items.clear();
        self.multi = false;
        self.finished = false;
    }

    pub fn object(&self) -> Option<ObjectId> {
        self.object
    }

    pub fn items(&self) -> &[TriggerItem] {
        &self.items
    }

    /// Size orbs for the current camera distance.
    pub fn update(&mut self, transform: &Transform, camera_position: Vec3) {
        let distance = camera_position.distance(transform.translation);
        self.size = (DISTANCE_FACTOR * distance).max(MIN_TRIGGER_SIZE);
    }

    pub fn orb_radius(&self) -> f32 {
        self.size.max(MIN_TRIGGER_SIZE) * ORB_SCALE
    }

    pub fn group_orb_radius(&self) -> f32 {
        self.size.max(MIN_TRIGGER_SIZE) * GROUP_ORB_SCALE
    }

    /// Start multi-select: taps toggle without showing the gizmo.
    pub fn begin_multi(&mut self) {
        self.multi = true;
        self.finished = false;
    }

    /// Close multi-select. Returns `true` if the group orb should be shown.
    pub fn finish_multi(&mut self, stage: &SubEditStage) -> bool {
        if !self.multi {
            return false;
        }
        self.finished = true;
        stage.selection().len() >= 2
    }

    /// Leave multi-select entirely.
    pub fn end_multi(&mut self) {
        self.multi = false;
        self.finished = false;
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    /// World position of the group orb, when it is visible.
    pub fn group_orb(&self, object: &SceneObject, stage: &SubEditStage) -> Option<Vec3> {
        if !(self.multi && self.finished) || stage.selection().len() < 2 {
            return None;
        }
        stage.selection_world_center(object)
    }

    /// Nearest item whose orb the ray passes through.
    fn hit_item(&self, ray: Ray3d, object: &SceneObject) -> Option<&TriggerItem> {
        let radius = self.orb_radius();
        self.items
            .iter()
            .filter_map(|item| {
                let center = object.local_to_world(item.center_local);
                let approach = ray_segment_approach(ray.origin, *ray.direction, center, center);
                (approach.gap() <= radius).then_some((item, approach.along))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(item, _)| item)
    }

    /// Route a tap at `ray` to the stage.
    pub fn tap(&self, ray: Ray3d, object: &SceneObject, stage: &mut SubEditStage) -> TapOutcome {
        if self.object != Some(object.id) {
            return TapOutcome::None;
        }
        stage.ensure_baseline(object);

        if let Some(center) = self.group_orb_hit(ray, object, stage) {
            return TapOutcome::ShowGizmo { center };
        }

        let Some(item) = self.hit_item(ray, object) else {
            return TapOutcome::None;
        };

        if self.multi && self.finished {
            if !stage.is_selected(&item.group.key) {
                return TapOutcome::None;
            }
            return stage
                .selection_world_center(object)
                .map_or(TapOutcome::None, |center| TapOutcome::ShowGizmo { center });
        }

        if stage.has_pending_delta() {
            debug!("Tap on {} ignored until the staged edit is committed", item.group.key);
            return TapOutcome::None;
        }
        if self.multi {
            stage.toggle_group(item.group.clone(), &object.mesh);
            return TapOutcome::Toggled;
        }
        if !stage.toggle_group(item.group.clone(), &object.mesh) {
            return TapOutcome::Toggled;
        }
        TapOutcome::ShowGizmo {
            center: object.local_to_world(item.center_local),
        }
    }

    /// Whether [`TriggerLayer::tap`] with this ray would add or remove a group.
    pub fn toggles_selection(&self, ray: Ray3d, object: &SceneObject, stage: &SubEditStage) -> bool {
        if self.object != Some(object.id) || (self.multi && self.finished) {
            return false;
        }
        if self.group_orb_hit(ray, object, stage).is_some() {
            return false;
        }
        self.hit_item(ray, object).is_some()
    }

    fn group_orb_hit(&self, ray: Ray3d, object: &SceneObject, stage: &SubEditStage) -> Option<Vec3> {
        let center = self.group_orb(object, stage)?;
        let gap = ray_segment_approach(ray.origin, *ray.direction, center, center).gap();
        (gap <= self.group_orb_radius()).then_some(center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::tolerance::GROUP_EPSILON;
    use crate::modeling::edit_mesh::tests::make_quad_with_seam;
    use crate::scene::PrimitiveShape;

    fn quad_object() -> SceneObject {
        SceneObject {
            id: ObjectId(1),
            shape: PrimitiveShape::Plane,
            transform: Transform::IDENTITY,
            mesh: make_quad_with_seam(),
        }
    }

    fn down_z(x: f32, y: f32) -> Ray3d {
        Ray3d::new(Vec3::new(x, y, 5.0), Dir3::NEG_Z)
    }

    fn layer_for(object: &SceneObject, flags: SubElementFlags) -> TriggerLayer {
        let mut layer = TriggerLayer::default();
        layer.build(object, flags, GROUP_EPSILON);
        layer.update(&object.transform, Vec3::new(0.0, 0.0, 10.0));
        layer
    }

    #[test]
    fn builds_one_orb_per_enabled_element() {
        let object = quad_object();
        let merged = layer_for(&object, SubElementFlags::default());
        assert_eq!(merged.items().len(), 4);

        let everything = layer_for(
            &object,
            SubElementFlags {
                verts: true,
                edges: true,
                faces: true,
                explode: true,
            },
        );
        assert_eq!(everything.items().len(), 5 + 6 + 2);
    }

    #[test]
    fn orb_size_follows_camera_distance() {
        let object = quad_object();
        let mut layer = layer_for(&object, SubElementFlags::default());
        assert!((layer.orb_radius() - 0.3 * ORB_SCALE).abs() < 1e-6);

        layer.update(&object.transform, Vec3::new(0.0, 0.0, 0.1));
        assert!((layer.orb_radius() - MIN_TRIGGER_SIZE * ORB_SCALE).abs() < 1e-6);
    }

    #[test]
    fn single_tap_selects_and_shows_gizmo() {
        let object = quad_object();
        let layer = layer_for(&object, SubElementFlags::default());
        let mut stage = SubEditStage::default();

        let outcome = layer.tap(down_z(1.0, 0.0), &object, &mut stage);
        assert_eq!(
            outcome,
            TapOutcome::ShowGizmo {
                center: Vec3::new(1.0, 0.0, 0.0)
            }
        );
        assert_eq!(stage.selected_indices(), vec![3]);

        assert_eq!(layer.tap(down_z(1.0, 0.0), &object, &mut stage), TapOutcome::Toggled);
        assert!(!stage.has_selection());
        assert_eq!(layer.tap(down_z(0.5, 0.5), &object, &mut stage), TapOutcome::None);
    }

    #[test]
    fn multi_select_waits_for_finish() {
        let object = quad_object();
        let mut layer = layer_for(&object, SubElementFlags::default());
        let mut stage = SubEditStage::default();

        layer.begin_multi();
        assert_eq!(layer.tap(down_z(0.0, 0.0), &object, &mut stage), TapOutcome::Toggled);
        assert_eq!(layer.tap(down_z(1.0, 0.0), &object, &mut stage), TapOutcome::Toggled);
        assert!(layer.group_orb(&object, &stage).is_none());

        assert!(layer.finish_multi(&stage));
        let center = layer.group_orb(&object, &stage).unwrap();
        assert!(center.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-6));

        // Group orb sits between the two selected corners.
        assert_eq!(
            layer.tap(down_z(0.5, 0.0), &object, &mut stage),
            TapOutcome::ShowGizmo { center }
        );
        // Unselected items are ignored once finished.
        assert_eq!(layer.tap(down_z(0.0, 1.0), &object, &mut stage), TapOutcome::None);
        assert_eq!(stage.selection().len(), 2);
        // Selected items also bring up the gizmo.
        assert_eq!(
            layer.tap(down_z(1.0, 0.0), &object, &mut stage),
            TapOutcome::ShowGizmo { center }
        );
    }

    #[test]
    fn taps_on_another_object_are_ignored() {
        let object = quad_object();
        let layer = layer_for(&object, SubElementFlags::default());
        let mut other = quad_object();
        other.id = ObjectId(2);
        let mut stage = SubEditStage::default();
        assert_eq!(layer.tap(down_z(0.0, 0.0), &other, &mut stage), TapOutcome::None);
        assert!(!stage.has_selection());
    }

    #[test]
    fn taps_wait_for_staged_edits() {
        let mut object = quad_object();
        let mut layer = layer_for(&object, SubElementFlags::default());
        let mut stage = SubEditStage::default();

        layer.tap(down_z(1.0, 0.0), &object, &mut stage);
        stage.apply_world_delta(&mut object, Vec3::Z);
        layer.build(&object, stage.flags(), GROUP_EPSILON);

        assert!(layer.toggles_selection(down_z(0.0, 0.0), &object, &stage));
        assert_eq!(layer.tap(down_z(0.0, 0.0), &object, &mut stage), TapOutcome::None);
        assert_eq!(stage.selected_indices(), vec![3]);

        stage.commit(Some(object.id)).unwrap();
        stage.rebaseline(&object);
        assert_eq!(
            layer.tap(down_z(0.0, 0.0), &object, &mut stage),
            TapOutcome::ShowGizmo { center: Vec3::ZERO }
        );
        // The moved corner toggles off at its new position
        assert_eq!(layer.tap(down_z(1.0, 0.0), &object, &mut stage), TapOutcome::Toggled);
        assert_eq!(stage.selected_indices(), vec![2]);
    }
}
