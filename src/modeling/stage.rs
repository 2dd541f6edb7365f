//! Sub-element selection and staged transform.
//!
//! The stage owns one baseline (a full copy of an object's vertex buffer), the
//! current multi-selection and the local delta accumulated since the baseline.
//! The live buffer always equals the baseline plus the accumulated delta on the
//! selected indices, which is what makes [`SubEditStage::cancel`] exact and
//! [`SubEditStage::commit`] a single `SubEdit` action. The selection cannot
//! change while a delta is pending: callers commit (or cancel) first.

use bevy::prelude::*;

use super::edit_mesh::EditMesh;
use super::grouping::{
    edge_group, face_group, quantize, vertex_group, ElementGroup, ElementKind, SelectionKey,
};
use super::picking::{
    pick_edge_point, pick_face, pick_vertex, world_to_local_direction, world_to_local_point,
    world_to_local_ray,
};
use crate::commands::Action;
use crate::scene::{ObjectId, SceneObject};
use crate::settings::EditSettings;

/// Which sub-element kinds are pickable, and how vertices group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubElementFlags {
    pub verts: bool,
    pub edges: bool,
    pub faces: bool,
    /// Every buffer index is its own vertex instead of merging coincident ones
    pub explode: bool,
}

impl Default for SubElementFlags {
    fn default() -> Self {
        Self {
            verts: true,
            edges: false,
            faces: false,
            explode: false,
        }
    }
}

impl SubElementFlags {
    pub fn apply(&mut self, patch: FlagsPatch) {
        if let Some(verts) = patch.verts {
            self.verts = verts;
        }
        if let Some(edges) = patch.edges {
            self.edges = edges;
        }
        if let Some(faces) = patch.faces {
            self.faces = faces;
        }
        if let Some(explode) = patch.explode {
            self.explode = explode;
        }
    }

    pub fn allows(&self, kind: ElementKind) -> bool {
        match kind {
            ElementKind::Vertex => self.verts,
            ElementKind::Edge => self.edges,
            ElementKind::Face => self.faces,
        }
    }
}

/// Partial update of [`SubElementFlags`]; `None` fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagsPatch {
    pub verts: Option<bool>,
    pub edges: Option<bool>,
    pub faces: Option<bool>,
    pub explode: Option<bool>,
}

/// One selected element.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionGroup {
    pub kind: ElementKind,
    pub key: SelectionKey,
    pub indices: Vec<u32>,
    /// Mean of the group's current local positions
    pub centroid_local: Vec3,
}

/// Vertex buffer snapshot a staged edit is measured against.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub object: ObjectId,
    pub positions: Vec<Vec3>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePhase {
    /// Nothing selected
    Idle,
    /// A selection exists on the baseline object
    Staged,
}

#[derive(Debug, Clone)]
pub struct SubEditStage {
    flags: SubElementFlags,
    selection: Vec<SelectionGroup>,
    baseline: Option<Baseline>,
    accumulated: Vec3,
    group_epsilon: f32,
    commit_epsilon: f32,
    vertex_pick_radius: f32,
    edge_pick_radius: f32,
    xray: bool,
}

impl Default for SubEditStage {
    fn default() -> Self {
        Self::new(&EditSettings::default())
    }
}

impl SubEditStage {
    pub fn new(settings: &EditSettings) -> Self {
        Self {
            flags: SubElementFlags::default(),
            selection: Vec::new(),
            baseline: None,
            accumulated: Vec3::ZERO,
            group_epsilon: settings.group_epsilon,
            commit_epsilon: settings.commit_epsilon,
            vertex_pick_radius: settings.vertex_pick_radius,
            edge_pick_radius: settings.edge_pick_radius,
            xray: settings.xray_selection,
        }
    }

    pub fn flags(&self) -> SubElementFlags {
        self.flags
    }

    /// Update pick flags. The current selection is kept.
    pub fn set_flags(&mut self, patch: FlagsPatch) {
        self.flags.apply(patch);
        debug!("Sub-element flags now {:?}", self.flags);
    }

    pub fn phase(&self) -> StagePhase {
        if self.baseline.is_some() && self.has_selection() {
            StagePhase::Staged
        } else {
            StagePhase::Idle
        }
    }

    /// Object the baseline (and therefore the selection) belongs to.
    pub fn object(&self) -> Option<ObjectId> {
        self.baseline.as_ref().map(|b| b.object)
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    /// Local delta applied since the baseline.
    pub fn pending_delta(&self) -> Vec3 {
        self.accumulated
    }

    pub fn has_pending_delta(&self) -> bool {
        self.accumulated.length() >= self.commit_epsilon
    }

    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    pub fn selection(&self) -> &[SelectionGroup] {
        &self.selection
    }

    pub fn is_selected(&self, key: &SelectionKey) -> bool {
        self.selection.iter().any(|g| g.key == *key)
    }

    /// Sorted, deduplicated union of every selected group's indices.
    pub fn selected_indices(&self) -> Vec<u32> {
        let mut indices: Vec<u32> = self
            .selection
            .iter()
            .flat_map(|g| g.indices.iter().copied())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Mean of the selected groups' world-space centroids.
    pub fn selection_world_center(&self, object: &SceneObject) -> Option<Vec3> {
        if self.selection.is_empty() || self.object() != Some(object.id) {
            return None;
        }
        let sum: Vec3 = self
            .selection
            .iter()
            .map(|g| object.local_to_world(g.centroid_local))
            .sum();
        Some(sum / self.selection.len() as f32)
    }

    /// Pick an element under `ray` and toggle it in the selection.
    ///
    /// Returns `true` when a group was added or removed.
    pub fn toggle_pick(&mut self, ray: Ray3d, object: &SceneObject) -> bool {
        self.ensure_baseline(object);

        let Some(group) = self.classify_pick(ray, object) else {
            return false;
        };
        if self.has_pending_delta() {
            debug!("Selection is locked until the staged edit is committed");
            return false;
        }
        self.toggle_group(group, &object.mesh);
        true
    }

    /// Add `group` if its key is absent, otherwise remove it.
    ///
    /// Returns `true` if the group is now selected. Ignored while a delta is
    /// pending, since the commit records the selected indices.
    pub fn toggle_group(&mut self, group: ElementGroup, mesh: &EditMesh) -> bool {
        if self.has_pending_delta() {
            warn!("Ignoring selection change of {} with a staged edit pending", group.key);
            return self.is_selected(&group.key);
        }
        if self.accumulated != Vec3::ZERO {
            // Sub-epsilon residue never commits; fold it into the baseline
            if let Some(baseline) = &mut self.baseline {
                baseline.positions = mesh.positions().to_vec();
            }
            self.accumulated = Vec3::ZERO;
        }
        if let Some(pos) = self.selection.iter().position(|g| g.key == group.key) {
            let removed = self.selection.remove(pos);
            debug!("Deselected {}", removed.key);
            return false;
        }

        debug!("Selected {} ({} vertices)", group.key, group.indices.len());
        self.selection.push(SelectionGroup {
            kind: group.kind(),
            centroid_local: mesh.centroid(&group.indices),
            key: group.key,
            indices: group.indices,
        });
        true
    }

    /// Resolve the element under the ray: vertices, then edges, then faces.
    pub fn classify_pick(&self, ray: Ray3d, object: &SceneObject) -> Option<ElementGroup> {
        let mesh = &object.mesh;

        if self.flags.verts {
            let group = pick_vertex(mesh, &object.transform, ray, self.vertex_pick_radius)
                .and_then(|hit| {
                    vertex_group(mesh, hit.vertex, self.flags.explode, self.group_epsilon)
                });
            if group.is_some() {
                return group;
            }
        }

        if self.flags.edges {
            let group = pick_edge_point(mesh, &object.transform, ray, self.edge_pick_radius)
                .and_then(|world| world_to_local_point(&object.transform, world))
                .and_then(|local| edge_group(mesh, local));
            if group.is_some() {
                return group;
            }
        }

        if self.flags.faces {
            let local_ray = world_to_local_ray(&object.transform, ray)?;
            let hit = pick_face(mesh, local_ray, self.xray)?;
            return Some(face_group(hit.triangle));
        }

        None
    }

    /// Keep the live baseline if it belongs to `object`, otherwise capture one.
    pub fn ensure_baseline(&mut self, object: &SceneObject) {
        if self.object() == Some(object.id) {
            return;
        }
        self.rebaseline(object);
    }

    /// Make the object's current buffer the new baseline.
    ///
    /// Switching to another object drops the selection, which referred to the
    /// old buffer.
    pub fn rebaseline(&mut self, object: &SceneObject) {
        if self.object().is_some_and(|id| id != object.id) && self.has_selection() {
            debug!("Baseline moved to {}, dropping selection", object.id);
            self.selection.clear();
        }
        self.baseline = Some(Baseline {
            object: object.id,
            positions: object.mesh.positions().to_vec(),
        });
        self.accumulated = Vec3::ZERO;
    }

    /// Move the selection by a world-space delta.
    ///
    /// Returns the world distance the selection centre moved.
    pub fn apply_world_delta(&mut self, object: &mut SceneObject, world_delta: Vec3) -> f32 {
        if self.selection.is_empty() || self.object() != Some(object.id) {
            return 0.0;
        }
        if !world_delta.is_finite() || world_delta == Vec3::ZERO {
            return 0.0;
        }
        let Some(local_delta) = world_to_local_direction(&object.transform, world_delta) else {
            warn!("Cannot move sub-elements of {} with zero scale", object.id);
            return 0.0;
        };

        let before = self.selection_world_center(object);
        let indices = self.selected_indices();
        object.mesh.translate_vertices(&indices, local_delta);
        object.mesh.recompute();

        for group in &mut self.selection {
            group.centroid_local += local_delta;
        }
        self.rekey_merged_vertices();
        self.accumulated += local_delta;

        match (before, self.selection_world_center(object)) {
            (Some(a), Some(b)) => a.distance(b),
            _ => 0.0,
        }
    }

    /// Turn the accumulated delta into a `SubEdit` action.
    ///
    /// The caller pushes the action and re-baselines.
    pub fn commit(&mut self, object: Option<ObjectId>) -> Option<Action> {
        let object = object?;
        if self.object() != Some(object) {
            debug!("Nothing staged for {object}");
            return None;
        }
        if self.selection.is_empty() || !self.has_pending_delta() {
            return None;
        }

        let delta = std::mem::take(&mut self.accumulated);
        Some(Action::SubEdit {
            object,
            indices: self.selected_indices(),
            delta,
        })
    }

    /// Restore the baseline buffer, keeping the selection.
    pub fn cancel(&mut self, object: &mut SceneObject) -> bool {
        let Some(baseline) = &self.baseline else {
            return false;
        };
        if baseline.object != object.id {
            return false;
        }
        if !object.mesh.restore_positions(&baseline.positions) {
            return false;
        }
        object.mesh.recompute();
        self.accumulated = Vec3::ZERO;
        self.refresh_centroids(&object.mesh);
        true
    }

    /// Empty the selection. The object's current buffer becomes the baseline.
    ///
    /// Pending movement is absorbed into the new baseline; commit first to keep it.
    pub fn clear_selection(&mut self, object: Option<&SceneObject>) {
        self.selection.clear();
        self.accumulated = Vec3::ZERO;
        if let Some(object) = object {
            self.rebaseline(object);
        }
    }

    /// Drop baseline, selection and pending delta. Flags are kept.
    pub fn reset(&mut self) {
        self.selection.clear();
        self.baseline = None;
        self.accumulated = Vec3::ZERO;
    }

    /// Recompute every group's centroid from the buffer.
    pub fn refresh_centroids(&mut self, mesh: &EditMesh) {
        for group in &mut self.selection {
            group.centroid_local = mesh.centroid(&group.indices);
        }
        self.rekey_merged_vertices();
    }

    /// Merged-vertex keys are positional; keep them on the group's current spot.
    fn rekey_merged_vertices(&mut self) {
        for group in &mut self.selection {
            if let SelectionKey::MergedVertex(_) = group.key {
                let key = quantize(group.centroid_local, self.group_epsilon);
                group.key = SelectionKey::MergedVertex(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modeling::edit_mesh::tests::make_quad_with_seam;
    use crate::scene::{MeshPrimitiveFactory, PrimitiveFactory, PrimitiveShape};

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

    #[test]
    fn picking_twice_toggles_off() {
        let object = quad_object();
        let mut stage = SubEditStage::default();

        assert!(stage.toggle_pick(down_z(1.0, 1.0), &object));
        assert_eq!(stage.selection().len(), 1);
        assert_eq!(stage.selected_indices(), vec![1, 4]);
        assert_eq!(stage.phase(), StagePhase::Staged);

        assert!(stage.toggle_pick(down_z(1.0, 1.0), &object));
        assert!(!stage.has_selection());
        assert_eq!(stage.phase(), StagePhase::Idle);
    }

    #[test]
    fn miss_leaves_selection_alone() {
        let object = quad_object();
        let mut stage = SubEditStage::default();
        stage.toggle_pick(down_z(0.0, 0.0), &object);
        assert!(!stage.toggle_pick(down_z(0.5, 0.5), &object));
        assert_eq!(stage.selected_indices(), vec![2]);
    }

    #[test]
    fn vertices_win_over_faces() {
        let object = quad_object();
        let mut stage = SubEditStage::default();
        stage.set_flags(FlagsPatch {
            faces: Some(true),
            ..default()
        });

        stage.toggle_pick(down_z(0.0, 1.0), &object);
        assert_eq!(stage.selection()[0].kind, ElementKind::Vertex);

        stage.toggle_pick(down_z(0.2, 0.7), &object);
        assert_eq!(stage.selection()[1].kind, ElementKind::Face);
        assert_eq!(stage.selection()[1].key, SelectionKey::Face([0, 1, 2]));
    }

    #[test]
    fn edge_pick_selects_nearest_pair() {
        let object = quad_object();
        let mut stage = SubEditStage::default();
        stage.set_flags(FlagsPatch {
            verts: Some(false),
            edges: Some(true),
            ..default()
        });

        assert!(stage.toggle_pick(down_z(0.3, 0.01), &object));
        assert_eq!(stage.selection()[0].key, SelectionKey::Edge([2, 3]));
    }

    #[test]
    fn overlapping_groups_move_each_vertex_once() {
        let mut object = quad_object();
        let mut stage = SubEditStage::default();
        stage.set_flags(FlagsPatch {
            faces: Some(true),
            ..default()
        });

        // Corner 1/4 plus the face 0-2-1 share vertex 1.
        stage.toggle_pick(down_z(1.0, 1.0), &object);
        stage.toggle_pick(down_z(0.2, 0.7), &object);
        assert_eq!(stage.selected_indices(), vec![0, 1, 2, 4]);

        stage.apply_world_delta(&mut object, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(object.mesh.position(1), Some(Vec3::new(1.0, 1.0, 1.0)));
        assert_eq!(object.mesh.position(4), Some(Vec3::new(1.0, 1.0, 1.0)));
        assert_eq!(object.mesh.position(3), Some(Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn deltas_accumulate_and_commit_once() {
        let mut object = quad_object();
        let mut stage = SubEditStage::default();
        stage.toggle_pick(down_z(1.0, 0.0), &object);

        let moved = stage.apply_world_delta(&mut object, Vec3::new(0.5, 0.0, 0.0));
        assert!((moved - 0.5).abs() < 1e-6);
        stage.apply_world_delta(&mut object, Vec3::new(0.25, 0.5, 0.0));

        let centroid = stage.selection()[0].centroid_local;
        assert!(centroid.abs_diff_eq(Vec3::new(1.75, 0.5, 0.0), 1e-6));

        let action = stage.commit(Some(object.id)).unwrap();
        let Action::SubEdit { object: id, indices, delta } = action else {
            panic!("expected a sub-element action");
        };
        assert_eq!(id, object.id);
        assert_eq!(indices, vec![3]);
        assert!(delta.abs_diff_eq(Vec3::new(0.75, 0.5, 0.0), 1e-6));
        assert_eq!(stage.pending_delta(), Vec3::ZERO);
        assert!(stage.commit(Some(object.id)).is_none());
    }

    #[test]
    fn selection_is_locked_while_a_delta_is_pending() {
        let mut object = quad_object();
        let mut stage = SubEditStage::default();
        stage.toggle_pick(down_z(1.0, 1.0), &object);
        stage.apply_world_delta(&mut object, Vec3::X);

        assert!(!stage.toggle_pick(down_z(0.0, 0.0), &object));
        let group = vertex_group(&object.mesh, 2, false, 1e-4).unwrap();
        assert!(!stage.toggle_group(group, &object.mesh));
        assert_eq!(stage.selected_indices(), vec![1, 4]);

        let Some(Action::SubEdit { indices, .. }) = stage.commit(Some(object.id)) else {
            panic!("expected a sub-element action");
        };
        assert_eq!(indices, vec![1, 4]);
        stage.rebaseline(&object);
        assert!(stage.toggle_pick(down_z(0.0, 0.0), &object));
        assert_eq!(stage.selected_indices(), vec![1, 2, 4]);
    }

    #[test]
    fn moved_vertex_toggles_off_at_its_new_position() {
        let mut object = quad_object();
        let mut stage = SubEditStage::default();
        stage.toggle_pick(down_z(1.0, 1.0), &object);
        stage.apply_world_delta(&mut object, Vec3::X);
        stage.commit(Some(object.id)).unwrap();
        stage.rebaseline(&object);

        assert!(stage.toggle_pick(down_z(2.0, 1.0), &object));
        assert!(!stage.has_selection());
    }

    #[test]
    fn tiny_residue_is_folded_into_the_baseline() {
        let mut object = quad_object();
        let mut stage = SubEditStage::default();
        stage.toggle_pick(down_z(1.0, 0.0), &object);
        stage.apply_world_delta(&mut object, Vec3::splat(1e-8));
        assert!(!stage.has_pending_delta());

        assert!(stage.toggle_pick(down_z(0.0, 0.0), &object));
        assert_eq!(stage.pending_delta(), Vec3::ZERO);
        assert_eq!(stage.baseline().unwrap().positions, object.mesh.positions());
    }

    #[test]
    fn world_delta_is_converted_to_local_space() {
        let mut object = quad_object();
        object.transform = Transform::from_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2))
            .with_scale(Vec3::splat(2.0));
        let mut stage = SubEditStage::default();
        stage.rebaseline(&object);
        let group = vertex_group(&object.mesh, 2, false, 1e-4).unwrap();
        stage.toggle_group(group, &object.mesh);

        let moved = stage.apply_world_delta(&mut object, Vec3::new(0.0, 2.0, 0.0));
        assert!((moved - 2.0).abs() < 1e-5);
        let p = object.mesh.position(2).unwrap();
        assert!(p.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5), "{p:?}");
    }

    #[test]
    fn commit_rejects_missing_object_and_tiny_deltas() {
        let mut object = quad_object();
        let mut stage = SubEditStage::default();
        stage.toggle_pick(down_z(0.0, 0.0), &object);

        assert!(stage.commit(None).is_none());
        assert!(stage.commit(Some(object.id)).is_none());

        stage.apply_world_delta(&mut object, Vec3::splat(1e-8));
        assert!(stage.commit(Some(object.id)).is_none());
        assert!(stage.commit(Some(ObjectId(42))).is_none());
    }

    #[test]
    fn cancel_restores_baseline_and_keeps_selection() {
        let mut object = quad_object();
        let original = object.mesh.positions().to_vec();
        let mut stage = SubEditStage::default();
        stage.toggle_pick(down_z(1.0, 1.0), &object);
        stage.apply_world_delta(&mut object, Vec3::new(0.0, 3.0, 0.0));
        stage.apply_world_delta(&mut object, Vec3::new(1.0, 0.0, 0.0));

        assert!(stage.cancel(&mut object));
        assert_eq!(object.mesh.positions(), original.as_slice());
        assert_eq!(stage.pending_delta(), Vec3::ZERO);
        assert_eq!(stage.selected_indices(), vec![1, 4]);
        assert!(stage.selection()[0]
            .centroid_local
            .abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn cancel_without_baseline_is_a_no_op() {
        let mut object = quad_object();
        let mut stage = SubEditStage::default();
        assert!(!stage.cancel(&mut object));

        let mut other = MeshPrimitiveFactory.create(PrimitiveShape::Cube, ObjectId(2));
        stage.rebaseline(&object);
        assert!(!stage.cancel(&mut other));
    }

    #[test]
    fn picking_another_object_drops_old_selection() {
        let quad = quad_object();
        let mut cube = MeshPrimitiveFactory.create(PrimitiveShape::Cube, ObjectId(2));
        cube.transform.translation = Vec3::new(10.0, 0.0, 0.0);
        let mut stage = SubEditStage::default();

        stage.toggle_pick(down_z(1.0, 1.0), &quad);
        assert!(stage.toggle_pick(down_z(10.5, 0.5), &cube));
        assert_eq!(stage.object(), Some(cube.id));
        assert_eq!(stage.selection().len(), 1);
        assert_eq!(stage.selected_indices().len(), 3);
    }

    #[test]
    fn clear_selection_rebaselines() {
        let mut object = quad_object();
        let mut stage = SubEditStage::default();
        stage.toggle_pick(down_z(0.0, 0.0), &object);
        stage.apply_world_delta(&mut object, Vec3::X);

        stage.clear_selection(Some(&object));
        assert!(!stage.has_selection());
        assert_eq!(stage.baseline().unwrap().positions, object.mesh.positions());
        assert!(stage.commit(Some(object.id)).is_none());
    }

    #[test]
    fn explode_flag_splits_coincident_vertices() {
        let object = quad_object();
        let mut stage = SubEditStage::default();
        stage.set_flags(FlagsPatch {
            explode: Some(true),
            ..default()
        });
        stage.toggle_pick(down_z(1.0, 1.0), &object);
        assert_eq!(stage.selected_indices(), vec![1]);
        assert!(stage.flags().explode);
        assert!(stage.flags().verts);
    }
}
