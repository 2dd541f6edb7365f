//! The edit session: every piece of mutable editor state in one resource.
//!
//! Systems translate input into calls on [`EditSession`]; tests drive it
//! directly with scripted pointer and key sequences.

use bevy::prelude::*;

use super::camera::{EdgeDolly, Viewport};
use crate::commands::{Action, ActionItem, ActionLog, Direction, TransformCapture, TransformSnapshot};
use crate::constants::sizes::SUB_ELEMENT_GIZMO_SCALE;
use crate::gizmos::{
    apply_rotation, apply_scale, pick_handle, DragKind, DragUpdate, GizmoDrag, GizmoPose,
    HandleAxis, ReferenceSpace,
};
use crate::modeling::{FlagsPatch, SubEditStage, SubElementFlags, TapOutcome, TriggerLayer};
use crate::scene::{
    MeshPrimitiveFactory, ObjectId, PrimitiveFactory, PrimitiveShape, SceneObject, SceneRegistry,
};
use crate::settings::EditSettings;

/// What the gizmo edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Whole-object transforms, recorded on pointer-up
    #[default]
    Object,
    /// Vertex, edge and face moves, staged until confirmed
    SubElement,
}

impl EditMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            EditMode::Object => "Object",
            EditMode::SubElement => "Sub-element",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            EditMode::Object => EditMode::SubElement,
            EditMode::SubElement => EditMode::Object,
        }
    }
}

/// Current transform operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformOperation {
    #[default]
    Translate,
    Rotate,
    Scale,
}

impl TransformOperation {
    /// Handle a hit on the gizmo centre resolves to
    pub fn center_handle(&self) -> HandleAxis {
        match self {
            TransformOperation::Scale => HandleAxis::Uniform,
            TransformOperation::Translate | TransformOperation::Rotate => HandleAxis::Free,
        }
    }
}

/// Transform component targeted by direct value entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformField {
    Translation,
    /// Euler XYZ, in degrees
    Rotation,
    Scale,
}

#[derive(Resource)]
pub struct EditSession {
    scene: SceneRegistry,
    factory: Box<dyn PrimitiveFactory>,
    log: ActionLog,
    stage: SubEditStage,
    triggers: TriggerLayer,
    drag: GizmoDrag,
    capture: Option<TransformCapture>,
    selected: Option<ObjectId>,
    mode: EditMode,
    operation: TransformOperation,
    space: ReferenceSpace,
    dolly: EdgeDolly,
    settings: EditSettings,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(EditSettings::default())
    }
}

impl EditSession {
    pub fn new(settings: EditSettings) -> Self {
        Self::with_factory(settings, Box::new(MeshPrimitiveFactory))
    }

    pub fn with_factory(settings: EditSettings, factory: Box<dyn PrimitiveFactory>) -> Self {
        Self {
            scene: SceneRegistry::default(),
            factory,
            log: ActionLog::with_capacity(settings.undo_history_size),
            stage: SubEditStage::new(&settings),
            triggers: TriggerLayer::default(),
            drag: GizmoDrag::default(),
            capture: None,
            selected: None,
            mode: EditMode::default(),
            operation: TransformOperation::default(),
            space: ReferenceSpace::default(),
            dolly: EdgeDolly::new(settings.dolly.clone()),
            settings,
        }
    }

    /// Drop the scene, history and all editing state. Settings and factory are kept.
    pub fn reset(&mut self) {
        let settings = self.settings.clone();
        let factory = std::mem::replace(&mut self.factory, Box::new(MeshPrimitiveFactory));
        *self = Self::with_factory(settings, factory);
        info!("Edit session reset");
    }

    pub fn scene(&self) -> &SceneRegistry {
        &self.scene
    }

    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    pub fn stage(&self) -> &SubEditStage {
        &self.stage
    }

    pub fn triggers(&self) -> &TriggerLayer {
        &self.triggers
    }

    pub fn drag(&self) -> &GizmoDrag {
        &self.drag
    }

    pub fn settings(&self) -> &EditSettings {
        &self.settings
    }

    /// Switch between trigger-orb taps and direct ray picking.
    pub fn set_trigger_orbs(&mut self, enabled: bool) {
        if self.settings.trigger_orbs == enabled {
            return;
        }
        self.settings.trigger_orbs = enabled;
        self.refresh_triggers();
    }

    pub fn selected(&self) -> Option<ObjectId> {
        self.selected
    }

    pub fn selected_object(&self) -> Option<&SceneObject> {
        self.scene.find(self.selected?)
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn space(&self) -> ReferenceSpace {
        self.space
    }

    pub fn set_space(&mut self, space: ReferenceSpace) {
        self.space = space;
    }

    /// Operation the gizmo performs. Sub-elements only translate.
    pub fn operation(&self) -> TransformOperation {
        match self.mode {
            EditMode::Object => self.operation,
            EditMode::SubElement => TransformOperation::Translate,
        }
    }

    pub fn set_operation(&mut self, operation: TransformOperation) {
        self.finish_drag();
        self.operation = operation;
    }

    /// Switch between object and sub-element editing.
    ///
    /// Staged sub-element edits are committed before leaving.
    pub fn set_mode(&mut self, mode: EditMode) -> bool {
        if mode == self.mode {
            return false;
        }
        self.finish_drag();
        self.commit_staged();
        self.stage.reset();
        self.triggers.clear();
        self.mode = mode;
        self.begin_sub_session();
        info!("Edit mode: {}", mode.display_name());
        true
    }

    /// Select an object (or nothing). Staged edits on the previous one are committed.
    pub fn select(&mut self, id: Option<ObjectId>) -> bool {
        if id == self.selected {
            return false;
        }
        if let Some(id) = id {
            if !self.scene.contains(id) {
                warn!("Cannot select missing object {id}");
                return false;
            }
        }

        self.finish_drag();
        self.commit_staged();
        self.stage.reset();
        self.triggers.clear();
        self.selected = id;
        self.begin_sub_session();
        true
    }

    /// Add a primitive and select it.
    pub fn spawn(&mut self, shape: PrimitiveShape, transform: Transform) -> ObjectId {
        self.finish_drag();
        self.commit_staged();

        let id = self.scene.allocate_id();
        let action = Action::Add {
            items: vec![ActionItem {
                shape,
                id,
                transform: TransformSnapshot::from(&transform),
                positions: None,
            }],
        };
        action.apply(Direction::Forward, &mut self.scene, self.factory.as_ref());
        info!("{}", action.description());
        self.log.push(action);
        self.select(Some(id));
        id
    }

    /// Remove the selected object, keeping its edited geometry for undo.
    pub fn delete_selected(&mut self) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        self.finish_drag();
        self.commit_staged();

        let Some(object) = self.scene.find(id) else {
            self.clear_selection_state();
            return false;
        };
        let action = Action::Delete {
            items: vec![ActionItem {
                shape: object.shape,
                id,
                transform: TransformSnapshot::from(&object.transform),
                positions: Some(object.mesh.positions().to_vec()),
            }],
        };
        action.apply(Direction::Forward, &mut self.scene, self.factory.as_ref());
        info!("{}", action.description());
        self.log.push(action);
        self.clear_selection_state();
        true
    }

    /// Nearest object under the ray.
    pub fn pick_object(&self, ray: Ray3d) -> Option<ObjectId> {
        self.scene
            .pick(ray, self.settings.xray_selection)
            .map(|hit| hit.id)
    }

    /// Double tap: toggle a sub-element first, otherwise (de)select the object under the ray.
    pub fn handle_double_tap(&mut self, ray: Ray3d) -> bool {
        if self.mode == EditMode::SubElement && self.toggle_pick(ray) {
            return true;
        }
        let hit = self.pick_object(ray);
        self.select(hit)
    }

    /// Toggle the sub-element under the ray on the selected object.
    ///
    /// A staged move is committed first so the action records exactly the
    /// indices that moved.
    pub fn toggle_pick(&mut self, ray: Ray3d) -> bool {
        if self.mode != EditMode::SubElement {
            return false;
        }
        let Some(object) = self.selected.and_then(|id| self.scene.find(id)) else {
            return false;
        };
        self.stage.ensure_baseline(object);
        if self.stage.has_pending_delta() && self.stage.classify_pick(ray, object).is_some() {
            self.commit_staged();
        }

        let Some(object) = self.selected.and_then(|id| self.scene.find(id)) else {
            return false;
        };
        self.stage.toggle_pick(ray, object)
    }

    /// Route a single tap to the trigger orbs.
    pub fn tap(&mut self, ray: Ray3d) -> TapOutcome {
        if self.mode != EditMode::SubElement {
            return TapOutcome::None;
        }
        let Some(object) = self.selected.and_then(|id| self.scene.find(id)) else {
            return TapOutcome::None;
        };
        if self.stage.has_pending_delta() && self.triggers.toggles_selection(ray, object, &self.stage) {
            self.commit_staged();
        }

        let Some(object) = self.selected.and_then(|id| self.scene.find(id)) else {
            return TapOutcome::None;
        };
        self.triggers.tap(ray, object, &mut self.stage)
    }

    pub fn begin_multi(&mut self) {
        self.triggers.begin_multi();
    }

    pub fn finish_multi(&mut self) -> bool {
        self.triggers.finish_multi(&self.stage)
    }

    pub fn end_multi(&mut self) {
        self.triggers.end_multi();
    }

    /// Size trigger orbs for the camera position.
    pub fn update_triggers(&mut self, camera_position: Vec3) {
        if let Some(object) = self.selected.and_then(|id| self.scene.find(id)) {
            self.triggers.update(&object.transform, camera_position);
        }
    }

    pub fn flags(&self) -> SubElementFlags {
        self.stage.flags()
    }

    pub fn set_flags(&mut self, patch: FlagsPatch) {
        self.stage.set_flags(patch);
        self.refresh_triggers();
    }

    /// Gizmo position and axis orientation.
    ///
    /// Sub-element mode uses the selection centre, object mode the object origin.
    pub fn gizmo_pose(&self) -> Option<(Vec3, Quat)> {
        let object = self.selected_object()?;
        let rotation = match self.space {
            ReferenceSpace::World => Quat::IDENTITY,
            ReferenceSpace::Local => object.transform.rotation,
        };
        let position = match self.mode {
            EditMode::Object => object.transform.translation,
            EditMode::SubElement => self.stage.selection_world_center(object)?,
        };
        Some((position, rotation))
    }

    /// Gizmo sized for a camera at `camera_distance`.
    pub fn gizmo(&self, camera_distance: f32) -> Option<GizmoPose> {
        let (position, rotation) = self.gizmo_pose()?;
        let scale = match self.mode {
            EditMode::Object => self.settings.gizmo_scale,
            EditMode::SubElement => self.settings.gizmo_scale * SUB_ELEMENT_GIZMO_SCALE,
        };
        Some(GizmoPose::new(position, rotation, scale, camera_distance))
    }

    /// Start a drag on `handle`, or on whatever handle is under the pointer.
    ///
    /// Returns `false` if nothing was grabbed.
    pub fn pointer_down(
        &mut self,
        handle: Option<HandleAxis>,
        viewport: &dyn Viewport,
        pointer: Vec2,
    ) -> bool {
        self.finish_drag();

        let Some((position, _)) = self.gizmo_pose() else {
            return false;
        };
        let operation = self.operation();

        let handle = match handle {
            Some(handle) => handle,
            None => {
                let Some(ray) = viewport.ray_from_screen(pointer) else {
                    return false;
                };
                let distance = viewport.camera_position().distance(position);
                let Some(pose) = self.gizmo(distance) else {
                    return false;
                };
                let Some(handle) = pick_handle(ray, &pose, operation.center_handle()) else {
                    return false;
                };
                handle
            }
        };

        let Some(object) = self.selected_object() else {
            return false;
        };
        let capture = TransformCapture::begin(object);
        let object_rotation = object.transform.rotation;
        let radius = object.world_radius();

        self.capture = (self.mode == EditMode::Object).then_some(capture);
        match operation {
            TransformOperation::Translate => {
                let handle = match handle {
                    HandleAxis::Uniform => HandleAxis::Free,
                    other => other,
                };
                self.drag.begin_translate(
                    handle,
                    self.space,
                    object_rotation,
                    position,
                    position,
                    radius,
                    viewport,
                    pointer,
                );
            }
            TransformOperation::Rotate => {
                self.drag
                    .begin_screen(DragKind::Rotate, handle, position, viewport, pointer);
            }
            TransformOperation::Scale => {
                self.drag
                    .begin_screen(DragKind::Scale, handle, position, viewport, pointer);
            }
        }
        debug!("Grabbed {handle:?} for {operation:?}");
        true
    }

    /// Apply pointer motion to the active drag.
    pub fn pointer_move(&mut self, viewport: &mut dyn Viewport, pointer: Vec2) -> Option<DragUpdate> {
        let (kind, handle) = {
            let state = self.drag.state()?;
            (state.kind, state.handle)
        };
        let id = self.selected?;

        match kind {
            DragKind::Translate => {
                let update = self.drag.update(&*viewport, pointer);
                if update.world_delta != Vec3::ZERO {
                    let object = self.scene.find_mut(id)?;
                    match self.mode {
                        EditMode::Object => object.transform.translation += update.world_delta,
                        EditMode::SubElement => {
                            self.stage.apply_world_delta(object, update.world_delta);
                        }
                    }
                }
                if let Some(state) = self.drag.state() {
                    self.dolly.apply(
                        &mut *viewport,
                        state.anchor_current,
                        state.base_camera_distance,
                        update.moved_distance,
                        state.object_radius,
                    );
                }
                Some(update)
            }
            DragKind::Rotate => {
                let angle = self
                    .drag
                    .screen_amount(pointer, self.settings.rotate_sensitivity);
                let object = self.scene.find_mut(id)?;
                object.transform.rotation =
                    apply_rotation(object.transform.rotation, handle, self.space, angle);
                Some(DragUpdate::default())
            }
            DragKind::Scale => {
                let amount = self
                    .drag
                    .screen_amount(pointer, self.settings.scale_sensitivity);
                let object = self.scene.find_mut(id)?;
                object.transform.scale = apply_scale(
                    object.transform.scale,
                    handle,
                    amount,
                    self.settings.min_scale,
                    self.settings.max_scale,
                );
                Some(DragUpdate::default())
            }
        }
    }

    /// End the drag. Whole-object edits are recorded and returned; sub-element
    /// edits stay staged.
    pub fn pointer_up(&mut self) -> Option<Action> {
        self.drag.end()?;
        let capture = self.capture.take();

        if self.mode == EditMode::SubElement {
            self.refresh_triggers();
            return None;
        }

        let action = capture?.finish(&self.scene)?;
        info!("{}", action.description());
        self.log.push(action.clone());
        Some(action)
    }

    /// Move the selection by a fixed world delta (keyboard nudge).
    pub fn nudge(&mut self, world_delta: Vec3) -> bool {
        if !world_delta.is_finite() || world_delta == Vec3::ZERO {
            return false;
        }
        self.finish_drag();
        let Some(id) = self.selected else {
            return false;
        };
        let Some(object) = self.scene.find_mut(id) else {
            return false;
        };

        match self.mode {
            EditMode::Object => {
                let capture = TransformCapture::begin(object);
                object.transform.translation += world_delta;
                let Some(action) = capture.finish(&self.scene) else {
                    return false;
                };
                self.log.push(action);
                true
            }
            EditMode::SubElement => {
                if !self.stage.has_selection() {
                    return false;
                }
                self.stage.apply_world_delta(object, world_delta);
                self.refresh_triggers();
                true
            }
        }
    }

    /// Commit the staged sub-element edit as one action.
    pub fn confirm(&mut self) -> bool {
        if self.mode != EditMode::SubElement {
            return false;
        }
        self.finish_drag();
        let Some(action) = self.stage.commit(self.selected) else {
            debug!("Nothing to confirm");
            return false;
        };
        info!("{}", action.description());
        self.log.push(action);
        if let Some(object) = self.selected.and_then(|id| self.scene.find(id)) {
            self.stage.rebaseline(object);
        }
        self.refresh_triggers();
        true
    }

    /// Abort the in-flight object drag, or revert staged sub-element edits.
    pub fn cancel(&mut self) -> bool {
        if let Some(capture) = self.capture.take() {
            self.drag.end();
            if let Some(object) = self.scene.find_mut(capture.object) {
                object.transform = capture.before.into();
            }
            return true;
        }
        if self.mode != EditMode::SubElement {
            return false;
        }
        self.drag.end();
        let Some(object) = self.selected.and_then(|id| self.scene.find_mut(id)) else {
            return false;
        };
        let cancelled = self.stage.cancel(object);
        if cancelled {
            debug!("Reverted staged sub-element edits");
            self.refresh_triggers();
        }
        cancelled
    }

    pub fn undo(&mut self) -> bool {
        self.prepare_history_step();
        if self
            .log
            .undo(&mut self.scene, self.factory.as_ref())
            .is_none()
        {
            return false;
        }
        self.after_history_step();
        true
    }

    pub fn redo(&mut self) -> bool {
        self.prepare_history_step();
        if self
            .log
            .redo(&mut self.scene, self.factory.as_ref())
            .is_none()
        {
            return false;
        }
        self.after_history_step();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    /// Record an action the caller already applied.
    pub fn push_action(&mut self, action: Action) {
        self.log.push(action);
    }

    /// Set one transform component directly. Non-finite values are ignored.
    pub fn set_transform_value(&mut self, field: TransformField, axis: usize, value: f32) -> bool {
        if !value.is_finite() {
            debug!("Rejected non-finite {field:?} value");
            return false;
        }
        if axis > 2 {
            return false;
        }
        self.finish_drag();

        let (min_scale, max_scale) = (self.settings.min_scale, self.settings.max_scale);
        let Some(object) = self.selected.and_then(|id| self.scene.find_mut(id)) else {
            return false;
        };
        let capture = TransformCapture::begin(object);

        match field {
            TransformField::Translation => object.transform.translation[axis] = value,
            TransformField::Rotation => {
                let (x, y, z) = object.transform.rotation.to_euler(EulerRot::XYZ);
                let mut angles = Vec3::new(x, y, z);
                angles[axis] = value.to_radians();
                object.transform.rotation =
                    Quat::from_euler(EulerRot::XYZ, angles.x, angles.y, angles.z);
            }
            TransformField::Scale => {
                object.transform.scale[axis] = value.clamp(min_scale, max_scale);
            }
        }

        let Some(action) = capture.finish(&self.scene) else {
            return false;
        };
        self.log.push(action);
        true
    }

    fn finish_drag(&mut self) {
        if self.drag.is_active() {
            self.pointer_up();
        }
    }

    /// Push the staged sub-element edit, if any. Used before anything that
    /// would otherwise discard it or change which indices it covers.
    fn commit_staged(&mut self) -> bool {
        let object = self.stage.object();
        let Some(action) = self.stage.commit(object) else {
            return false;
        };
        info!("Auto-committed {}", action.description());
        self.log.push(action);
        if let Some(object) = object.and_then(|id| self.scene.find(id)) {
            self.stage.rebaseline(object);
        }
        true
    }

    fn begin_sub_session(&mut self) {
        if self.mode != EditMode::SubElement {
            return;
        }
        if let Some(object) = self.selected.and_then(|id| self.scene.find(id)) {
            self.stage.rebaseline(object);
        }
        self.refresh_triggers();
    }

    fn refresh_triggers(&mut self) {
        if self.mode != EditMode::SubElement {
            self.triggers.clear();
            return;
        }
        match self.selected.and_then(|id| self.scene.find(id)) {
            Some(object) => {
                self.triggers
                    .build(object, self.stage.flags(), self.settings.group_epsilon)
            }
            None => self.triggers.clear(),
        }
    }

    fn clear_selection_state(&mut self) {
        self.selected = None;
        self.stage.reset();
        self.triggers.clear();
    }

    fn prepare_history_step(&mut self) {
        self.finish_drag();
        if !self.stage.has_pending_delta() {
            return;
        }
        if let Some(object) = self.stage.object().and_then(|id| self.scene.find_mut(id)) {
            self.stage.cancel(object);
            debug!("Discarded uncommitted sub-element edits before history step");
        }
    }

    fn after_history_step(&mut self) {
        let Some(id) = self.selected else {
            return;
        };
        let Some(object) = self.scene.find(id) else {
            self.clear_selection_state();
            return;
        };
        if self.mode == EditMode::SubElement {
            self.stage.rebaseline(object);
            self.stage.refresh_centroids(&object.mesh);
        }
        self.refresh_triggers();
    }
}
