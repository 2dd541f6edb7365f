//! Pointer drag math for gizmo handles.
//!
//! Translate drags intersect the pointer ray with a plane through the anchor.
//! Axis-locked drags use a plane that contains the axis and faces the camera
//! as much as possible, then project the raw displacement onto the axis.
//! Rotate and scale drags only track pointer motion in screen space.

use bevy::prelude::*;

use super::handles::{HandleAxis, ReferenceSpace};
use crate::constants::tolerance::{DEGENERATE_LENGTH, PARALLEL_EPSILON};
use crate::editor::Viewport;

/// What a drag manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Translate,
    Rotate,
    Scale,
}

/// Infinite plane through `origin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragPlane {
    pub origin: Vec3,
    /// Unit normal
    pub normal: Vec3,
}

impl DragPlane {
    /// Where the ray crosses the plane, if in front of the ray origin.
    pub fn intersect(&self, ray: Ray3d) -> Option<Vec3> {
        let denom = self.normal.dot(*ray.direction);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }
        let t = self.normal.dot(self.origin - ray.origin) / denom;
        if t < 0.0 || !t.is_finite() {
            return None;
        }
        Some(ray.get_point(t))
    }
}

/// Plane containing `axis` and oriented toward the camera.
///
/// The helper vector falls back from the view direction to world up, then
/// world right. `None` if every candidate is degenerate.
pub fn axis_drag_plane(axis: Vec3, view: Vec3, anchor: Vec3) -> Option<DragPlane> {
    let helper = [view, Vec3::Y, Vec3::X]
        .into_iter()
        .map(|candidate| axis.cross(candidate))
        .find(|helper| helper.length() >= DEGENERATE_LENGTH)?;

    let normal = helper.cross(axis).normalize_or_zero();
    if normal.length() < DEGENERATE_LENGTH {
        return None;
    }
    Some(DragPlane {
        origin: anchor,
        normal,
    })
}

/// Live state of one drag, from handle pick to pointer-up.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub kind: DragKind,
    pub handle: HandleAxis,
    /// `None` when no usable plane exists; updates then yield nothing
    pub plane: Option<DragPlane>,
    pub start_hit: Vec3,
    pub last_hit: Vec3,
    /// Locked axis in world space
    pub axis_world: Option<Vec3>,
    pub base_camera_distance: f32,
    pub object_radius: f32,
    pub anchor_center_world: Vec3,
    /// Anchor centre plus every delta reported so far
    pub anchor_current: Vec3,
    pub last_pointer: Vec2,
}

impl DragState {
    pub fn moved_distance(&self) -> f32 {
        self.anchor_current.distance(self.anchor_center_world)
    }
}

/// Result of one pointer move.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragUpdate {
    pub world_delta: Vec3,
    /// Distance from the anchor centre to where it has been dragged
    pub moved_distance: f32,
}

#[derive(Debug, Clone, Default)]
pub struct GizmoDrag {
    state: Option<DragState>,
}

impl GizmoDrag {
    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&DragState> {
        self.state.as_ref()
    }

    /// Start a translate drag.
    ///
    /// `anchor` is where the plane is pinned (the gizmo), `center` the point
    /// whose movement is reported as moved distance.
    #[allow(clippy::too_many_arguments)]
    pub fn begin_translate(
        &mut self,
        handle: HandleAxis,
        space: ReferenceSpace,
        object_rotation: Quat,
        anchor: Vec3,
        center: Vec3,
        radius: f32,
        viewport: &dyn Viewport,
        pointer: Vec2,
    ) {
        let view = viewport.view_direction();
        let axis_world = space.axis_direction(handle, object_rotation);

        let plane = match axis_world {
            Some(axis) => axis_drag_plane(axis, view, anchor),
            None => {
                let normal = view.normalize_or_zero();
                (normal.length() >= DEGENERATE_LENGTH).then_some(DragPlane {
                    origin: anchor,
                    normal,
                })
            }
        };
        if plane.is_none() {
            warn!("No usable drag plane for {handle:?}; drag will not move");
        }

        let start_hit = plane
            .zip(viewport.ray_from_screen(pointer))
            .and_then(|(plane, ray)| plane.intersect(ray))
            .unwrap_or(anchor);

        self.state = Some(DragState {
            kind: DragKind::Translate,
            handle,
            plane,
            start_hit,
            last_hit: start_hit,
            axis_world,
            base_camera_distance: viewport.camera_distance(),
            object_radius: radius,
            anchor_center_world: center,
            anchor_current: center,
            last_pointer: pointer,
        });
    }

    /// Start a rotate or scale drag, driven by screen-space pointer motion.
    pub fn begin_screen(
        &mut self,
        kind: DragKind,
        handle: HandleAxis,
        center: Vec3,
        viewport: &dyn Viewport,
        pointer: Vec2,
    ) {
        self.state = Some(DragState {
            kind,
            handle,
            plane: None,
            start_hit: center,
            last_hit: center,
            axis_world: None,
            base_camera_distance: viewport.camera_distance(),
            object_radius: 0.0,
            anchor_center_world: center,
            anchor_current: center,
            last_pointer: pointer,
        });
    }

    /// World displacement since the last successful update.
    ///
    /// A ray that misses the plane yields a zero delta and leaves the state alone.
    pub fn update(&mut self, viewport: &dyn Viewport, pointer: Vec2) -> DragUpdate {
        let Some(state) = self.state.as_mut() else {
            return DragUpdate::default();
        };
        let idle = DragUpdate {
            world_delta: Vec3::ZERO,
            moved_distance: state.moved_distance(),
        };
        if state.kind != DragKind::Translate {
            return idle;
        }

        let Some(plane) = state.plane else {
            return idle;
        };
        let Some(hit) = viewport
            .ray_from_screen(pointer)
            .and_then(|ray| plane.intersect(ray))
        else {
            return idle;
        };

        let raw = hit - state.last_hit;
        let world_delta = match state.axis_world {
            Some(axis) => axis * raw.dot(axis),
            None => raw,
        };
        if !world_delta.is_finite() {
            return idle;
        }

        state.last_hit = hit;
        state.last_pointer = pointer;
        state.anchor_current += world_delta;
        DragUpdate {
            world_delta,
            moved_distance: state.moved_distance(),
        }
    }

    /// Pointer motion since the last event, as `(dx + dy) * sensitivity`.
    pub fn screen_amount(&mut self, pointer: Vec2, sensitivity: f32) -> f32 {
        let Some(state) = self.state.as_mut() else {
            return 0.0;
        };
        let delta = pointer - state.last_pointer;
        state.last_pointer = pointer;
        (delta.x + delta.y) * sensitivity
    }

    /// Drop the drag state. Always succeeds.
    pub fn end(&mut self) -> Option<DragState> {
        self.state.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::OrbitView;

    fn front_view() -> OrbitView {
        OrbitView::looking_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec2::new(800.0, 600.0))
    }

    fn screen_of(view: &OrbitView, world: Vec3) -> Vec2 {
        view.world_to_screen(world).unwrap()
    }

    /// Viewport with no usable view direction and no rays.
    struct BlindViewport;

    impl Viewport for BlindViewport {
        fn ray_from_screen(&self, _: Vec2) -> Option<Ray3d> {
            None
        }
        fn world_to_ndc(&self, _: Vec3) -> Option<Vec3> {
            None
        }
        fn world_to_screen(&self, _: Vec3) -> Option<Vec2> {
            None
        }
        fn camera_position(&self) -> Vec3 {
            Vec3::ZERO
        }
        fn view_direction(&self) -> Vec3 {
            Vec3::ZERO
        }
        fn camera_distance(&self) -> f32 {
            1.0
        }
        fn set_camera_distance(&mut self, _: f32) {}
    }

    #[test]
    fn axis_plane_contains_axis_and_faces_camera() {
        let plane = axis_drag_plane(Vec3::X, Vec3::NEG_Z, Vec3::ZERO).unwrap();
        assert!(plane.normal.dot(Vec3::X).abs() < 1e-6);
        assert!(plane.normal.abs_diff_eq(Vec3::NEG_Z, 1e-6) || plane.normal.abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn axis_along_view_falls_back_to_world_up() {
        let plane = axis_drag_plane(Vec3::Z, Vec3::NEG_Z, Vec3::ZERO).unwrap();
        assert!(plane.normal.dot(Vec3::Z).abs() < 1e-6);
        assert!(plane.normal.is_finite());

        let vertical = axis_drag_plane(Vec3::Y, Vec3::NEG_Y, Vec3::ZERO).unwrap();
        assert!(vertical.normal.dot(Vec3::Y).abs() < 1e-6);
    }

    #[test]
    fn zero_axis_has_no_plane() {
        assert!(axis_drag_plane(Vec3::ZERO, Vec3::NEG_Z, Vec3::ZERO).is_none());
    }

    #[test]
    fn x_drag_ignores_off_axis_motion() {
        let view = front_view();
        let mut drag = GizmoDrag::default();
        let start = screen_of(&view, Vec3::ZERO);
        drag.begin_translate(HandleAxis::X, ReferenceSpace::World, Quat::IDENTITY, Vec3::ZERO, Vec3::ZERO, 0.5, &view, start);

        let update = drag.update(&view, screen_of(&view, Vec3::new(2.0, 1.0, 0.0)));
        assert!(update.world_delta.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-4), "{:?}", update.world_delta);
        assert!((update.moved_distance - 2.0).abs() < 1e-4);

        // Deltas are incremental
        let update = drag.update(&view, screen_of(&view, Vec3::new(3.0, 1.0, 0.0)));
        assert!(update.world_delta.abs_diff_eq(Vec3::X, 1e-4));
        assert!((update.moved_distance - 3.0).abs() < 1e-4);
    }

    #[test]
    fn free_drag_follows_pointer_in_view_plane() {
        let view = front_view();
        let mut drag = GizmoDrag::default();
        let start = screen_of(&view, Vec3::ZERO);
        drag.begin_translate(HandleAxis::Free, ReferenceSpace::World, Quat::IDENTITY, Vec3::ZERO, Vec3::ZERO, 0.5, &view, start);

        let update = drag.update(&view, screen_of(&view, Vec3::new(1.0, -1.0, 0.0)));
        assert!(update.world_delta.abs_diff_eq(Vec3::new(1.0, -1.0, 0.0), 1e-4));
    }

    #[test]
    fn local_axis_uses_object_rotation() {
        let view = front_view();
        let mut drag = GizmoDrag::default();
        let rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let start = screen_of(&view, Vec3::ZERO);
        drag.begin_translate(HandleAxis::X, ReferenceSpace::Local, rotation, Vec3::ZERO, Vec3::ZERO, 0.5, &view, start);

        let update = drag.update(&view, screen_of(&view, Vec3::new(1.0, 2.0, 0.0)));
        assert!(update.world_delta.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-4));
    }

    #[test]
    fn degenerate_setup_yields_zero_delta() {
        let mut drag = GizmoDrag::default();
        drag.begin_translate(HandleAxis::Free, ReferenceSpace::World, Quat::IDENTITY, Vec3::ONE, Vec3::ONE, 1.0, &BlindViewport, Vec2::ZERO);
        let state = drag.state().unwrap();
        assert!(state.plane.is_none());
        assert_eq!(state.start_hit, Vec3::ONE);

        let update = drag.update(&BlindViewport, Vec2::new(50.0, 50.0));
        assert_eq!(update.world_delta, Vec3::ZERO);
        assert!(update.world_delta.is_finite());
    }

    #[test]
    fn missed_intersection_keeps_state() {
        let view = front_view();
        let mut drag = GizmoDrag::default();
        let start = screen_of(&view, Vec3::ZERO);
        drag.begin_translate(HandleAxis::X, ReferenceSpace::World, Quat::IDENTITY, Vec3::ZERO, Vec3::ZERO, 0.5, &view, start);
        let before = drag.state().cloned();

        // Same pointer, but the view can no longer produce rays.
        assert_eq!(drag.update(&BlindViewport, start).world_delta, Vec3::ZERO);
        assert_eq!(drag.state().cloned(), before);
    }

    #[test]
    fn screen_amount_tracks_pointer_motion() {
        let view = front_view();
        let mut drag = GizmoDrag::default();
        drag.begin_screen(DragKind::Rotate, HandleAxis::Y, Vec3::ZERO, &view, Vec2::new(100.0, 100.0));

        assert!((drag.screen_amount(Vec2::new(110.0, 105.0), 0.01) - 0.15).abs() < 1e-6);
        assert!((drag.screen_amount(Vec2::new(110.0, 105.0), 0.01)).abs() < 1e-6);
        assert_eq!(drag.update(&view, Vec2::new(200.0, 200.0)).world_delta, Vec3::ZERO);
    }

    #[test]
    fn end_always_clears() {
        let mut drag = GizmoDrag::default();
        assert!(drag.end().is_none());
        drag.begin_screen(DragKind::Scale, HandleAxis::Uniform, Vec3::ZERO, &front_view(), Vec2::ZERO);
        assert!(drag.end().is_some());
        assert!(!drag.is_active());
        assert_eq!(drag.screen_amount(Vec2::ONE, 1.0), 0.0);
    }
}
