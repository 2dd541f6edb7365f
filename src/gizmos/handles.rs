use bevy::prelude::*;

use crate::constants::{gizmo_colors, sizes};
use crate::modeling::picking::ray_segment_approach;

/// Camera distance at which a gizmo of scale 1 has its nominal size
const REFERENCE_DISTANCE: f32 = 10.0;
/// Smallest size factor, so gizmos never vanish when the camera is close
const MIN_SIZE_FACTOR: f32 = 0.1;

/// Which part of the gizmo is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleAxis {
    X,
    Y,
    Z,
    /// Centre handle for translate and rotate: unconstrained
    Free,
    /// Centre handle for scale: all three components at once
    Uniform,
}

impl HandleAxis {
    pub const AXES: [HandleAxis; 3] = [HandleAxis::X, HandleAxis::Y, HandleAxis::Z];

    /// Unit vector for axis handles, `None` for centre handles.
    pub fn unit(&self) -> Option<Vec3> {
        match self {
            HandleAxis::X => Some(Vec3::X),
            HandleAxis::Y => Some(Vec3::Y),
            HandleAxis::Z => Some(Vec3::Z),
            HandleAxis::Free | HandleAxis::Uniform => None,
        }
    }

    pub fn is_axis(&self) -> bool {
        self.unit().is_some()
    }

    pub fn color(&self) -> Color {
        match self {
            HandleAxis::X => gizmo_colors::X,
            HandleAxis::Y => gizmo_colors::Y,
            HandleAxis::Z => gizmo_colors::Z,
            HandleAxis::Free | HandleAxis::Uniform => gizmo_colors::CENTER,
        }
    }
}

/// Frame the gizmo axes are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceSpace {
    #[default]
    World,
    Local,
}

impl ReferenceSpace {
    pub fn toggled(self) -> Self {
        match self {
            ReferenceSpace::World => ReferenceSpace::Local,
            ReferenceSpace::Local => ReferenceSpace::World,
        }
    }

    /// World direction of `handle`, or `None` for centre handles.
    pub fn axis_direction(&self, handle: HandleAxis, object_rotation: Quat) -> Option<Vec3> {
        let unit = handle.unit()?;
        match self {
            ReferenceSpace::World => Some(unit),
            ReferenceSpace::Local => Some((object_rotation * unit).normalize_or_zero()),
        }
    }
}

/// Where the gizmo sits and how big it is on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GizmoPose {
    pub position: Vec3,
    /// Orientation of the axes (identity in world space)
    pub rotation: Quat,
    /// World length of one axis
    pub length: f32,
}

impl GizmoPose {
    /// Size the gizmo so it keeps a roughly constant screen size.
    pub fn new(position: Vec3, rotation: Quat, gizmo_scale: f32, camera_distance: f32) -> Self {
        let factor = (camera_distance / REFERENCE_DISTANCE).max(MIN_SIZE_FACTOR);
        Self {
            position,
            rotation,
            length: sizes::GIZMO_LENGTH * gizmo_scale * factor,
        }
    }

    pub fn axis_end(&self, handle: HandleAxis) -> Option<Vec3> {
        let unit = handle.unit()?;
        Some(self.position + self.rotation * unit * self.length)
    }

    pub fn click_radius(&self) -> f32 {
        sizes::GIZMO_CLICK_RADIUS / sizes::GIZMO_LENGTH * self.length
    }

    pub fn center_radius(&self) -> f32 {
        sizes::GIZMO_CENTER_RADIUS / sizes::GIZMO_LENGTH * self.length
    }
}

/// Hit-test the gizmo. The centre sphere wins over the axes.
///
/// `center_handle` is what a centre hit returns: `Free` for translate and
/// rotate, `Uniform` for scale.
pub fn pick_handle(ray: Ray3d, pose: &GizmoPose, center_handle: HandleAxis) -> Option<HandleAxis> {
    let origin = ray.origin;
    let dir = *ray.direction;

    let center = ray_segment_approach(origin, dir, pose.position, pose.position);
    if center.gap() <= pose.center_radius() {
        return Some(center_handle);
    }

    let click_radius = pose.click_radius();
    let mut closest: Option<(HandleAxis, f32)> = None;

    for handle in HandleAxis::AXES {
        let Some(end) = pose.axis_end(handle) else {
            continue;
        };
        let distance = ray_segment_approach(origin, dir, pose.position, end).gap();
        if distance < click_radius && closest.is_none_or(|(_, d)| distance < d) {
            closest = Some((handle, distance));
        }
    }

    closest.map(|(handle, _)| handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toward(point: Vec3) -> Ray3d {
        let origin = point + Vec3::new(0.0, 0.0, 10.0);
        Ray3d::new(origin, Dir3::NEG_Z)
    }

    #[test]
    fn axis_handles_are_hit_along_their_length() {
        let pose = GizmoPose::new(Vec3::ZERO, Quat::IDENTITY, 1.0, 10.0);
        assert_eq!(pick_handle(toward(Vec3::new(1.0, 0.02, 0.0)), &pose, HandleAxis::Free), Some(HandleAxis::X));
        assert_eq!(pick_handle(toward(Vec3::new(0.02, 1.2, 0.0)), &pose, HandleAxis::Free), Some(HandleAxis::Y));
        assert_eq!(pick_handle(toward(Vec3::new(2.0, 2.0, 0.0)), &pose, HandleAxis::Free), None);
    }

    #[test]
    fn center_returns_the_operation_handle() {
        let pose = GizmoPose::new(Vec3::new(3.0, 0.0, 0.0), Quat::IDENTITY, 1.0, 10.0);
        let ray = toward(Vec3::new(3.05, 0.05, 0.0));
        assert_eq!(pick_handle(ray, &pose, HandleAxis::Uniform), Some(HandleAxis::Uniform));
        assert_eq!(pick_handle(ray, &pose, HandleAxis::Free), Some(HandleAxis::Free));
    }

    #[test]
    fn local_pose_rotates_axes() {
        let rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let pose = GizmoPose::new(Vec3::ZERO, rotation, 1.0, 10.0);
        // Local X now points along world +Y
        assert_eq!(pick_handle(toward(Vec3::new(0.0, 1.0, 0.0)), &pose, HandleAxis::Free), Some(HandleAxis::X));
    }

    #[test]
    fn gizmo_grows_with_camera_distance() {
        let near = GizmoPose::new(Vec3::ZERO, Quat::IDENTITY, 1.0, 10.0);
        let far = GizmoPose::new(Vec3::ZERO, Quat::IDENTITY, 1.0, 40.0);
        assert!((far.length - near.length * 4.0).abs() < 1e-5);
        assert!(far.click_radius() > near.click_radius());
    }

    #[test]
    fn local_space_axis_follows_rotation() {
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let dir = ReferenceSpace::Local.axis_direction(HandleAxis::X, rotation).unwrap();
        assert!(dir.abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert_eq!(ReferenceSpace::World.axis_direction(HandleAxis::X, rotation), Some(Vec3::X));
        assert_eq!(ReferenceSpace::World.axis_direction(HandleAxis::Free, rotation), None);
    }
}
