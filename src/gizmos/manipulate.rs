use bevy::prelude::*;

use super::handles::{HandleAxis, ReferenceSpace};

/// Rotate `rotation` by `angle` radians about the handle's axis.
///
/// Local space post-multiplies so the axis follows the object; world space
/// pre-multiplies. Centre handles turn about world Y.
pub fn apply_rotation(rotation: Quat, handle: HandleAxis, space: ReferenceSpace, angle: f32) -> Quat {
    if !angle.is_finite() || angle == 0.0 {
        return rotation;
    }

    let Some(axis) = handle.unit() else {
        return (Quat::from_axis_angle(Vec3::Y, angle) * rotation).normalize();
    };
    let delta = Quat::from_axis_angle(axis, angle);

    match space {
        ReferenceSpace::Local => (rotation * delta).normalize(),
        ReferenceSpace::World => (delta * rotation).normalize(),
    }
}

/// Add `amount` to the handle's scale component(s), clamped to `min..=max`.
pub fn apply_scale(scale: Vec3, handle: HandleAxis, amount: f32, min: f32, max: f32) -> Vec3 {
    if !amount.is_finite() {
        return scale;
    }

    let increment = match handle.unit() {
        Some(axis) => axis * amount,
        None => Vec3::splat(amount),
    };
    (scale + increment).clamp(Vec3::splat(min), Vec3::splat(max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn local_rotation_follows_object_axes() {
        let base = Quat::from_rotation_z(FRAC_PI_2);
        let rotated = apply_rotation(base, HandleAxis::X, ReferenceSpace::Local, FRAC_PI_2);
        assert!(rotated.abs_diff_eq(base * Quat::from_rotation_x(FRAC_PI_2), 1e-6));

        let world = apply_rotation(base, HandleAxis::X, ReferenceSpace::World, FRAC_PI_2);
        assert!(world.abs_diff_eq(Quat::from_rotation_x(FRAC_PI_2) * base, 1e-6));
        assert!(!world.abs_diff_eq(rotated, 1e-3));
    }

    #[test]
    fn free_rotation_turns_about_world_up() {
        let rotated = apply_rotation(Quat::IDENTITY, HandleAxis::Free, ReferenceSpace::Local, 0.5);
        assert!(rotated.abs_diff_eq(Quat::from_rotation_y(0.5), 1e-6));
    }

    #[test]
    fn non_finite_angles_are_ignored() {
        let base = Quat::from_rotation_y(0.3);
        assert_eq!(apply_rotation(base, HandleAxis::Y, ReferenceSpace::World, f32::NAN), base);
    }

    #[test]
    fn axis_scale_changes_one_component() {
        let scaled = apply_scale(Vec3::ONE, HandleAxis::Y, 0.5, 0.01, 100.0);
        assert_eq!(scaled, Vec3::new(1.0, 1.5, 1.0));
    }

    #[test]
    fn uniform_scale_is_clamped() {
        let scaled = apply_scale(Vec3::new(0.1, 1.0, 99.0), HandleAxis::Uniform, 5.0, 0.01, 100.0);
        assert_eq!(scaled, Vec3::new(5.1, 6.0, 100.0));
        let shrunk = apply_scale(Vec3::ONE, HandleAxis::Free, -5.0, 0.01, 100.0);
        assert_eq!(shrunk, Vec3::splat(0.01));
    }
}
