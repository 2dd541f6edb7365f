mod drag;
mod handles;
mod manipulate;

pub use drag::*;
pub use handles::*;
pub use manipulate::*;

use bevy::gizmos::config::{DefaultGizmoConfigGroup, GizmoConfigStore};
use bevy::prelude::*;

use crate::constants::{gizmo_colors, sizes::MIN_OBJECT_RADIUS};
use crate::editor::{EditMode, EditSession, EditorCamera, TransformOperation};

/// Gizmos drawn on top of scene geometry
#[derive(Default, Reflect, GizmoConfigGroup)]
pub struct XRayGizmoConfig;

pub struct EditorGizmosPlugin;

impl Plugin for EditorGizmosPlugin {
    fn build(&self, app: &mut App) {
        app.init_gizmo_group::<XRayGizmoConfig>()
            .add_systems(Startup, configure_gizmos)
            .add_systems(
                Update,
                (draw_origin_axes, draw_transform_gizmo, draw_sub_elements),
            );
    }
}

/// Configure gizmo appearance
fn configure_gizmos(mut config_store: ResMut<GizmoConfigStore>) {
    let (config, _) = config_store.config_mut::<DefaultGizmoConfigGroup>();
    config.line.width = 3.0;

    let (xray, _) = config_store.config_mut::<XRayGizmoConfig>();
    xray.line.width = 3.0;
    xray.depth_bias = -1.0;
}

/// Draw origin axis indicators
fn draw_origin_axes(mut gizmos: Gizmos) {
    gizmos.line(Vec3::ZERO, Vec3::X * 2.0, Color::srgb(1.0, 0.0, 0.0));
    gizmos.line(Vec3::ZERO, Vec3::Y * 2.0, Color::srgb(0.0, 1.0, 0.0));
    gizmos.line(Vec3::ZERO, Vec3::Z * 2.0, Color::srgb(0.0, 0.0, 1.0));
}

/// Handle colour, brightened while it is being dragged and dimmed while another is.
fn handle_color(handle: HandleAxis, active: Option<HandleAxis>) -> Color {
    match active {
        Some(active) if active == handle => gizmo_colors::SELECTED,
        Some(_) => handle.color().with_alpha(0.5),
        None => handle.color(),
    }
}

fn draw_transform_gizmo(
    mut gizmos: Gizmos<XRayGizmoConfig>,
    session: Res<EditSession>,
    camera: Query<&Transform, With<EditorCamera>>,
) {
    let Ok(camera) = camera.single() else {
        return;
    };
    let Some((position, _)) = session.gizmo_pose() else {
        return;
    };
    let Some(pose) = session.gizmo(camera.translation.distance(position)) else {
        return;
    };
    let active = session.drag().state().map(|state| state.handle);

    match session.operation() {
        TransformOperation::Translate => draw_translate_gizmo(&mut gizmos, &pose, active),
        TransformOperation::Rotate => draw_rotate_gizmo(&mut gizmos, &pose, active),
        TransformOperation::Scale => draw_scale_gizmo(&mut gizmos, &pose, active),
    }
}

fn draw_translate_gizmo(gizmos: &mut Gizmos<XRayGizmoConfig>, pose: &GizmoPose, active: Option<HandleAxis>) {
    let arrow_size = pose.length * 0.1;

    for handle in HandleAxis::AXES {
        let Some(end) = pose.axis_end(handle) else {
            continue;
        };
        let color = handle_color(handle, active);
        let dir = (end - pose.position).normalize_or_zero();
        // Arrowhead fins lie in the plane of the next axis
        let side = pose.rotation * next_axis(handle) * arrow_size;

        gizmos.line(pose.position, end, color);
        gizmos.line(end, end - dir * arrow_size + side, color);
        gizmos.line(end, end - dir * arrow_size - side, color);
    }

    gizmos.sphere(
        Isometry3d::from_translation(pose.position),
        pose.center_radius(),
        handle_color(HandleAxis::Free, active),
    );
}

fn draw_rotate_gizmo(gizmos: &mut Gizmos<XRayGizmoConfig>, pose: &GizmoPose, active: Option<HandleAxis>) {
    let radius = pose.length * 0.8;
    let segments = 32;

    for handle in HandleAxis::AXES {
        let Some(axis) = handle.unit() else {
            continue;
        };
        let color = handle_color(handle, active);
        let u = pose.rotation * next_axis(handle);
        let v = pose.rotation * axis.cross(next_axis(handle));

        for i in 0..segments {
            let a1 = (i as f32 / segments as f32) * std::f32::consts::TAU;
            let a2 = ((i + 1) as f32 / segments as f32) * std::f32::consts::TAU;
            let p1 = pose.position + (u * a1.cos() + v * a1.sin()) * radius;
            let p2 = pose.position + (u * a2.cos() + v * a2.sin()) * radius;
            gizmos.line(p1, p2, color);
        }
    }

    gizmos.sphere(
        Isometry3d::from_translation(pose.position),
        pose.center_radius(),
        handle_color(HandleAxis::Free, active),
    );
}

fn draw_scale_gizmo(gizmos: &mut Gizmos<XRayGizmoConfig>, pose: &GizmoPose, active: Option<HandleAxis>) {
    let box_size = pose.length * 0.08;

    for handle in HandleAxis::AXES {
        let Some(end) = pose.axis_end(handle) else {
            continue;
        };
        let color = handle_color(handle, active);
        gizmos.line(pose.position, end, color);
        gizmos.cube(
            Transform::from_translation(end)
                .with_rotation(pose.rotation)
                .with_scale(Vec3::splat(box_size)),
            color,
        );
    }

    gizmos.cube(
        Transform::from_translation(pose.position)
            .with_rotation(pose.rotation)
            .with_scale(Vec3::splat(box_size * 1.5)),
        handle_color(HandleAxis::Uniform, active),
    );
}

fn next_axis(handle: HandleAxis) -> Vec3 {
    match handle {
        HandleAxis::X => Vec3::Y,
        HandleAxis::Y => Vec3::Z,
        _ => Vec3::X,
    }
}

/// Selected groups, trigger orbs and the multi-select group orb.
fn draw_sub_elements(
    mut gizmos: Gizmos<XRayGizmoConfig>,
    session: Res<EditSession>,
) {
    if session.mode() != EditMode::SubElement {
        return;
    }
    let Some(object) = session.selected_object() else {
        return;
    };
    let stage = session.stage();
    let triggers = session.triggers();

    if session.settings().trigger_orbs {
        let radius = triggers.orb_radius();
        for item in triggers.items() {
            let color = if stage.is_selected(&item.group.key) {
                gizmo_colors::SELECTED
            } else {
                gizmo_colors::UNSELECTED
            };
            gizmos.sphere(
                Isometry3d::from_translation(object.local_to_world(item.center_local)),
                radius,
                color,
            );
        }

        if let Some(center) = triggers.group_orb(object, stage) {
            gizmos.sphere(
                Isometry3d::from_translation(center),
                triggers.group_orb_radius(),
                gizmo_colors::CENTER,
            );
        }
    }

    let marker = object.world_radius().max(MIN_OBJECT_RADIUS) * 0.04;
    for group in stage.selection() {
        let center = object.local_to_world(group.centroid_local);
        gizmos.sphere(Isometry3d::from_translation(center), marker, gizmo_colors::SELECTED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dragged_handle_is_highlighted() {
        assert_eq!(handle_color(HandleAxis::X, None), gizmo_colors::X);
        assert_eq!(handle_color(HandleAxis::X, Some(HandleAxis::X)), gizmo_colors::SELECTED);
        assert_eq!(
            handle_color(HandleAxis::Y, Some(HandleAxis::X)),
            gizmo_colors::Y.with_alpha(0.5)
        );
    }

    #[test]
    fn ring_basis_is_perpendicular_to_its_axis() {
        for handle in HandleAxis::AXES {
            let axis = handle.unit().unwrap();
            let u = next_axis(handle);
            assert_eq!(axis.dot(u), 0.0);
            assert_eq!(axis.dot(axis.cross(u)), 0.0);
        }
    }
}
