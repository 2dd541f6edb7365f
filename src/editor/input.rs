use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use super::camera::{EditorCamera, OrbitCamera, Viewport};
use super::session::{EditMode, EditSession, TransformOperation};
use super::state::{
    CancelSubEditEvent, ConfirmSubEditEvent, DeleteSelectedEvent, SetEditModeEvent,
    SetSubElementFlagsEvent, SetTransformOperationEvent, SpawnPrimitiveEvent,
    ToggleReferenceSpaceEvent,
};
use crate::modeling::{FlagsPatch, TapOutcome};
use crate::scene::PrimitiveShape;

/// World units per arrow-key press
const NUDGE_STEP: f32 = 0.1;
/// Pointer travel (pixels) under which a press-release counts as a tap
const TAP_SLOP: f32 = 8.0;
/// Two taps closer than this (seconds) form a double tap
const DOUBLE_TAP_SECONDS: f64 = 0.35;

/// Pointer bookkeeping between frames
#[derive(Resource, Default)]
pub struct PointerState {
    press_position: Option<Vec2>,
    /// A gizmo handle was grabbed on press
    dragging: bool,
    last_tap: Option<(f64, Vec2)>,
}

impl PointerState {
    /// Record a tap. Returns `true` if it completes a double tap.
    fn register_tap(&mut self, now: f64, position: Vec2) -> bool {
        let double = self.last_tap.is_some_and(|(time, last)| {
            now - time <= DOUBLE_TAP_SECONDS && last.distance(position) <= TAP_SLOP
        });
        self.last_tap = if double { None } else { Some((now, position)) };
        double
    }
}

pub struct EditorInputPlugin;

impl Plugin for EditorInputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PointerState>().add_systems(
            Update,
            (
                handle_mode_input,
                handle_sub_element_input,
                handle_spawn_input,
                handle_nudge_input,
                handle_pointer_input,
            ),
        );
    }
}

fn shift_held(keyboard: &ButtonInput<KeyCode>) -> bool {
    keyboard.pressed(KeyCode::ShiftLeft) || keyboard.pressed(KeyCode::ShiftRight)
}

fn ctrl_held(keyboard: &ButtonInput<KeyCode>) -> bool {
    keyboard.pressed(KeyCode::ControlLeft) || keyboard.pressed(KeyCode::ControlRight)
}

/// Q/W/E pick the operation, T flips the gizmo space, Tab switches edit mode
fn handle_mode_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    session: Res<EditSession>,
    mut mode_events: MessageWriter<SetEditModeEvent>,
    mut operation_events: MessageWriter<SetTransformOperationEvent>,
    mut space_events: MessageWriter<ToggleReferenceSpaceEvent>,
    mut delete_events: MessageWriter<DeleteSelectedEvent>,
) {
    if ctrl_held(&keyboard) {
        return;
    }

    if keyboard.just_pressed(KeyCode::Tab) {
        mode_events.write(SetEditModeEvent(session.mode().toggled()));
    }

    if keyboard.just_pressed(KeyCode::KeyQ) {
        operation_events.write(SetTransformOperationEvent(TransformOperation::Translate));
    } else if keyboard.just_pressed(KeyCode::KeyW) {
        operation_events.write(SetTransformOperationEvent(TransformOperation::Rotate));
    } else if keyboard.just_pressed(KeyCode::KeyE) {
        operation_events.write(SetTransformOperationEvent(TransformOperation::Scale));
    }

    if keyboard.just_pressed(KeyCode::KeyT) {
        space_events.write(ToggleReferenceSpaceEvent);
    }

    if keyboard.just_pressed(KeyCode::Delete) {
        delete_events.write(DeleteSelectedEvent);
    }
}

/// 1/2/3 toggle vertex/edge/face picking, 4 toggles explode, Enter commits,
/// Escape reverts, M steps through multi-select, O toggles trigger orbs
fn handle_sub_element_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut session: ResMut<EditSession>,
    mut flag_events: MessageWriter<SetSubElementFlagsEvent>,
    mut confirm_events: MessageWriter<ConfirmSubEditEvent>,
    mut cancel_events: MessageWriter<CancelSubEditEvent>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        cancel_events.write(CancelSubEditEvent);
    }

    if session.mode() != EditMode::SubElement || shift_held(&keyboard) || ctrl_held(&keyboard) {
        return;
    }

    let flags = session.flags();
    let patch = if keyboard.just_pressed(KeyCode::Digit1) {
        Some(FlagsPatch {
            verts: Some(!flags.verts),
            ..default()
        })
    } else if keyboard.just_pressed(KeyCode::Digit2) {
        Some(FlagsPatch {
            edges: Some(!flags.edges),
            ..default()
        })
    } else if keyboard.just_pressed(KeyCode::Digit3) {
        Some(FlagsPatch {
            faces: Some(!flags.faces),
            ..default()
        })
    } else if keyboard.just_pressed(KeyCode::Digit4) {
        Some(FlagsPatch {
            explode: Some(!flags.explode),
            ..default()
        })
    } else {
        None
    };
    if let Some(patch) = patch {
        flag_events.write(SetSubElementFlagsEvent(patch));
    }

    if keyboard.just_pressed(KeyCode::Enter) {
        confirm_events.write(ConfirmSubEditEvent);
    }

    // M starts multi-select, M again shows the group orb, Backspace leaves it
    if keyboard.just_pressed(KeyCode::KeyM) {
        if session.triggers().is_multi() {
            if !session.finish_multi() {
                info!("Multi-select needs at least two elements for a group gizmo");
            }
        } else {
            session.begin_multi();
            info!("Multi-select: tap elements, then press M again");
        }
    }
    if keyboard.just_pressed(KeyCode::Backspace) {
        session.end_multi();
    }

    if keyboard.just_pressed(KeyCode::KeyO) {
        let enabled = !session.settings().trigger_orbs;
        session.set_trigger_orbs(enabled);
        info!("Trigger orbs: {}", if enabled { "ON" } else { "OFF" });
    }
}

/// Shift+1..6 add a primitive at the orbit target
fn handle_spawn_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    camera: Query<&OrbitCamera, With<EditorCamera>>,
    mut spawn_events: MessageWriter<SpawnPrimitiveEvent>,
) {
    if !shift_held(&keyboard) || ctrl_held(&keyboard) {
        return;
    }

    const KEYS: [(KeyCode, PrimitiveShape); 6] = [
        (KeyCode::Digit1, PrimitiveShape::Cube),
        (KeyCode::Digit2, PrimitiveShape::Sphere),
        (KeyCode::Digit3, PrimitiveShape::Cylinder),
        (KeyCode::Digit4, PrimitiveShape::Cone),
        (KeyCode::Digit5, PrimitiveShape::Torus),
        (KeyCode::Digit6, PrimitiveShape::Plane),
    ];

    let target = camera.single().map(|orbit| orbit.target).unwrap_or_default();
    for (key, shape) in KEYS {
        if keyboard.just_pressed(key) {
            spawn_events.write(SpawnPrimitiveEvent {
                shape,
                transform: Transform::from_translation(target),
            });
        }
    }
}

/// Arrow keys nudge along X/Y, PageUp/PageDown along Z
fn handle_nudge_input(keyboard: Res<ButtonInput<KeyCode>>, mut session: ResMut<EditSession>) {
    let mut delta = Vec3::ZERO;
    if keyboard.just_pressed(KeyCode::ArrowRight) {
        delta.x += NUDGE_STEP;
    }
    if keyboard.just_pressed(KeyCode::ArrowLeft) {
        delta.x -= NUDGE_STEP;
    }
    if keyboard.just_pressed(KeyCode::ArrowUp) {
        delta.y += NUDGE_STEP;
    }
    if keyboard.just_pressed(KeyCode::ArrowDown) {
        delta.y -= NUDGE_STEP;
    }
    if keyboard.just_pressed(KeyCode::PageUp) {
        delta.z -= NUDGE_STEP;
    }
    if keyboard.just_pressed(KeyCode::PageDown) {
        delta.z += NUDGE_STEP;
    }

    if delta != Vec3::ZERO {
        session.nudge(delta);
    }
}

/// Left button: grab gizmo handles, tap to select, double tap to toggle.
fn handle_pointer_input(
    mouse_button: Res<ButtonInput<MouseButton>>,
    time: Res<Time>,
    window: Query<&Window, With<PrimaryWindow>>,
    mut camera: Query<&mut OrbitCamera, With<EditorCamera>>,
    mut session: ResMut<EditSession>,
    mut pointer: ResMut<PointerState>,
) {
    let Ok(window) = window.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok(mut orbit) = camera.single_mut() else {
        return;
    };
    let mut view = orbit.view(window.size());

    if mouse_button.just_pressed(MouseButton::Left) {
        pointer.press_position = Some(cursor);
        pointer.dragging = session.pointer_down(None, &view, cursor);
        return;
    }

    if mouse_button.pressed(MouseButton::Left) && pointer.dragging {
        if session.pointer_move(&mut view, cursor).is_some() {
            let distance = view.camera_distance();
            if (distance - orbit.distance).abs() > f32::EPSILON {
                orbit.distance = distance;
            }
        }
        return;
    }

    if !mouse_button.just_released(MouseButton::Left) {
        return;
    }

    let press = pointer.press_position.take();
    if std::mem::take(&mut pointer.dragging) {
        session.pointer_up();
        return;
    }
    if press.is_none_or(|p| p.distance(cursor) > TAP_SLOP) {
        return;
    }
    let Some(ray) = view.ray_from_screen(cursor) else {
        return;
    };

    if pointer.register_tap(time.elapsed_secs_f64(), cursor) {
        session.handle_double_tap(ray);
        return;
    }

    match session.mode() {
        EditMode::Object => {
            let hit = session.pick_object(ray);
            session.select(hit);
        }
        EditMode::SubElement if session.settings().trigger_orbs => {
            if let TapOutcome::ShowGizmo { center } = session.tap(ray) {
                debug!("Gizmo at {center}");
            }
        }
        EditMode::SubElement => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_tap_needs_time_and_proximity() {
        let mut pointer = PointerState::default();
        assert!(!pointer.register_tap(1.0, Vec2::new(100.0, 100.0)));
        assert!(pointer.register_tap(1.2, Vec2::new(103.0, 100.0)));
        // A completed double tap does not chain into a third
        assert!(!pointer.register_tap(1.3, Vec2::new(103.0, 100.0)));

        assert!(!pointer.register_tap(2.0, Vec2::new(300.0, 100.0)));
        assert!(!pointer.register_tap(2.1, Vec2::new(100.0, 100.0)));
        assert!(!pointer.register_tap(3.0, Vec2::new(100.0, 100.0)));
    }
}
