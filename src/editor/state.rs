use bevy::prelude::*;

use super::session::{EditMode, EditSession, TransformOperation};
use crate::commands::{RedoEvent, UndoEvent};
use crate::gizmos::ReferenceSpace;
use crate::modeling::FlagsPatch;
use crate::scene::PrimitiveShape;

/// Event to add a primitive to the scene
#[derive(Message)]
pub struct SpawnPrimitiveEvent {
    pub shape: PrimitiveShape,
    pub transform: Transform,
}

/// Event to delete the selected object
#[derive(Message)]
pub struct DeleteSelectedEvent;

/// Event to switch between object and sub-element editing
#[derive(Message)]
pub struct SetEditModeEvent(pub EditMode);

/// Event to change the transform operation
#[derive(Message)]
pub struct SetTransformOperationEvent(pub TransformOperation);

/// Event to flip the gizmo between world and local axes
#[derive(Message)]
pub struct ToggleReferenceSpaceEvent;

/// Event to change which sub-element kinds are pickable
#[derive(Message)]
pub struct SetSubElementFlagsEvent(pub FlagsPatch);

/// Event to commit staged sub-element edits
#[derive(Message)]
pub struct ConfirmSubEditEvent;

/// Event to revert staged sub-element edits (or abort an object drag)
#[derive(Message)]
pub struct CancelSubEditEvent;

pub struct EditorStatePlugin;

impl Plugin for EditorStatePlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<SpawnPrimitiveEvent>()
            .add_message::<DeleteSelectedEvent>()
            .add_message::<SetEditModeEvent>()
            .add_message::<SetTransformOperationEvent>()
            .add_message::<ToggleReferenceSpaceEvent>()
            .add_message::<SetSubElementFlagsEvent>()
            .add_message::<ConfirmSubEditEvent>()
            .add_message::<CancelSubEditEvent>()
            .add_systems(
                Update,
                (
                    handle_spawn_primitive,
                    handle_delete_selected,
                    handle_set_edit_mode,
                    handle_set_transform_operation,
                    handle_toggle_reference_space,
                    handle_set_sub_element_flags,
                    handle_confirm_sub_edit,
                    handle_cancel_sub_edit,
                    handle_undo,
                    handle_redo,
                )
                    .chain(),
            );
    }
}

fn handle_spawn_primitive(
    mut events: MessageReader<SpawnPrimitiveEvent>,
    mut session: ResMut<EditSession>,
) {
    for event in events.read() {
        session.spawn(event.shape, event.transform);
    }
}

fn handle_delete_selected(
    mut events: MessageReader<DeleteSelectedEvent>,
    mut session: ResMut<EditSession>,
) {
    for _ in events.read() {
        if !session.delete_selected() {
            debug!("Nothing selected to delete");
        }
    }
}

fn handle_set_edit_mode(mut events: MessageReader<SetEditModeEvent>, mut session: ResMut<EditSession>) {
    for event in events.read() {
        session.set_mode(event.0);
    }
}

fn handle_set_transform_operation(
    mut events: MessageReader<SetTransformOperationEvent>,
    mut session: ResMut<EditSession>,
) {
    for event in events.read() {
        session.set_operation(event.0);
        if session.mode() == EditMode::SubElement && event.0 != TransformOperation::Translate {
            info!("Sub-elements can only be translated");
        }
    }
}

fn handle_toggle_reference_space(
    mut events: MessageReader<ToggleReferenceSpaceEvent>,
    mut session: ResMut<EditSession>,
) {
    for _ in events.read() {
        let space = session.space().toggled();
        session.set_space(space);
        info!(
            "Gizmo space: {}",
            match space {
                ReferenceSpace::World => "WORLD",
                ReferenceSpace::Local => "LOCAL",
            }
        );
    }
}

fn handle_set_sub_element_flags(
    mut events: MessageReader<SetSubElementFlagsEvent>,
    mut session: ResMut<EditSession>,
) {
    for event in events.read() {
        session.set_flags(event.0);
        let flags = session.flags();
        info!(
            "Pickable: verts={} edges={} faces={} explode={}",
            flags.verts, flags.edges, flags.faces, flags.explode
        );
    }
}

fn handle_confirm_sub_edit(
    mut events: MessageReader<ConfirmSubEditEvent>,
    mut session: ResMut<EditSession>,
) {
    for _ in events.read() {
        session.confirm();
    }
}

fn handle_cancel_sub_edit(
    mut events: MessageReader<CancelSubEditEvent>,
    mut session: ResMut<EditSession>,
) {
    for _ in events.read() {
        session.cancel();
    }
}

fn handle_undo(mut events: MessageReader<UndoEvent>, mut session: ResMut<EditSession>) {
    for _ in events.read() {
        if !session.undo() {
            info!("Nothing to undo");
        }
    }
}

fn handle_redo(mut events: MessageReader<RedoEvent>, mut session: ResMut<EditSession>) {
    for _ in events.read() {
        if !session.redo() {
            info!("Nothing to redo");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        let mut app = App::new();
        app.insert_resource(EditSession::default())
            .add_message::<UndoEvent>()
            .add_message::<RedoEvent>()
            .add_plugins(EditorStatePlugin);
        app
    }

    #[test]
    fn messages_drive_the_session() {
        let mut app = test_app();
        app.world_mut().write_message(SpawnPrimitiveEvent {
            shape: PrimitiveShape::Cube,
            transform: Transform::from_xyz(0.0, 1.0, 0.0),
        });
        app.update();
        assert_eq!(app.world().resource::<EditSession>().scene().len(), 1);

        app.world_mut().write_message(UndoEvent);
        app.update();
        assert!(app.world().resource::<EditSession>().scene().is_empty());

        app.world_mut().write_message(RedoEvent);
        app.update();
        assert_eq!(app.world().resource::<EditSession>().scene().len(), 1);

        app.world_mut().write_message(DeleteSelectedEvent);
        app.update();
        assert!(app.world().resource::<EditSession>().scene().is_empty());
    }

    #[test]
    fn mode_and_flag_messages() {
        let mut app = test_app();
        app.world_mut().write_message(SetEditModeEvent(EditMode::SubElement));
        app.world_mut().write_message(SetSubElementFlagsEvent(FlagsPatch {
            faces: Some(true),
            ..default()
        }));
        app.world_mut().write_message(ToggleReferenceSpaceEvent);
        app.update();

        let session = app.world().resource::<EditSession>();
        assert_eq!(session.mode(), EditMode::SubElement);
        assert!(session.flags().faces);
        assert!(session.flags().verts);
        assert_eq!(session.space(), ReferenceSpace::Local);
    }
}
