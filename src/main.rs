//! Main binary for running the editor standalone.

use bevy::prelude::*;
use bevy_primitive_editor::{EditorPlugin, PrimitiveShape, SpawnPrimitiveEvent};

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Bevy Primitive Editor".to_string(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EditorPlugin)
        .add_systems(Startup, spawn_starter_box)
        .run();
}

fn spawn_starter_box(mut spawn_events: MessageWriter<SpawnPrimitiveEvent>) {
    spawn_events.write(SpawnPrimitiveEvent {
        shape: PrimitiveShape::Cube,
        transform: Transform::IDENTITY,
    });
}
