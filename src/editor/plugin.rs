use bevy::prelude::*;
use std::collections::HashMap;

use super::camera::{EditorCamera, EditorCameraPlugin};
use super::input::EditorInputPlugin;
use super::session::EditSession;
use super::state::EditorStatePlugin;
use crate::commands::CommandsPlugin;
use crate::gizmos::EditorGizmosPlugin;
use crate::scene::ObjectId;
use crate::settings::EditSettings;

/// Main editor plugin that bundles all editor functionality
pub struct EditorPlugin;

impl Plugin for EditorPlugin {
    fn build(&self, app: &mut App) {
        let settings = EditSettings::load();

        app.insert_resource(EditSession::new(settings.clone()))
            .insert_resource(settings)
            // Editor core
            .add_plugins(CommandsPlugin)
            .add_plugins(EditorStatePlugin)
            .add_plugins(EditorInputPlugin)
            .add_plugins(EditorCameraPlugin)
            .add_plugins(EditorGizmosPlugin)
            // Setup
            .add_systems(Startup, setup_editor_scene)
            .add_systems(
                PostUpdate,
                (
                    update_trigger_sizes,
                    (sync_scene_entities, sync_settings).run_if(resource_changed::<EditSession>),
                ),
            );
    }
}

/// Links a rendered entity to the scene object it mirrors.
#[derive(Component, Debug, Clone, Copy)]
pub struct SceneEntity {
    pub id: ObjectId,
    /// Mesh revision last uploaded
    pub revision: u64,
}

/// Material shared by every editable primitive
#[derive(Resource)]
struct PrimitiveMaterial(Handle<StandardMaterial>);

/// Setup initial editor scene with lighting
fn setup_editor_scene(mut commands: Commands, mut materials: ResMut<Assets<StandardMaterial>>) {
    commands.spawn(AmbientLight {
        color: Color::WHITE,
        brightness: 300.0,
        affects_lightmapped_meshes: true,
    });

    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 8.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.insert_resource(PrimitiveMaterial(materials.add(StandardMaterial {
        base_color: Color::srgb(0.7, 0.7, 0.75),
        perceptual_roughness: 0.6,
        double_sided: true,
        cull_mode: None,
        ..default()
    })));
}

/// Size trigger orbs for the current camera position
fn update_trigger_sizes(
    camera: Query<&GlobalTransform, With<EditorCamera>>,
    mut session: ResMut<EditSession>,
) {
    let Ok(camera) = camera.single() else {
        return;
    };
    if session.triggers().items().is_empty() {
        return;
    }
    // Avoid flagging the session as changed every frame
    session.bypass_change_detection().update_triggers(camera.translation());
}

/// Copy settings changed through the session back to the resource and save them
fn sync_settings(session: Res<EditSession>, mut settings: ResMut<EditSettings>) {
    if *settings != *session.settings() {
        *settings = session.settings().clone();
        settings.save();
    }
}

/// Mirror scene objects onto render entities: transforms every change, meshes
/// only when their revision moved.
fn sync_scene_entities(
    mut commands: Commands,
    session: Res<EditSession>,
    material: Option<Res<PrimitiveMaterial>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut entities: Query<(Entity, &mut SceneEntity, &mut Transform, &mut Mesh3d)>,
) {
    let Some(material) = material else {
        return;
    };
    let scene = session.scene();
    let mut seen: HashMap<ObjectId, Entity> = HashMap::new();

    for (entity, mut link, mut transform, mut mesh) in &mut entities {
        let Some(object) = scene.find(link.id) else {
            debug!("Despawning render entity for {}", link.id);
            commands.entity(entity).despawn();
            continue;
        };
        if seen.insert(link.id, entity).is_some() {
            commands.entity(entity).despawn();
            continue;
        }

        if *transform != object.transform {
            *transform = object.transform;
        }
        if link.revision != object.mesh.revision() {
            mesh.0 = meshes.add(object.mesh.to_bevy_mesh());
            link.revision = object.mesh.revision();
        }
    }

    for object in scene.iter().filter(|o| !seen.contains_key(&o.id)) {
        debug!("Spawning render entity for {}", object.id);
        commands.spawn((
            Name::new(format!("{} {}", object.shape.display_name(), object.id)),
            SceneEntity {
                id: object.id,
                revision: object.mesh.revision(),
            },
            Mesh3d(meshes.add(object.mesh.to_bevy_mesh())),
            MeshMaterial3d(material.0.clone()),
            object.transform,
        ));
    }
}
