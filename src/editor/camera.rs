use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll};
use bevy::prelude::*;

use crate::constants::sizes::MIN_OBJECT_RADIUS;
use crate::settings::DollySettings;

/// Default vertical field of view (in degrees)
const DEFAULT_FOV_DEGREES: f32 = 50.0;
/// Orbit speed in radians per pixel of right-drag
const ORBIT_SENSITIVITY: f32 = 0.005;
/// Distance multiplier per scroll unit
const ZOOM_SPEED: f32 = 0.1;
const MIN_ORBIT_DISTANCE: f32 = 0.5;
const MAX_ORBIT_DISTANCE: f32 = 500.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 1000.0;

/// Camera queries needed by picking and drag math.
///
/// Screen coordinates are logical pixels with the origin at the top-left.
pub trait Viewport {
    /// World-space ray through a screen position
    fn ray_from_screen(&self, screen: Vec2) -> Option<Ray3d>;
    /// Normalized device coordinates, `None` behind the camera
    fn world_to_ndc(&self, world: Vec3) -> Option<Vec3>;
    fn world_to_screen(&self, world: Vec3) -> Option<Vec2>;
    fn camera_position(&self) -> Vec3;
    /// Unit forward vector
    fn view_direction(&self) -> Vec3;
    /// Distance from the eye to the orbit target
    fn camera_distance(&self) -> f32;
    /// Move the eye along the eye-target line
    fn set_camera_distance(&mut self, distance: f32);
}

/// Perspective camera looking at a target point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitView {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub viewport_size: Vec2,
    pub near: f32,
    pub far: f32,
}

impl Default for OrbitView {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: DEFAULT_FOV_DEGREES.to_radians(),
            viewport_size: Vec2::new(1280.0, 720.0),
            near: NEAR_PLANE,
            far: FAR_PLANE,
        }
    }
}

impl OrbitView {
    pub fn looking_at(eye: Vec3, target: Vec3, viewport_size: Vec2) -> Self {
        Self {
            eye,
            target,
            viewport_size,
            ..default()
        }
    }

    fn aspect(&self) -> f32 {
        if self.viewport_size.y <= 0.0 {
            return 1.0;
        }
        self.viewport_size.x / self.viewport_size.y
    }

    fn view_projection(&self) -> Mat4 {
        let projection = Mat4::perspective_rh(self.fov_y, self.aspect(), self.near, self.far);
        let view = Mat4::look_at_rh(self.eye, self.target, self.up);
        projection * view
    }

    fn screen_to_ndc(&self, screen: Vec2) -> Vec2 {
        Vec2::new(
            2.0 * screen.x / self.viewport_size.x - 1.0,
            1.0 - 2.0 * screen.y / self.viewport_size.y,
        )
    }

    /// Camera transform for rendering this view.
    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye).looking_at(self.target, self.up)
    }
}

impl Viewport for OrbitView {
    fn ray_from_screen(&self, screen: Vec2) -> Option<Ray3d> {
        if self.viewport_size.min_element() <= 0.0 {
            return None;
        }
        let ndc = self.screen_to_ndc(screen);
        let inverse = self.view_projection().inverse();
        // glam's right-handed perspective maps depth to 0..1
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        let direction = Dir3::new(far - near).ok()?;
        Some(Ray3d::new(near, direction))
    }

    fn world_to_ndc(&self, world: Vec3) -> Option<Vec3> {
        let clip = self.view_projection() * world.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        Some(clip.truncate() / clip.w)
    }

    fn world_to_screen(&self, world: Vec3) -> Option<Vec2> {
        let ndc = self.world_to_ndc(world)?;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.viewport_size.x,
            (1.0 - ndc.y) * 0.5 * self.viewport_size.y,
        ))
    }

    fn camera_position(&self) -> Vec3 {
        self.eye
    }

    fn view_direction(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }

    fn camera_distance(&self) -> f32 {
        self.eye.distance(self.target)
    }

    fn set_camera_distance(&mut self, distance: f32) {
        let back = (self.eye - self.target).normalize_or(Vec3::Z);
        self.eye = self.target + back * distance;
    }
}

/// Pulls the camera back while a dragged anchor approaches the edge of the view.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeDolly {
    pub settings: DollySettings,
}

impl EdgeDolly {
    pub fn new(settings: DollySettings) -> Self {
        Self { settings }
    }

    /// Whether `anchor` is inside the edge margin (or off screen entirely).
    pub fn near_edge(&self, viewport: &dyn Viewport, anchor: Vec3) -> bool {
        let Some(ndc) = viewport.world_to_ndc(anchor) else {
            return true;
        };
        let limit = 1.0 - self.settings.edge_margin;
        ndc.x.abs() > limit || ndc.y.abs() > limit
    }

    /// Nudge the camera distance toward the dolly target.
    ///
    /// Only the camera moves. Returns `true` if the distance changed.
    pub fn apply(
        &self,
        viewport: &mut dyn Viewport,
        anchor: Vec3,
        base_distance: f32,
        moved_distance: f32,
        object_radius: f32,
    ) -> bool {
        if !self.settings.enabled || !self.near_edge(viewport, anchor) {
            return false;
        }

        let s = &self.settings;
        let radius = object_radius.max(MIN_OBJECT_RADIUS);
        let target = (base_distance + s.gain * moved_distance / radius)
            .clamp(s.min_distance, s.max_distance);
        let current = viewport.camera_distance();
        let next = current + (target - current) * s.smoothing.clamp(0.0, 1.0);
        if (next - current).abs() < f32::EPSILON || !next.is_finite() {
            return false;
        }
        viewport.set_camera_distance(next);
        true
    }
}

/// Marker component for the editor camera
#[derive(Component)]
pub struct EditorCamera;

/// Orbit camera state
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 10.0,
            yaw: std::f32::consts::FRAC_PI_4,
            pitch: -std::f32::consts::FRAC_PI_6, // Look slightly down
            fov_degrees: DEFAULT_FOV_DEGREES,
        }
    }
}

impl OrbitCamera {
    pub fn eye(&self) -> Vec3 {
        let rotation = Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0);
        self.target + rotation * Vec3::Z * self.distance
    }

    /// Pure view for picking and drag math.
    pub fn view(&self, viewport_size: Vec2) -> OrbitView {
        OrbitView {
            fov_y: self.fov_degrees.to_radians(),
            ..OrbitView::looking_at(self.eye(), self.target, viewport_size)
        }
    }
}

pub struct EditorCameraPlugin;

impl Plugin for EditorCameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_editor_camera)
            .add_systems(Update, (camera_orbit, camera_zoom, sync_orbit_transform).chain());
    }
}

fn spawn_editor_camera(mut commands: Commands) {
    let orbit = OrbitCamera::default();
    let view = orbit.view(Vec2::ONE);

    commands.spawn((
        EditorCamera,
        orbit,
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: orbit.fov_degrees.to_radians(),
            near: NEAR_PLANE,
            far: FAR_PLANE,
            ..default()
        }),
        view.transform(),
    ));
}

/// Orbit around the target with right mouse button drag
fn camera_orbit(
    mouse_button: Res<ButtonInput<MouseButton>>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mut query: Query<&mut OrbitCamera, With<EditorCamera>>,
) {
    if !mouse_button.pressed(MouseButton::Right) {
        return;
    }

    let delta = mouse_motion.delta;
    if delta == Vec2::ZERO {
        return;
    }

    for mut orbit in &mut query {
        orbit.yaw -= delta.x * ORBIT_SENSITIVITY;
        orbit.pitch = (orbit.pitch - delta.y * ORBIT_SENSITIVITY)
            .clamp(-std::f32::consts::FRAC_PI_2 + 0.1, std::f32::consts::FRAC_PI_2 - 0.1);
    }
}

/// Scroll to move toward or away from the target
fn camera_zoom(
    scroll: Res<AccumulatedMouseScroll>,
    mut query: Query<&mut OrbitCamera, With<EditorCamera>>,
) {
    let scroll_y = scroll.delta.y;
    if scroll_y == 0.0 {
        return;
    }

    for mut orbit in &mut query {
        let zoom_factor = 1.0 - scroll_y * ZOOM_SPEED;
        orbit.distance = (orbit.distance * zoom_factor).clamp(MIN_ORBIT_DISTANCE, MAX_ORBIT_DISTANCE);
    }
}

fn sync_orbit_transform(
    mut query: Query<(&OrbitCamera, &mut Transform), (With<EditorCamera>, Changed<OrbitCamera>)>,
) {
    for (orbit, mut transform) in &mut query {
        *transform = orbit.view(Vec2::ONE).transform();
    }
}
