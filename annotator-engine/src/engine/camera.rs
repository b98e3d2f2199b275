use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;

use crate::engine::library::{ActiveCloud, CloudActivated, CloudLibrary};

const YAW_SENSITIVITY: f32 = 0.0035;
const PITCH_SENSITIVITY: f32 = 0.0030;
const PITCH_LIMIT: f32 = 1.55;
const DOLLY_FACTOR: f32 = 0.9;
const MIN_DISTANCE: f32 = 0.05;

/// Orbit camera over the active cloud: a focus point plus yaw/pitch and a
/// dolly distance. The actual `Transform` chases the target with a short
/// lerp for smoothness and is only written while it still differs, so the
/// projection index is not invalidated by a camera that has come to rest.
#[derive(Resource)]
pub struct OrbitCamera {
    pub focus: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            focus: Vec3::ZERO,
            distance: 10.0,
            yaw: 0.0,
            pitch: -0.6,
        }
    }
}

impl OrbitCamera {
    /// Re-aim at a cloud's bounding box, pulled back far enough to see all
    /// of it.
    pub fn frame_bounds(&mut self, min: Vec3, max: Vec3) {
        self.focus = (min + max) * 0.5;
        self.distance = ((max - min).length() * 1.6).max(0.5);
    }

    fn target(&self) -> (Vec3, Quat) {
        let rotation = Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0);
        (self.focus + rotation * (Vec3::Z * self.distance), rotation)
    }
}

pub fn spawn_viewport_camera(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(10.0, 10.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            shadows_enabled: false,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::ZYX,
            0.0,
            1.0,
            -std::f32::consts::FRAC_PI_4,
        )),
    ));
}

pub fn camera_controller(
    mut orbit: ResMut<OrbitCamera>,
    mut camera_query: Query<&mut Transform, With<Camera3d>>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut scroll_events: EventReader<MouseWheel>,
    mut activated: EventReader<CloudActivated>,
    active: Res<ActiveCloud>,
    library: Res<CloudLibrary>,
    time: Res<Time>,
) {
    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    // Refit when a cloud becomes active or on explicit request.
    let refit = activated.read().last().is_some() || keyboard.just_pressed(KeyCode::KeyF);
    if refit {
        if let Some(entry) = active.key.as_ref().and_then(|k| library.clouds.get(k)) {
            if let Some((min, max)) = entry.points.bounds() {
                orbit.frame_bounds(min, max);
            }
        }
    }

    // Look around with the right button held.
    let mouse_delta: Vec2 = mouse_motion.read().map(|m| m.delta).sum();
    if mouse_button.pressed(MouseButton::Right) && mouse_delta != Vec2::ZERO {
        orbit.yaw -= mouse_delta.x * YAW_SENSITIVITY;
        orbit.pitch =
            (orbit.pitch - mouse_delta.y * PITCH_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    // Wheel dolly, line and pixel scrolling alike.
    let mut scroll = 0.0;
    for ev in scroll_events.read() {
        scroll += match ev.unit {
            MouseScrollUnit::Line => ev.y,
            MouseScrollUnit::Pixel => ev.y * 0.05,
        };
    }
    if scroll.abs() > f32::EPSILON {
        orbit.distance = (orbit.distance * DOLLY_FACTOR.powf(scroll)).max(MIN_DISTANCE);
    }

    // WASD pans the focus point in the view plane; E/Q move it vertically.
    let mut move_input = Vec3::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        move_input.z -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        move_input.z += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        move_input.x += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyA) {
        move_input.x -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyE) {
        move_input.y += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyQ) {
        move_input.y -= 1.0;
    }
    if move_input != Vec3::ZERO {
        let view_rot = Quat::from_euler(EulerRot::YXZ, orbit.yaw, orbit.pitch, 0.0);
        let forward = (view_rot * Vec3::Z).normalize();
        let right = (view_rot * Vec3::X).normalize();
        let mut speed = orbit.distance.clamp(1.0, 200.0);
        if keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]) {
            speed *= 3.5;
        }
        let world_delta = right * move_input.x + Vec3::Y * move_input.y + forward * move_input.z;
        orbit.focus += world_delta.normalize() * speed * time.delta_secs();
    }

    let (target_pos, target_rot) = orbit.target();
    let lerp = (12.0 * time.delta_secs()).min(1.0);
    let new_pos = camera_transform.translation.lerp(target_pos, lerp);
    let new_rot = camera_transform.rotation.slerp(target_rot, lerp);

    // Only touch the transform while it is still moving, so a resting
    // camera does not re-dirty the projection index every frame.
    if new_pos.distance_squared(camera_transform.translation) > 1e-10
        || new_rot.angle_between(camera_transform.rotation) > 1e-5
    {
        camera_transform.translation = new_pos;
        camera_transform.rotation = new_rot;
    }
}
