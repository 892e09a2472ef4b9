use crate::tools::tool_manager::ToolManager;
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use constants::scene::{
    CAMERA_START, MAX_ORBIT_RADIUS, MIN_ORBIT_RADIUS, ORBIT_SENSITIVITY, PAN_SENSITIVITY,
    ZOOM_SENSITIVITY,
};

const MAX_PITCH: f32 = 1.55;

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub focus_point: Vec3,
    pub radius: f32,
    /// Rotation about +Y.
    pub yaw: f32,
    /// Elevation above the ground plane, positive looks down.
    pub pitch: f32,
}

impl OrbitCamera {
    /// Orbit that places the camera at `position` looking at `focus_point`.
    pub fn looking_at(position: Vec3, focus_point: Vec3) -> Self {
        let offset = position - focus_point;
        let radius = offset.length().clamp(MIN_ORBIT_RADIUS, MAX_ORBIT_RADIUS);
        let horizontal = Vec2::new(offset.x, offset.z).length();
        Self {
            focus_point,
            radius,
            yaw: offset.x.atan2(offset.z),
            pitch: offset.y.atan2(horizontal).clamp(-MAX_PITCH, MAX_PITCH),
        }
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.yaw -= delta.x * ORBIT_SENSITIVITY;
        self.pitch = (self.pitch + delta.y * ORBIT_SENSITIVITY).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Slide the focus point across the ground; speed scales with distance.
    pub fn pan(&mut self, delta: Vec2) {
        let rotation = Quat::from_rotation_y(self.yaw);
        let right = rotation * Vec3::X;
        let forward = rotation * Vec3::NEG_Z;
        let scale = self.radius * PAN_SENSITIVITY;
        self.focus_point += (-right * delta.x + forward * delta.y) * scale;
    }

    /// Positive `scroll` moves closer.
    pub fn zoom(&mut self, scroll: f32) {
        let factor = (1.0 - scroll * ZOOM_SENSITIVITY * 0.1).max(0.1);
        self.radius = (self.radius * factor).clamp(MIN_ORBIT_RADIUS, MAX_ORBIT_RADIUS);
    }

    pub fn position(&self) -> Vec3 {
        let offset = Vec3::new(
            self.radius * self.pitch.cos() * self.yaw.sin(),
            self.radius * self.pitch.sin(),
            self.radius * self.pitch.cos() * self.yaw.cos(),
        );
        self.focus_point + offset
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.position()).looking_at(self.focus_point, Vec3::Y)
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::looking_at(CAMERA_START, Vec3::ZERO)
    }
}

pub fn orbit_camera_controller(
    mut camera_query: Query<&mut Transform, With<Camera3d>>,
    mut orbit: ResMut<OrbitCamera>,
    tools: Res<ToolManager>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut scroll_events: EventReader<MouseWheel>,
) {
    let mouse_delta: Vec2 = mouse_motion.read().map(|m| m.delta).sum();
    let scroll: f32 = scroll_events
        .read()
        .map(|ev| match ev.unit {
            MouseScrollUnit::Line => ev.y,
            MouseScrollUnit::Pixel => ev.y * 0.05,
        })
        .sum();

    // Events are still drained so a drag's motion does not replay afterwards.
    if !tools.camera_input_enabled() {
        return;
    }

    if mouse_delta != Vec2::ZERO {
        if mouse_button.pressed(MouseButton::Right) {
            orbit.orbit(mouse_delta);
        } else if mouse_button.pressed(MouseButton::Middle) {
            orbit.pan(mouse_delta);
        }
    }
    if scroll.abs() > f32::EPSILON {
        orbit.zoom(scroll);
    }

    if !orbit.is_changed() {
        return;
    }
    if let Ok(mut transform) = camera_query.single_mut() {
        *transform = orbit.transform();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_position_round_trips() {
        let orbit = OrbitCamera::default();
        assert!(orbit.position().distance(CAMERA_START) < 1e-4);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut orbit = OrbitCamera::default();
        orbit.orbit(Vec2::new(0.0, 1.0e6));
        assert_eq!(orbit.pitch, MAX_PITCH);
        orbit.orbit(Vec2::new(0.0, -1.0e7));
        assert_eq!(orbit.pitch, -MAX_PITCH);
    }

    #[test]
    fn zoom_stays_within_limits() {
        let mut orbit = OrbitCamera::default();
        for _ in 0..200 {
            orbit.zoom(5.0);
        }
        assert_eq!(orbit.radius, MIN_ORBIT_RADIUS);
        for _ in 0..200 {
            orbit.zoom(-5.0);
        }
        assert_eq!(orbit.radius, MAX_ORBIT_RADIUS);
    }

    #[test]
    fn pan_keeps_focus_on_the_ground() {
        let mut orbit = OrbitCamera::default();
        orbit.pan(Vec2::new(40.0, -25.0));
        assert_eq!(orbit.focus_point.y, 0.0);
        assert_ne!(orbit.focus_point, Vec3::ZERO);
    }
}
