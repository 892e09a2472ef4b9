//! Native status overlay, frame rate display and the transient error banner.
//!
//! The banner state is shared by every target; the Bevy UI text overlay is
//! only built for native windows, web builds surface the same information
//! through RPC notifications to the host page.

pub mod fps;
pub mod overlay;

use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use constants::network::ERROR_BANNER_SECONDS;
use std::time::Duration;

/// Dismissible error message with an expiry.
#[derive(Resource, Debug)]
pub struct StatusBanner {
    message: Option<String>,
    timer: Timer,
}

impl Default for StatusBanner {
    fn default() -> Self {
        Self {
            message: None,
            timer: Timer::from_seconds(ERROR_BANNER_SECONDS, TimerMode::Once),
        }
    }
}

impl StatusBanner {
    pub fn show(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("Banner: {}", message);
        self.message = Some(message);
        self.timer.reset();
    }

    pub fn dismiss(&mut self) {
        self.message = None;
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn tick(&mut self, delta: Duration) {
        if self.message.is_some() && self.timer.tick(delta).finished() {
            self.message = None;
        }
    }
}

pub struct PlannerUiPlugin;

impl Plugin for PlannerUiPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<FrameTimeDiagnosticsPlugin>() {
            app.add_plugins(FrameTimeDiagnosticsPlugin::default());
        }
        app.init_resource::<StatusBanner>()
            .add_systems(Update, (expire_banner, fps::fps_notification_system));

        #[cfg(not(target_arch = "wasm32"))]
        {
            app.add_systems(Startup, overlay::spawn_overlay).add_systems(
                Update,
                (overlay::update_overlay, fps::fps_text_update_system),
            );
        }
    }
}

fn expire_banner(time: Res<Time>, mut banner: ResMut<StatusBanner>) {
    banner.tick(time.delta());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_expires_and_can_be_dismissed() {
        let mut banner = StatusBanner::default();
        banner.show("upload failed");
        banner.tick(Duration::from_secs_f32(ERROR_BANNER_SECONDS * 0.5));
        assert_eq!(banner.message(), Some("upload failed"));
        banner.tick(Duration::from_secs_f32(ERROR_BANNER_SECONDS));
        assert_eq!(banner.message(), None);

        banner.show("again");
        banner.dismiss();
        assert_eq!(banner.message(), None);
    }

    #[test]
    fn new_message_restarts_expiry() {
        let mut banner = StatusBanner::default();
        banner.show("first");
        banner.tick(Duration::from_secs_f32(ERROR_BANNER_SECONDS * 0.9));
        banner.show("second");
        banner.tick(Duration::from_secs_f32(ERROR_BANNER_SECONDS * 0.5));
        assert_eq!(banner.message(), Some("second"));
    }
}
