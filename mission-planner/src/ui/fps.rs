use crate::rpc::web_rpc::WebRpcInterface;
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use constants::network::FPS_NOTIFY_SECONDS;

#[derive(Component)]
pub struct FpsText;

pub fn smoothed_fps(diagnostics: &DiagnosticsStore) -> Option<f64> {
    diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|fps| fps.smoothed())
}

pub fn fps_label(fps: Option<f64>) -> String {
    match fps {
        Some(value) => format!("FPS: {value:.1}"),
        None => "FPS: -".to_string(),
    }
}

/// Report the frame rate to the host page every `FPS_NOTIFY_SECONDS`.
pub fn fps_notification_system(
    mut rpc_interface: ResMut<WebRpcInterface>,
    diagnostics: Res<DiagnosticsStore>,
    mut last_send_time: Local<f32>,
    time: Res<Time>,
) {
    let current_time = time.elapsed_secs();
    if current_time - *last_send_time < FPS_NOTIFY_SECONDS {
        return;
    }
    if let Some(value) = smoothed_fps(&diagnostics) {
        rpc_interface.send_notification("fps_update", serde_json::json!({ "fps": value as f32 }));
        *last_send_time = current_time;
    }
}

pub fn fps_text_update_system(
    diagnostics: Res<DiagnosticsStore>,
    mut query: Query<&mut Text, With<FpsText>>,
) {
    let label = fps_label(smoothed_fps(&diagnostics));
    for mut text in &mut query {
        if text.0 != label {
            text.0 = label.clone();
        }
    }
}
