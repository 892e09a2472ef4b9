use super::mission::AssetKind;
use super::tool_manager::{CommandSource, PlannerCommand, PlannerCommandEvent};
use bevy::prelude::*;

/// Native keyboard bindings.
pub fn command_for_key(key: KeyCode) -> Option<PlannerCommand> {
    let command = match key {
        KeyCode::Digit1 => PlannerCommand::Deploy(AssetKind::Troops),
        KeyCode::Digit2 => PlannerCommand::Deploy(AssetKind::Arsenal),
        KeyCode::Digit3 => PlannerCommand::Deploy(AssetKind::Vehicles),
        KeyCode::Digit4 => PlannerCommand::Deploy(AssetKind::Tanks),
        KeyCode::KeyM => PlannerCommand::Measure,
        KeyCode::Escape => PlannerCommand::ClearTool,
        KeyCode::KeyX => PlannerCommand::ClearScene,
        KeyCode::KeyE => PlannerCommand::ExportMission,
        KeyCode::Backspace => PlannerCommand::DismissBanner,
        _ => return None,
    };
    Some(command)
}

/// System handling keyboard shortcuts (native builds only).
#[cfg(not(target_arch = "wasm32"))]
pub fn handle_keyboard_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut commands: EventWriter<PlannerCommandEvent>,
) {
    for key in keyboard.get_just_pressed() {
        if let Some(command) = command_for_key(*key) {
            commands.write(PlannerCommandEvent {
                command,
                source: CommandSource::Keyboard,
            });
        }
    }
}

/// Placeholder system for WASM builds where the host page owns the controls.
#[cfg(target_arch = "wasm32")]
pub fn handle_keyboard_shortcuts() {}

/// Import files dropped onto the window as terrain.
pub fn handle_file_drops(
    mut drops: EventReader<FileDragAndDrop>,
    mut commands: EventWriter<PlannerCommandEvent>,
) {
    for drop in drops.read() {
        if let FileDragAndDrop::DroppedFile { path_buf, .. } = drop {
            info!("File dropped: {}", path_buf.display());
            commands.write(PlannerCommandEvent {
                command: PlannerCommand::ImportTerrainFile {
                    path: path_buf.clone(),
                },
                source: CommandSource::FileDrop,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_arm_each_kind_in_order() {
        let keys = [KeyCode::Digit1, KeyCode::Digit2, KeyCode::Digit3, KeyCode::Digit4];
        for (key, kind) in keys.into_iter().zip(AssetKind::ALL) {
            assert_eq!(command_for_key(key), Some(PlannerCommand::Deploy(kind)));
        }
        assert_eq!(command_for_key(KeyCode::KeyQ), None);
    }
}
