use super::config::PlannerConfig;
use crate::tools::mission::MissionPreset;
use crate::tools::tool_manager::{CommandSource, PlannerCommand, PlannerCommandEvent};
use bevy::prelude::*;

/// Tracks the mission preset requested at startup.
#[derive(Resource, Default)]
pub struct PresetLoader {
    handle: Option<Handle<MissionPreset>>,
    applied: bool,
}

pub fn start_preset_loading(
    config: Res<PlannerConfig>,
    asset_server: Res<AssetServer>,
    mut loader: ResMut<PresetLoader>,
) {
    let Some(path) = config.preset_path.as_deref() else {
        loader.applied = true;
        return;
    };
    info!("Loading mission preset from: {}", path);
    loader.handle = Some(asset_server.load(path.to_string()));
}

/// Seed the mission counts once the preset has loaded.
pub fn apply_loaded_preset(
    mut loader: ResMut<PresetLoader>,
    asset_server: Res<AssetServer>,
    presets: Res<Assets<MissionPreset>>,
    mut commands: EventWriter<PlannerCommandEvent>,
) {
    if loader.applied {
        return;
    }
    let Some(handle) = loader.handle.as_ref() else {
        return;
    };

    if let Some(preset) = presets.get(handle) {
        info!(
            "Mission preset '{}' loaded: {} assets planned",
            preset.name,
            preset.counts.total()
        );
        commands.write(PlannerCommandEvent {
            command: PlannerCommand::SetMissionCounts(preset.counts),
            source: CommandSource::Preset,
        });
        loader.applied = true;
    } else if asset_server.load_state(handle).is_failed() {
        warn!("Mission preset failed to load; counts stay at zero");
        loader.applied = true;
    }
}
