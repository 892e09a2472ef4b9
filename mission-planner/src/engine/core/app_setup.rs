use bevy::asset::AssetMetaCheck;
use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;
use constants::scene::CAMERA_FOV_DEGREES;
// Engine modules
use crate::engine::camera::orbit_camera::{OrbitCamera, orbit_camera_controller};
use crate::engine::core::config::PlannerConfig;
use crate::engine::core::preset::{PresetLoader, apply_loaded_preset, start_preset_loading};
use crate::engine::core::window_config::create_window_config;
use crate::engine::scene::environment::spawn_environment;
use crate::engine::scene::markers::{setup_marker_assets, sync_asset_markers, update_deploy_preview};
use crate::engine::scene::measure_visuals::{setup_measure_visuals, update_measure_visuals};
// Planner modules
use crate::network::NetworkPlugin;
use crate::picking::projector::SurfaceProjector;
use crate::rpc::web_rpc::WebRpcPlugin;
use crate::terrain::TerrainPlugin;
use crate::tools::{
    input::{handle_file_drops, handle_keyboard_shortcuts},
    measure::{ElevationSource, MeasurementLog},
    mission::{MissionCounts, MissionPreset},
    pointer::{PointerSurface, pointer_interaction_system, update_cursor_icon},
    registry::PlacedAssetRegistry,
    tool_manager::{ExportMissionEvent, PlannerCommandEvent, ToolManager, apply_planner_commands},
};
use crate::ui::PlannerUiPlugin;

pub fn create_app() -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        // Registers mission presets as a loadable asset type.
        .add_plugins(JsonAssetPlugin::<MissionPreset>::new(&["mission.json"]))
        .add_plugins(WebRpcPlugin)
        .add_plugins(TerrainPlugin)
        .add_plugins(NetworkPlugin)
        .add_plugins(PlannerUiPlugin);

    app.init_resource::<PlannerConfig>()
        .init_resource::<PresetLoader>()
        .init_resource::<ToolManager>()
        .init_resource::<MissionCounts>()
        .init_resource::<PlacedAssetRegistry>()
        .init_resource::<MeasurementLog>()
        .init_resource::<ElevationSource>()
        .init_resource::<PointerSurface>()
        .init_resource::<OrbitCamera>()
        .init_resource::<SurfaceProjector>()
        .add_event::<PlannerCommandEvent>()
        .add_event::<ExportMissionEvent>();

    app.add_systems(
        Startup,
        (
            setup_camera,
            spawn_environment,
            setup_marker_assets,
            setup_measure_visuals,
            start_preset_loading,
        ),
    );

    app.add_systems(
        Update,
        (
            // Command sources
            (
                handle_keyboard_shortcuts, // Native shortcuts or no-op for WASM
                handle_file_drops,
                apply_loaded_preset,
            ),
            apply_planner_commands,
            // Pointer drives deployment, drag and measurement
            pointer_interaction_system,
            orbit_camera_controller,
            // Visual feedback
            (
                sync_asset_markers,
                update_deploy_preview,
                update_measure_visuals,
                update_cursor_icon,
            ),
        )
            .chain(),
    );

    app
}

fn setup_camera(mut commands: Commands, orbit: Res<OrbitCamera>) {
    commands.spawn((
        Camera3d::default(),
        Projection::from(PerspectiveProjection {
            fov: CAMERA_FOV_DEGREES.to_radians(),
            ..default()
        }),
        orbit.transform(),
        Name::new("Viewport Camera"),
    ));
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    let log_config = LogPlugin {
        level: Level::INFO,
        filter: "info,wgpu=error,naga=warn,mission_planner=debug".to_string(),
        ..default()
    };

    DefaultPlugins
        .set(window_config)
        .set(asset_config)
        .set(log_config)
}
