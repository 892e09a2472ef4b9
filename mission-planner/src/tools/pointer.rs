use super::drag::asset_under_ray;
use super::measure::{ElevationSource, MeasurementLog};
use super::mission::MissionCounts;
use super::registry::{AssetId, PlacedAssetRegistry};
use super::tool_manager::{ClickOutcome, CursorHint, ToolManager, tool_state_params};
use crate::picking::projector::{SurfaceProjector, cursor_ray};
use crate::rpc::web_rpc::WebRpcInterface;
use crate::terrain::layer::TerrainLayers;
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, SystemCursorIcon};
use bevy::winit::cursor::CursorIcon;
use constants::mission::PROFILE_SAMPLE_COUNT;

/// Raw surface point under the cursor, for the coordinate readout.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct PointerSurface(pub Option<Vec3>);

/// Project the cursor every frame and drive the active interaction with it.
pub fn pointer_interaction_system(
    mouse: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<Camera3d>>,
    projector: Res<SurfaceProjector>,
    layers: Res<TerrainLayers>,
    elevation: Res<ElevationSource>,
    mut tools: ResMut<ToolManager>,
    mut counts: ResMut<MissionCounts>,
    mut registry: ResMut<PlacedAssetRegistry>,
    mut measurements: ResMut<MeasurementLog>,
    mut pointer: ResMut<PointerSurface>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let Ok((camera, camera_transform)) = cameras.single() else {
        return;
    };

    let ray = window
        .cursor_position()
        .and_then(|cursor| cursor_ray(cursor, camera, camera_transform));
    let pickables = layers.pickables();

    pointer.set_if_neq(PointerSurface(
        ray.and_then(|ray| projector.project(ray, &pickables, 0.0)),
    ));

    let hovered = match ray {
        Some(ray) if tools.can_begin_drag() => asset_under_ray(ray, &registry),
        _ => None,
    };
    let hit = match (ray, tools.surface_offset()) {
        (Some(ray), Some(offset)) => projector.project(ray, &pickables, offset),
        _ => None,
    };
    track_pointer(&mut tools, hovered.map(|(_, id)| id), hit);

    let mode_before = tools.mode().label();

    if mouse.just_pressed(MouseButton::Left) {
        match hovered {
            Some((index, _)) if tools.can_begin_drag() => {
                tools.begin_drag(index, &registry);
            }
            _ => {
                let outcome = tools.primary_pressed(
                    hit,
                    &mut counts,
                    &mut registry,
                    elevation.0.as_ref(),
                    PROFILE_SAMPLE_COUNT,
                );
                report_click(outcome, &counts, &mut measurements, &mut rpc_interface);
            }
        }
    }

    if mouse.just_released(MouseButton::Left) {
        if let Some(end) = tools.primary_released(&counts, &mut registry) {
            info!(
                "{} {:?} moved to {:?} (index {})",
                end.kind, end.asset, end.position, end.index
            );
            if end.committed {
                rpc_interface.send_notification(
                    "asset_moved",
                    serde_json::json!({
                        "id": end.asset.0,
                        "index": end.index,
                        "kind": end.kind,
                        "position": end.position.to_array(),
                    }),
                );
            }
        }
    }

    if tools.mode().label() != mode_before {
        rpc_interface.send_notification("tool_state_changed", tool_state_params(&tools));
    }
}

/// Feed hover and pointer into the tools. The resource is only written when
/// something moved, so `is_changed` readers stay quiet on a still pointer.
pub fn track_pointer(tools: &mut ResMut<ToolManager>, hovered: Option<AssetId>, hit: Option<Vec3>) -> bool {
    let next = tools.with_pointer(hovered, hit);
    tools.set_if_neq(next)
}

fn report_click(
    outcome: ClickOutcome,
    counts: &MissionCounts,
    measurements: &mut MeasurementLog,
    rpc_interface: &mut WebRpcInterface,
) {
    match outcome {
        ClickOutcome::Ignored => {}
        ClickOutcome::Placed(placement) => {
            info!(
                "Placed {} at {:?} (index {}, {} left)",
                placement.kind, placement.position, placement.index, placement.remaining
            );
            rpc_interface.send_notification(
                "asset_placed",
                serde_json::json!({
                    "id": placement.id.0,
                    "index": placement.index,
                    "kind": placement.kind,
                    "position": placement.position.to_array(),
                }),
            );
            rpc_interface.send_notification(
                "counts_changed",
                serde_json::json!({
                    "remaining": counts.remaining_sheet(),
                    "planned": counts.planned_sheet(),
                }),
            );
        }
        ClickOutcome::MeasureStarted(point) => {
            rpc_interface.send_notification(
                "measure_started",
                serde_json::json!({ "position": point.to_array() }),
            );
        }
        ClickOutcome::MeasureCompleted(profile) => {
            info!("Measured {:.3} between {:?} and {:?}", profile.distance, profile.start, profile.end);
            match serde_json::to_value(&profile) {
                Ok(params) => rpc_interface.send_notification("measure_completed", params),
                Err(e) => warn!("Failed to serialise distance profile: {}", e),
            }
            measurements.last = Some(profile);
        }
    }
}

/// Reflect the interaction in the window's cursor shape.
pub fn update_cursor_icon(
    mut commands: Commands,
    tools: Res<ToolManager>,
    windows: Query<Entity, With<PrimaryWindow>>,
    mut last: Local<Option<CursorHint>>,
) {
    let hint = tools.cursor_hint();
    if *last == Some(hint) {
        return;
    }
    let Ok(window) = windows.single() else {
        return;
    };

    let icon = match hint {
        CursorHint::Default => SystemCursorIcon::Default,
        CursorHint::Crosshair => SystemCursorIcon::Crosshair,
        CursorHint::Pointer => SystemCursorIcon::Pointer,
        CursorHint::Grabbing => SystemCursorIcon::Grabbing,
    };
    commands.entity(window).insert(CursorIcon::from(icon));
    *last = Some(hint);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::mission::{AssetKind, CountSheet};

    #[derive(Resource, Default)]
    struct PointerInput {
        hovered: Option<AssetId>,
        hit: Option<Vec3>,
    }

    #[derive(Resource, Default)]
    struct ToolChanges(u32);

    fn feed(input: Res<PointerInput>, mut tools: ResMut<ToolManager>) {
        track_pointer(&mut tools, input.hovered, input.hit);
    }

    fn count_changes(tools: Res<ToolManager>, mut changes: ResMut<ToolChanges>) {
        if tools.is_changed() {
            changes.0 += 1;
        }
    }

    fn pointer_app(tools: ToolManager) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(tools)
            .init_resource::<PointerInput>()
            .init_resource::<ToolChanges>()
            .add_systems(Update, (feed, count_changes).chain());
        app
    }

    fn changes(app: &App) -> u32 {
        app.world().resource::<ToolChanges>().0
    }

    #[test]
    fn still_pointer_leaves_tools_unchanged() {
        let mut app = pointer_app(ToolManager::default());
        app.world_mut().resource_mut::<PointerInput>().hovered = Some(AssetId(3));
        app.update();
        assert_eq!(changes(&app), 1);
        assert_eq!(app.world().resource::<ToolManager>().hovered(), Some(AssetId(3)));

        for _ in 0..3 {
            app.update();
        }
        assert_eq!(changes(&app), 1);

        app.world_mut().resource_mut::<PointerInput>().hovered = None;
        app.update();
        app.update();
        assert_eq!(changes(&app), 2);
    }

    #[test]
    fn steady_preview_is_written_once() {
        let counts = MissionCounts::from_sheet(&CountSheet {
            vehicles: 2,
            ..default()
        });
        let mut tools = ToolManager::default();
        assert!(tools.arm_deployment(AssetKind::Vehicles, &counts));

        let mut app = pointer_app(tools);
        app.update();
        assert_eq!(changes(&app), 1);

        app.world_mut().resource_mut::<PointerInput>().hit = Some(Vec3::new(1.0, 0.1, 1.0));
        app.update();
        app.update();
        app.update();
        assert_eq!(changes(&app), 2);
    }
}
