use bevy::prelude::*;
use mission_planner::network::export::{SaveMissionRequest, SaveMissionResponse, build_request};
use mission_planner::network::{MissionBackend, NetworkError, resolve_content_url};
use mission_planner::picking::projector::SurfaceProjector;
use mission_planner::terrain::layer::{LayerId, TerrainLayers};
use mission_planner::tools::drag::asset_under_ray;
use mission_planner::tools::measure::{MeasurementLog, PlaceholderElevationModel};
use mission_planner::tools::mission::{AssetKind, CountSheet, MissionCounts};
use mission_planner::tools::registry::PlacedAssetRegistry;
use mission_planner::tools::tool_manager::{
    ClickOutcome, CommandEffect, InteractionMode, PlannerCommand, PlannerSession, ToolManager,
};
use proptest::prelude::*;
use std::sync::Mutex;

/// A raised square at y = 2 plus a lone vertex at the origin, so the
/// re-centred, half-scale terrain sits at y = 0.5 over x, z in [-2, 2].
const TERRAIN_OBJ: &str = "\
# test terrain
v -4 2 -4
v 4 2 -4
v 4 2 4
v -4 2 4
v 0 0 0
f 1 2 3 4
";

#[derive(Default)]
struct StubBackend {
    uploads: Mutex<Vec<String>>,
    saved: Mutex<Vec<SaveMissionRequest>>,
}

impl MissionBackend for StubBackend {
    fn upload_terrain(&self, file_name: &str, bytes: &[u8]) -> Result<String, NetworkError> {
        assert!(!bytes.is_empty());
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push(file_name.to_string());
        }
        Ok(format!("/uploads/abc123_{}", file_name))
    }

    fn save_mission(&self, request: &SaveMissionRequest) -> Result<SaveMissionResponse, NetworkError> {
        if let Ok(mut saved) = self.saved.lock() {
            saved.push(request.clone());
        }
        Ok(SaveMissionResponse {
            success: true,
            filename: Some(request.filename.clone()),
            path: Some("missions/test".to_string()),
            ..Default::default()
        })
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        Err(NetworkError::Status {
            status: 404,
            message: url.to_string(),
        })
    }

    fn origin(&self) -> &str {
        "http://localhost:5000"
    }
}

#[derive(Default)]
struct Mission {
    tools: ToolManager,
    counts: MissionCounts,
    registry: PlacedAssetRegistry,
    layers: TerrainLayers,
    measurements: MeasurementLog,
    projector: SurfaceProjector,
}

impl Mission {
    fn apply(&mut self, command: PlannerCommand) -> Vec<CommandEffect> {
        PlannerSession {
            tools: &mut self.tools,
            counts: &mut self.counts,
            registry: &mut self.registry,
            layers: &mut self.layers,
            measurements: &mut self.measurements,
        }
        .apply(command)
    }

    /// Cast straight down at `(x, z)` with the active mode's offset.
    fn pointer_at(&mut self, x: f32, z: f32) -> Option<Vec3> {
        let ray = Ray3d::new(Vec3::new(x, 10.0, z), Dir3::NEG_Y);
        let offset = self.tools.surface_offset()?;
        let hit = self.projector.project(ray, &self.layers.pickables(), offset);
        self.tools.pointer_moved(hit);
        hit
    }

    fn click(&mut self, hit: Option<Vec3>) -> ClickOutcome {
        self.tools.primary_pressed(
            hit,
            &mut self.counts,
            &mut self.registry,
            &PlaceholderElevationModel,
            20,
        )
    }
}

fn notified(effects: &[CommandEffect], method: &str) -> bool {
    effects
        .iter()
        .any(|effect| matches!(effect, CommandEffect::Notify { method: m, .. } if *m == method))
}

fn close(a: Vec3, b: Vec3) -> bool {
    a.distance(b) < 1e-4
}

#[test]
fn import_upload_deploy_and_drag() {
    let backend = StubBackend::default();
    let mut mission = Mission::default();

    mission.apply(PlannerCommand::SetMissionCounts(CountSheet {
        tanks: 1,
        ..default()
    }));

    // Import: the layer exists but is inert until its upload resolves.
    let effects = mission.apply(PlannerCommand::ImportTerrainBytes {
        file_name: "t.obj".to_string(),
        bytes: TERRAIN_OBJ.as_bytes().to_vec(),
    });
    assert!(notified(&effects, "layer_imported"));
    assert!(mission.layers.pickables().is_empty());

    let pending: Vec<_> = mission
        .layers
        .pending_uploads()
        .map(|layer| (layer.id, layer.source.clone()))
        .collect();
    assert_eq!(pending.len(), 1);
    let (id, source) = pending[0].clone();
    assert_eq!(id, LayerId(0));
    mission.layers.mark_in_flight(id);
    assert_eq!(mission.layers.pending_uploads().count(), 0);

    // Upload resolves a content URL and makes the layer pickable.
    let file_url = backend
        .upload_terrain(&source.file_name, &source.bytes)
        .unwrap();
    let url = resolve_content_url(backend.origin(), &file_url);
    assert_eq!(url, "http://localhost:5000/uploads/abc123_t.obj");
    let effects = mission.apply(PlannerCommand::ResolveLayer { id, file_url: url });
    assert!(notified(&effects, "layer_resolved"));
    assert_eq!(mission.layers.pickables().len(), 1);

    // Deploy one tank onto the raised terrain.
    mission.apply(PlannerCommand::Deploy(AssetKind::Tanks));
    assert!(matches!(mission.tools.mode(), InteractionMode::Deploying(_)));
    let hit = mission.pointer_at(1.0, 1.0);
    assert!(close(hit.unwrap(), Vec3::new(1.0, 0.6, 1.0)));

    let ClickOutcome::Placed(placement) = mission.click(hit) else {
        panic!("tank was not placed");
    };
    assert_eq!(placement.index, 0);
    assert_eq!(placement.remaining, 0);
    assert_eq!(mission.counts.remaining(AssetKind::Tanks), 0);
    assert_eq!(*mission.tools.mode(), InteractionMode::Idle);

    // Drag it across the terrain, then off-surface before releasing.
    let grab = Ray3d::new(Vec3::new(1.0, 10.0, 1.0), Dir3::NEG_Y);
    let (index, asset) = asset_under_ray(grab, &mission.registry).unwrap();
    assert_eq!(index, 0);
    assert!(mission.tools.begin_drag(index, &mission.registry));
    assert!(!mission.tools.camera_input_enabled());

    mission.pointer_at(-1.5, -1.5);
    assert_eq!(mission.pointer_at(500.0, 500.0), None);

    let end = mission
        .tools
        .primary_released(&mission.counts, &mut mission.registry)
        .unwrap();
    assert!(end.committed);
    assert_eq!(end.asset, asset);
    assert!(mission.tools.camera_input_enabled());

    assert_eq!(mission.registry.len(), 1);
    let moved = mission.registry.get(0).unwrap();
    assert_eq!(moved.id, asset);
    assert!(close(moved.position, Vec3::new(-1.5, 0.6, -1.5)));

    // Export goes through the same backend.
    let request = build_request(
        chrono::Utc::now(),
        &mission.registry,
        &mission.counts,
        &mission.layers,
        None,
    );
    assert!(request.content.contains("o tanks_1"));
    assert_eq!(request.mission_info.terrain_source.as_deref(), Some("t.obj"));
    let response = backend.save_mission(&request).unwrap();
    assert_eq!(response.filename, Some(request.filename.clone()));
    assert_eq!(backend.uploads.lock().unwrap().as_slice(), ["t.obj"]);
    assert_eq!(backend.saved.lock().unwrap().len(), 1);
}

#[test]
fn drag_resumes_suspended_deployment() {
    let mut mission = Mission::default();
    mission.apply(PlannerCommand::SetMissionCounts(CountSheet {
        arsenal: 3,
        ..default()
    }));
    mission.apply(PlannerCommand::Deploy(AssetKind::Arsenal));
    let hit = mission.pointer_at(0.0, 0.0);
    mission.click(hit);
    assert_eq!(mission.counts.remaining(AssetKind::Arsenal), 2);

    assert!(mission.tools.begin_drag(0, &mission.registry));
    mission.pointer_at(3.0, 3.0);
    mission
        .tools
        .primary_released(&mission.counts, &mut mission.registry);

    match mission.tools.mode() {
        InteractionMode::Deploying(state) => assert_eq!(state.kind(), AssetKind::Arsenal),
        other => panic!("expected deployment to resume, got {other:?}"),
    }
    assert!(close(
        mission.registry.get(0).unwrap().position,
        Vec3::new(3.0, 0.05, 3.0)
    ));
    assert_eq!(mission.counts.remaining(AssetKind::Arsenal), 2);
}

#[test]
fn cleared_scene_stays_empty() {
    let mut mission = Mission::default();
    mission.apply(PlannerCommand::SetMissionCounts(CountSheet {
        troops: 2,
        ..default()
    }));
    mission.apply(PlannerCommand::Deploy(AssetKind::Troops));
    let hit = mission.pointer_at(0.5, 0.5);
    mission.click(hit);
    assert_eq!(mission.registry.len(), 1);

    let effects = mission.apply(PlannerCommand::ClearScene);
    assert!(notified(&effects, "scene_cleared"));
    assert!(mission.registry.is_empty());
    assert_eq!(mission.counts.remaining(AssetKind::Troops), 0);
    assert_eq!(mission.counts.planned(AssetKind::Troops), 0);

    // Later pointer activity cannot bring anything back.
    assert_eq!(mission.pointer_at(0.5, 0.5), None);
    assert_eq!(mission.click(Some(Vec3::ONE)), ClickOutcome::Ignored);
    assert!(
        mission
            .tools
            .primary_released(&mission.counts, &mut mission.registry)
            .is_none()
    );
    assert!(mission.registry.is_empty());
}

#[test]
fn measuring_reports_distance_and_placeholder_profile() {
    let mut mission = Mission::default();
    mission.apply(PlannerCommand::Measure);

    assert_eq!(
        mission.click(Some(Vec3::new(0.0, 1.0, 0.0))),
        ClickOutcome::MeasureStarted(Vec3::new(0.0, 1.0, 0.0))
    );
    let ClickOutcome::MeasureCompleted(profile) = mission.click(Some(Vec3::new(3.0, 3.0, 4.0)))
    else {
        panic!("measurement did not complete");
    };
    assert!((profile.distance - (9.0f32 + 4.0 + 16.0).sqrt()).abs() < 1e-5);
    assert!(profile.samples.iter().all(|s| s.elevation == 3.0));
    assert_eq!(*mission.tools.mode(), InteractionMode::Idle);
}

proptest! {
    #[test]
    fn placements_never_exceed_counts(count in 0u32..12, clicks in 0usize..20, x in -40.0f32..40.0, z in -40.0f32..40.0) {
        let mut mission = Mission::default();
        mission.apply(PlannerCommand::SetMissionCounts(CountSheet { vehicles: count, ..default() }));
        mission.apply(PlannerCommand::Deploy(AssetKind::Vehicles));

        for _ in 0..clicks {
            let hit = mission.pointer_at(x, z);
            mission.click(hit);
        }

        let placed = clicks.min(count as usize);
        prop_assert_eq!(mission.registry.len(), placed);
        prop_assert_eq!(mission.counts.remaining(AssetKind::Vehicles) as usize, count as usize - placed);
        prop_assert_eq!(mission.counts.planned(AssetKind::Vehicles), count);
        if placed == count as usize {
            prop_assert_eq!(mission.tools.mode(), &InteractionMode::Idle);
        }
    }

    #[test]
    fn replace_at_only_touches_valid_indices(len in 0usize..8, index in 0usize..16) {
        let mut registry = PlacedAssetRegistry::default();
        for i in 0..len {
            registry.append(AssetKind::Troops, Vec3::splat(i as f32));
        }
        let replaced = registry.replace_at(index, AssetKind::Tanks, Vec3::NEG_ONE);

        prop_assert_eq!(replaced, index < len);
        prop_assert_eq!(registry.len(), len);
        for (i, asset) in registry.iter().enumerate() {
            if i == index {
                prop_assert_eq!(asset.kind, AssetKind::Tanks);
            } else {
                prop_assert_eq!(asset.position, Vec3::splat(i as f32));
            }
        }
    }
}
