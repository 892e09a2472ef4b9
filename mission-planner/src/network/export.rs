use super::{BackendHandle, NetworkError, WorkerChannel};
use crate::rpc::web_rpc::WebRpcInterface;
use crate::terrain::layer::TerrainLayers;
use crate::tools::measure::{DistanceProfile, MeasurementLog};
use crate::tools::mission::{AssetKind, CountSheet, MissionCounts};
use crate::tools::registry::{PlacedAsset, PlacedAssetRegistry};
use crate::tools::tool_manager::ExportMissionEvent;
use crate::ui::StatusBanner;
use bevy::prelude::*;
use chrono::{DateTime, SecondsFormat, Utc};
use constants::mission::{EXPORT_PRISM_SIDES, SolidShape};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::Write;
use std::thread;

/// Body of `POST /save-mission`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SaveMissionRequest {
    pub filename: String,
    pub content: String,
    #[serde(rename = "missionInfo")]
    pub mission_info: MissionInfo,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MissionInfo {
    /// Placed assets by kind.
    pub asset_counts: CountSheet,
    pub mission_counts: CountSheet,
    pub remaining_counts: CountSheet,
    pub total_assets: usize,
    pub terrain_source: Option<String>,
    pub generated_at: String,
    pub measurement: Option<MeasurementInfo>,
    pub assets: Vec<AssetInfo>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MeasurementInfo {
    pub points: [[f32; 3]; 2],
    pub distance: f32,
}

impl From<&DistanceProfile> for MeasurementInfo {
    fn from(profile: &DistanceProfile) -> Self {
        Self {
            points: [profile.start.to_array(), profile.end.to_array()],
            distance: profile.distance,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AssetInfo {
    pub kind: AssetKind,
    pub position: [f32; 3],
}

/// Save endpoint reply. Older servers name the folder `mission_folder`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SaveMissionResponse {
    #[serde(default)]
    pub success: bool,
    pub filename: Option<String>,
    #[serde(alias = "mission_folder")]
    pub path: Option<String>,
    pub metadata_file: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl SaveMissionResponse {
    pub fn into_result(self) -> Result<Self, NetworkError> {
        if self.success {
            return Ok(self);
        }
        Err(NetworkError::Rejected(
            self.error
                .clone()
                .unwrap_or_else(|| "save rejected".to_string()),
        ))
    }
}

pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("mission_{}.obj", now.format("%Y%m%d_%H%M%S"))
}

/// Assemble the save request for the current session.
pub fn build_request(
    now: DateTime<Utc>,
    registry: &PlacedAssetRegistry,
    counts: &MissionCounts,
    layers: &TerrainLayers,
    measurement: Option<&DistanceProfile>,
) -> SaveMissionRequest {
    let generated_at = now.to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut placed = CountSheet::default();
    for kind in AssetKind::ALL {
        placed.set(kind, registry.count_of(kind) as u32);
    }

    SaveMissionRequest {
        filename: export_file_name(now),
        content: build_obj(registry, &generated_at),
        mission_info: MissionInfo {
            asset_counts: placed,
            mission_counts: counts.planned_sheet(),
            remaining_counts: counts.remaining_sheet(),
            total_assets: registry.len(),
            terrain_source: layers.iter().next().map(|layer| layer.source.file_name.clone()),
            generated_at,
            measurement: measurement.map(MeasurementInfo::from),
            assets: registry
                .iter()
                .map(|asset| AssetInfo {
                    kind: asset.kind,
                    position: asset.position.to_array(),
                })
                .collect(),
        },
    }
}

/// Wavefront OBJ of every placed asset as a simple solid centred on its position.
pub fn build_obj(registry: &PlacedAssetRegistry, generated_at: &str) -> String {
    let mut obj = String::new();
    let _ = writeln!(obj, "# Mission export");
    let _ = writeln!(obj, "# Generated: {}", generated_at);
    let _ = writeln!(obj, "# Assets: {}", registry.len());

    let mut per_kind = [0usize; 4];
    // OBJ indices are global and 1-based.
    let mut next_vertex = 1;

    for asset in registry.iter() {
        per_kind[asset.kind.index()] += 1;
        let _ = writeln!(obj);
        let _ = writeln!(obj, "o {}_{}", asset.kind, per_kind[asset.kind.index()]);

        let (vertices, faces) = solid(asset);
        for v in &vertices {
            let _ = writeln!(obj, "v {:.6} {:.6} {:.6}", v.x, v.y, v.z);
        }
        for face in &faces {
            let indices: Vec<String> = face
                .iter()
                .map(|i| (i + next_vertex).to_string())
                .collect();
            let _ = writeln!(obj, "f {}", indices.join(" "));
        }
        next_vertex += vertices.len();
    }
    obj
}

/// Vertices and local 0-based faces of an asset's export solid.
fn solid(asset: &PlacedAsset) -> (Vec<Vec3>, Vec<Vec<usize>>) {
    match asset.kind.marker().export {
        SolidShape::Cuboid { size } => cuboid(asset.position, size),
        SolidShape::Cylinder { radius, height } => prism(asset.position, radius, height),
    }
}

fn cuboid(center: Vec3, size: Vec3) -> (Vec<Vec3>, Vec<Vec<usize>>) {
    let h = size * 0.5;
    let corners = [
        Vec3::new(-h.x, -h.y, -h.z),
        Vec3::new(h.x, -h.y, -h.z),
        Vec3::new(h.x, -h.y, h.z),
        Vec3::new(-h.x, -h.y, h.z),
        Vec3::new(-h.x, h.y, -h.z),
        Vec3::new(h.x, h.y, -h.z),
        Vec3::new(h.x, h.y, h.z),
        Vec3::new(-h.x, h.y, h.z),
    ];
    let faces = vec![
        vec![0, 1, 2, 3],
        vec![4, 7, 6, 5],
        vec![0, 4, 5, 1],
        vec![3, 2, 6, 7],
        vec![0, 3, 7, 4],
        vec![1, 5, 6, 2],
    ];
    (corners.iter().map(|c| center + *c).collect(), faces)
}

fn prism(center: Vec3, radius: f32, height: f32) -> (Vec<Vec3>, Vec<Vec<usize>>) {
    let sides = EXPORT_PRISM_SIDES;
    let half = height * 0.5;
    let ring = |y: f32| {
        (0..sides).map(move |i| {
            let angle = i as f32 / sides as f32 * std::f32::consts::TAU;
            center + Vec3::new(radius * angle.cos(), y, radius * angle.sin())
        })
    };
    let vertices: Vec<Vec3> = ring(-half).chain(ring(half)).collect();

    let mut faces = Vec::with_capacity(sides + 2);
    for i in 0..sides {
        let j = (i + 1) % sides;
        faces.push(vec![i, sides + i, sides + j, j]);
    }
    faces.push((0..sides).collect());
    faces.push((sides..2 * sides).rev().collect());
    (vertices, faces)
}

#[derive(Debug)]
pub struct ExportResult {
    pub filename: String,
    pub outcome: Result<SaveMissionResponse, String>,
}

pub type ExportChannel = WorkerChannel<ExportResult>;

/// Serialise the mission and hand it to the backend (or the host page).
pub fn export_mission_system(
    mut events: EventReader<ExportMissionEvent>,
    backend: Option<Res<BackendHandle>>,
    channel: Res<ExportChannel>,
    registry: Res<PlacedAssetRegistry>,
    counts: Res<MissionCounts>,
    layers: Res<TerrainLayers>,
    measurements: Res<MeasurementLog>,
    mut banner: ResMut<StatusBanner>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    // Repeated requests in one frame export once.
    if events.read().count() == 0 {
        return;
    }

    if registry.is_empty() {
        banner.show("Nothing to export: no assets placed");
        return;
    }

    let request = build_request(
        Utc::now(),
        &registry,
        &counts,
        &layers,
        measurements.last.as_ref(),
    );
    info!(
        "Exporting {} assets as {}",
        request.mission_info.total_assets, request.filename
    );

    let Some(backend) = backend.as_ref() else {
        rpc_interface.send_notification("export_ready", json!(request));
        return;
    };

    let backend = backend.0.clone();
    let tx = channel.sender();
    let filename = request.filename.clone();
    let spawned = thread::Builder::new()
        .name("mission-export".to_string())
        .spawn(move || {
            let outcome = backend
                .save_mission(&request)
                .map_err(|err| err.to_string());
            let _ = tx.send(ExportResult {
                filename: request.filename,
                outcome,
            });
        });

    if let Err(err) = spawned {
        error!("Failed to start export worker: {}", err);
        banner.show(format!("Export of {} failed: {}", filename, err));
    }
}

pub fn collect_export_results(
    channel: Res<ExportChannel>,
    mut banner: ResMut<StatusBanner>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for result in channel.drain() {
        match result.outcome {
            Ok(response) => {
                info!(
                    "Mission saved: {}",
                    response.message.as_deref().unwrap_or(&result.filename)
                );
                rpc_interface.send_notification(
                    "mission_exported",
                    json!({
                        "filename": response.filename.unwrap_or(result.filename),
                        "path": response.path,
                        "metadata_file": response.metadata_file,
                        "message": response.message,
                    }),
                );
            }
            Err(error) => {
                warn!("Mission export failed: {}", error);
                rpc_interface.send_notification(
                    "export_failed",
                    json!({ "filename": result.filename, "error": error }),
                );
                banner.show(format!("Export failed: {}", error));
            }
        }
    }
}
