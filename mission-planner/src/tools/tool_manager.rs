use super::deployment::{DeployState, Placement};
use super::drag::{DragState, MarkerTier};
use super::measure::{DistanceProfile, ElevationModel, MeasureState, MeasureStep, MeasurementLog};
use super::mission::{AssetKind, CountSheet, MissionCounts};
use super::registry::{AssetId, PlacedAssetRegistry};
use crate::rpc::web_rpc::WebRpcInterface;
use crate::terrain::error::{ImportError, LayerError};
use crate::terrain::layer::{LayerId, TerrainLayers};
use crate::ui::StatusBanner;
use bevy::prelude::*;
use serde_json::{Value, json};
use std::path::PathBuf;

/// The single active interaction. Only one can exist at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InteractionMode {
    #[default]
    Idle,
    Deploying(DeployState),
    Dragging(DragState),
    Measuring(MeasureState),
}

impl InteractionMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Deploying(_) => "deploying",
            Self::Dragging(_) => "dragging",
            Self::Measuring(_) => "measuring",
        }
    }
}

/// Result of a primary click on the viewport.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    Ignored,
    Placed(Placement),
    MeasureStarted(Vec3),
    MeasureCompleted(DistanceProfile),
}

/// A finished drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragEnd {
    pub asset: AssetId,
    pub index: usize,
    pub kind: AssetKind,
    pub position: Vec3,
    pub committed: bool,
}

/// Cursor shape the viewport should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    Default,
    Crosshair,
    Pointer,
    Grabbing,
}

/// Owner of the interaction mode and the hover highlight.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct ToolManager {
    mode: InteractionMode,
    hovered: Option<AssetId>,
}

impl ToolManager {
    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    /// Enter deployment for `kind`. Refused while dragging or when none are left.
    pub fn arm_deployment(&mut self, kind: AssetKind, counts: &MissionCounts) -> bool {
        if matches!(self.mode, InteractionMode::Dragging(_)) {
            return false;
        }
        let Some(state) = DeployState::arm(kind, counts) else {
            warn!("Cannot deploy {}: none remaining", kind);
            return false;
        };
        info!("Deployment armed: {}", kind);
        self.mode = InteractionMode::Deploying(state);
        true
    }

    /// Start a fresh measurement with no captured points.
    pub fn activate_measure(&mut self) -> bool {
        if matches!(self.mode, InteractionMode::Dragging(_)) {
            return false;
        }
        info!("Measure tool activated");
        self.mode = InteractionMode::Measuring(MeasureState::default());
        true
    }

    /// Leave deployment or measurement. A drag in progress keeps going but
    /// will not resume deployment afterwards.
    pub fn clear_tool(&mut self) -> bool {
        if let InteractionMode::Dragging(drag) = &mut self.mode {
            return drag.resume.take().is_some();
        }
        if self.mode == InteractionMode::Idle {
            return false;
        }
        info!("Tool cleared ({})", self.mode.label());
        self.mode = InteractionMode::Idle;
        true
    }

    /// Vertical offset to project the pointer with, if the mode consumes surface points.
    pub fn surface_offset(&self) -> Option<f32> {
        match &self.mode {
            InteractionMode::Idle => None,
            InteractionMode::Deploying(state) => Some(state.kind().surface_offset()),
            InteractionMode::Dragging(drag) => Some(drag.kind.surface_offset()),
            InteractionMode::Measuring(_) => Some(0.0),
        }
    }

    /// Feed a projected pointer position (already offset).
    pub fn pointer_moved(&mut self, hit: Option<Vec3>) {
        match &mut self.mode {
            InteractionMode::Deploying(state) => *state = state.pointer_moved(hit),
            InteractionMode::Dragging(drag) => drag.pointer_moved(hit),
            InteractionMode::Idle | InteractionMode::Measuring(_) => {}
        }
    }

    pub fn can_begin_drag(&self) -> bool {
        matches!(
            self.mode,
            InteractionMode::Idle | InteractionMode::Deploying(_)
        )
    }

    /// Pick up the asset at `index`, suspending any deployment.
    pub fn begin_drag(&mut self, index: usize, registry: &PlacedAssetRegistry) -> bool {
        if !self.can_begin_drag() {
            return false;
        }
        let Some(asset) = registry.get(index) else {
            return false;
        };
        let resume = match &self.mode {
            InteractionMode::Deploying(state) => Some(state.kind()),
            _ => None,
        };
        debug!("Drag started on {} {:?} at index {}", asset.kind, asset.id, index);
        self.mode = InteractionMode::Dragging(DragState {
            asset: asset.id,
            index,
            kind: asset.kind,
            position: asset.position,
            resume,
        });
        true
    }

    /// Primary button press with the pointer projected at `hit`.
    pub fn primary_pressed(
        &mut self,
        hit: Option<Vec3>,
        counts: &mut MissionCounts,
        registry: &mut PlacedAssetRegistry,
        model: &dyn ElevationModel,
        sample_count: usize,
    ) -> ClickOutcome {
        match &mut self.mode {
            InteractionMode::Deploying(state) => {
                // Confirm with the latest preview, the pointer must still be on a surface.
                let current = state.pointer_moved(hit);
                let (next, placement) = current.confirm(counts, registry);
                self.mode = match next {
                    Some(state) => InteractionMode::Deploying(state),
                    None => {
                        info!("All {} deployed, leaving deployment", current.kind());
                        InteractionMode::Idle
                    }
                };
                placement.map_or(ClickOutcome::Ignored, ClickOutcome::Placed)
            }
            InteractionMode::Measuring(state) => {
                let Some(point) = hit else {
                    return ClickOutcome::Ignored;
                };
                match state.click(point, sample_count, model) {
                    MeasureStep::Started(point) => ClickOutcome::MeasureStarted(point),
                    MeasureStep::Completed(profile) => {
                        self.mode = InteractionMode::Idle;
                        ClickOutcome::MeasureCompleted(profile)
                    }
                }
            }
            InteractionMode::Idle | InteractionMode::Dragging(_) => ClickOutcome::Ignored,
        }
    }

    /// Primary button release: commits a drag and resumes deployment if it was suspended.
    pub fn primary_released(
        &mut self,
        counts: &MissionCounts,
        registry: &mut PlacedAssetRegistry,
    ) -> Option<DragEnd> {
        let InteractionMode::Dragging(drag) = self.mode else {
            return None;
        };
        let committed = drag.commit(registry);

        self.mode = drag
            .resume
            .and_then(|kind| DeployState::arm(kind, counts))
            .map_or(InteractionMode::Idle, InteractionMode::Deploying);

        Some(DragEnd {
            asset: drag.asset,
            index: drag.index,
            kind: drag.kind,
            position: drag.position,
            committed,
        })
    }

    /// Exit deployment when the armed kind has run out.
    pub fn on_counts_changed(&mut self, counts: &MissionCounts) {
        match &mut self.mode {
            InteractionMode::Deploying(state) if counts.remaining(state.kind()) == 0 => {
                info!("{} exhausted, leaving deployment", state.kind());
                self.mode = InteractionMode::Idle;
            }
            InteractionMode::Dragging(drag) => {
                if drag.resume.is_some_and(|kind| counts.remaining(kind) == 0) {
                    drag.resume = None;
                }
            }
            _ => {}
        }
    }

    pub fn reset(&mut self) {
        self.mode = InteractionMode::Idle;
        self.hovered = None;
    }

    /// Camera orbit, pan and zoom are suspended for the whole scene during a drag.
    pub fn camera_input_enabled(&self) -> bool {
        !matches!(self.mode, InteractionMode::Dragging(_))
    }

    pub fn set_hovered(&mut self, hovered: Option<AssetId>) {
        self.hovered = hovered;
    }

    pub fn hovered(&self) -> Option<AssetId> {
        self.hovered
    }

    /// This manager after a pointer update, for writing back with `set_if_neq`.
    pub fn with_pointer(&self, hovered: Option<AssetId>, hit: Option<Vec3>) -> Self {
        let mut next = self.clone();
        next.set_hovered(hovered);
        next.pointer_moved(hit);
        next
    }

    pub fn dragging(&self) -> Option<&DragState> {
        match &self.mode {
            InteractionMode::Dragging(drag) => Some(drag),
            _ => None,
        }
    }

    /// Hover only highlights where a press would pick the asset up.
    pub fn tier_for(&self, id: AssetId) -> MarkerTier {
        match &self.mode {
            InteractionMode::Dragging(drag) if drag.asset == id => MarkerTier::Dragging,
            InteractionMode::Idle | InteractionMode::Deploying(_) if self.hovered == Some(id) => {
                MarkerTier::Hovered
            }
            _ => MarkerTier::Normal,
        }
    }

    pub fn cursor_hint(&self) -> CursorHint {
        match (&self.mode, self.hovered) {
            (InteractionMode::Dragging(_), _) => CursorHint::Grabbing,
            (InteractionMode::Measuring(_), _) => CursorHint::Crosshair,
            (InteractionMode::Idle | InteractionMode::Deploying(_), Some(_)) => CursorHint::Pointer,
            (InteractionMode::Deploying(_), None) => CursorHint::Crosshair,
            (InteractionMode::Idle, None) => CursorHint::Default,
        }
    }
}

/// Where a command came from, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    Rpc,
    Keyboard,
    FileDrop,
    Network,
    Preset,
}

/// Commands accepted by the planning session.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerCommand {
    Deploy(AssetKind),
    Measure,
    ClearTool,
    SetMissionCounts(CountSheet),
    ClearScene,
    ImportTerrainFile { path: PathBuf },
    ImportTerrainBytes { file_name: String, bytes: Vec<u8> },
    SetLayerVisibility { id: LayerId, visible: bool },
    RemoveLayer(LayerId),
    ResolveLayer { id: LayerId, file_url: String },
    FailLayer { id: LayerId, error: String },
    SetLayerTiles { id: LayerId, base_url: String },
    MoveAsset { index: usize, kind: AssetKind, position: Vec3 },
    ExportMission,
    DismissBanner,
}

#[derive(Event, Debug, Clone)]
pub struct PlannerCommandEvent {
    pub command: PlannerCommand,
    pub source: CommandSource,
}

/// Asks the network layer to export the current mission.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct ExportMissionEvent;

/// Side effects of applying a command that reach outside the session state.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandEffect {
    Notify { method: &'static str, params: Value },
    Banner(String),
    DismissBanner,
    Export,
}

impl CommandEffect {
    fn notify(method: &'static str, params: Value) -> Self {
        Self::Notify { method, params }
    }
}

/// Mutable view over the session state that commands operate on.
pub struct PlannerSession<'a> {
    pub tools: &'a mut ToolManager,
    pub counts: &'a mut MissionCounts,
    pub registry: &'a mut PlacedAssetRegistry,
    pub layers: &'a mut TerrainLayers,
    pub measurements: &'a mut MeasurementLog,
}

impl PlannerSession<'_> {
    pub fn apply(&mut self, command: PlannerCommand) -> Vec<CommandEffect> {
        let mut effects = Vec::new();
        match command {
            PlannerCommand::Deploy(kind) => {
                if self.tools.arm_deployment(kind, self.counts) {
                    effects.push(self.tool_state());
                }
            }
            PlannerCommand::Measure => {
                if self.tools.activate_measure() {
                    effects.push(self.tool_state());
                }
            }
            PlannerCommand::ClearTool => {
                if self.tools.clear_tool() {
                    effects.push(self.tool_state());
                }
            }
            PlannerCommand::SetMissionCounts(sheet) => {
                info!("Mission counts set: {} assets planned", sheet.total());
                self.counts.set(&sheet);
                let before = self.tools.mode().label();
                self.tools.on_counts_changed(self.counts);
                effects.push(self.counts_changed());
                if self.tools.mode().label() != before {
                    effects.push(self.tool_state());
                }
            }
            PlannerCommand::ClearScene => {
                self.registry.clear();
                self.counts.clear();
                self.layers.clear();
                self.measurements.last = None;
                self.tools.reset();
                info!("Scene cleared");
                effects.push(CommandEffect::notify("scene_cleared", json!({})));
                effects.push(self.counts_changed());
                effects.push(self.tool_state());
            }
            PlannerCommand::ImportTerrainFile { path } => {
                let result = self.layers.import_path(&path);
                effects.push(self.imported(result));
            }
            PlannerCommand::ImportTerrainBytes { file_name, bytes } => {
                let result = self.layers.import(&file_name, bytes);
                effects.push(self.imported(result));
            }
            PlannerCommand::SetLayerVisibility { id, visible } => {
                if let Err(err) = self.layers.set_visible(id, visible) {
                    warn!("{}", err);
                }
            }
            PlannerCommand::RemoveLayer(id) => match self.layers.remove(id) {
                Ok(layer) => {
                    info!("Removed terrain layer {} '{}'", id, layer.name);
                    effects.push(CommandEffect::notify("layer_removed", json!({ "id": id.0 })));
                }
                Err(err) => warn!("{}", err),
            },
            PlannerCommand::ResolveLayer { id, file_url } => {
                match self.layers.resolve(id, file_url.clone()) {
                    Ok(()) => effects.push(CommandEffect::notify(
                        "layer_resolved",
                        json!({ "id": id.0, "url": file_url }),
                    )),
                    // The layer was removed or cleared while its upload ran.
                    Err(LayerError::UnknownLayer(_)) => {
                        debug!("Dropping upload result for removed terrain layer {}", id);
                    }
                    Err(err) => {
                        warn!("{}", err);
                        effects.push(CommandEffect::Banner(err.to_string()));
                    }
                }
            }
            PlannerCommand::FailLayer { id, .. } if self.layers.get(id).is_none() => {
                debug!("Dropping upload failure for removed terrain layer {}", id);
            }
            PlannerCommand::FailLayer { id, error } => {
                self.layers.mark_upload_failed(id, &error);
                effects.push(CommandEffect::notify(
                    "upload_failed",
                    json!({ "id": id.0, "error": error }),
                ));
                effects.push(CommandEffect::Banner(format!("Upload failed: {}", error)));
            }
            PlannerCommand::SetLayerTiles { id, base_url } => {
                if let Err(err) = self.layers.set_tile_base_url(id, base_url) {
                    warn!("{}", err);
                }
            }
            PlannerCommand::MoveAsset {
                index,
                kind,
                position,
            } => {
                if self.registry.replace_at(index, kind, position) {
                    effects.push(CommandEffect::notify(
                        "asset_moved",
                        json!({ "index": index, "kind": kind, "position": position.to_array() }),
                    ));
                }
            }
            PlannerCommand::ExportMission => effects.push(CommandEffect::Export),
            PlannerCommand::DismissBanner => effects.push(CommandEffect::DismissBanner),
        }
        effects
    }

    fn imported(&self, result: Result<LayerId, ImportError>) -> CommandEffect {
        match result {
            Ok(id) => {
                let (name, kind) = self
                    .layers
                    .get(id)
                    .map(|layer| (layer.name.clone(), layer.kind))
                    .unzip();
                CommandEffect::notify(
                    "layer_imported",
                    json!({ "id": id.0, "name": name, "kind": kind }),
                )
            }
            Err(err) => {
                warn!("Terrain import rejected: {}", err);
                CommandEffect::Banner(err.to_string())
            }
        }
    }

    fn tool_state(&self) -> CommandEffect {
        CommandEffect::notify("tool_state_changed", tool_state_params(self.tools))
    }

    fn counts_changed(&self) -> CommandEffect {
        CommandEffect::notify(
            "counts_changed",
            json!({
                "remaining": self.counts.remaining_sheet(),
                "planned": self.counts.planned_sheet(),
            }),
        )
    }
}

pub fn tool_state_params(tools: &ToolManager) -> Value {
    let asset = match tools.mode() {
        InteractionMode::Deploying(state) => Some(state.kind()),
        InteractionMode::Dragging(drag) => Some(drag.kind),
        _ => None,
    };
    json!({
        "mode": tools.mode().label(),
        "asset": asset,
    })
}

/// Apply queued commands and route their effects.
pub fn apply_planner_commands(
    mut events: EventReader<PlannerCommandEvent>,
    mut tools: ResMut<ToolManager>,
    mut counts: ResMut<MissionCounts>,
    mut registry: ResMut<PlacedAssetRegistry>,
    mut layers: ResMut<TerrainLayers>,
    mut measurements: ResMut<MeasurementLog>,
    mut banner: ResMut<StatusBanner>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut export_events: EventWriter<ExportMissionEvent>,
) {
    for event in events.read() {
        debug!("Command {:?} from {:?}", event.command, event.source);

        let mut session = PlannerSession {
            tools: &mut tools,
            counts: &mut counts,
            registry: &mut registry,
            layers: &mut layers,
            measurements: &mut measurements,
        };

        for effect in session.apply(event.command.clone()) {
            match effect {
                CommandEffect::Notify { method, params } => {
                    rpc_interface.send_notification(method, params)
                }
                CommandEffect::Banner(message) => banner.show(message),
                CommandEffect::DismissBanner => banner.dismiss(),
                CommandEffect::Export => {
                    export_events.write(ExportMissionEvent);
                }
            }
        }
    }
}
