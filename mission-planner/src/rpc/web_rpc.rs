use crate::network::tiles::TileTemplate;
use crate::terrain::layer::{LayerId, TerrainLayers, UploadState};
use crate::tools::measure::MeasurementLog;
use crate::tools::mission::{AssetKind, CountSheet, MissionCounts};
use crate::tools::registry::PlacedAssetRegistry;
use crate::tools::tool_manager::{
    CommandSource, PlannerCommand, PlannerCommandEvent, ToolManager, tool_state_params,
};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;

#[cfg(target_arch = "wasm32")]
use web_sys::{MessageEvent, window};

/// JSON-RPC 2.0 request structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
}

/// JSON-RPC 2.0 error object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

/// Standard RPC error codes and constructors.
impl RpcError {
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "Method not found".to_string(),
            data: Some(json!({ "method": method })),
        }
    }

    pub fn invalid_params(message: &str) -> Self {
        Self {
            code: -32602,
            message: message.to_string(),
            data: None,
        }
    }
}

/// Resource managing bidirectional RPC communication between the host page and Bevy.
#[derive(Resource, Default)]
pub struct WebRpcInterface {
    outgoing_notifications: Vec<RpcNotification>,
    outgoing_responses: Vec<RpcResponse>,
}

impl WebRpcInterface {
    /// Send notification to the host without expecting a response.
    pub fn send_notification(&mut self, method: &str, params: Value) {
        self.outgoing_notifications.push(RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    fn queue_response(&mut self, response: RpcResponse) {
        self.outgoing_responses.push(response);
    }

    /// Notifications queued since the last flush.
    pub fn pending_notifications(&self) -> &[RpcNotification] {
        &self.outgoing_notifications
    }
}

/// What an incoming request asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcAction {
    Command(PlannerCommand),
    GetMissionState,
}

pub struct WebRpcPlugin;

impl Plugin for WebRpcPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WebRpcInterface>()
            .add_event::<IncomingRpcMessage>()
            .add_systems(
                Update,
                (process_incoming_messages, handle_rpc_messages).chain(),
            )
            .add_systems(Last, send_outgoing_messages);

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, setup_message_listener);
    }
}

#[cfg(target_arch = "wasm32")]
fn setup_message_listener(mut commands: Commands) {
    use std::sync::Arc;
    use std::sync::Mutex;

    let message_queue: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let queue_clone = message_queue.clone();

    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        if let Ok(data) = event.data().dyn_into::<js_sys::JsString>() {
            let message_str: String = data.into();

            if message_str.contains("jsonrpc") {
                if let Ok(mut queue) = queue_clone.lock() {
                    queue.push(message_str);
                }
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    if let Some(window) = window() {
        if let Err(e) =
            window.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
        {
            error!("Failed to register message listener: {:?}", e);
        }
    }

    // Ownership moves to JS so the listener outlives this system.
    closure.forget();
    commands.insert_resource(MessageQueue(message_queue));
}

/// Messages received by the JS listener, waiting for the next frame.
#[derive(Resource)]
struct MessageQueue(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

#[derive(Event)]
pub struct IncomingRpcMessage {
    pub content: String,
}

fn process_incoming_messages(
    message_queue: Option<Res<MessageQueue>>,
    mut message_events: EventWriter<IncomingRpcMessage>,
) {
    let Some(queue_res) = message_queue else {
        return;
    };

    let messages = if let Ok(mut queue) = queue_res.0.lock() {
        std::mem::take(&mut *queue)
    } else {
        Vec::new()
    };

    for message_str in messages {
        message_events.write(IncomingRpcMessage {
            content: message_str,
        });
    }
}

fn handle_rpc_messages(
    mut events: EventReader<IncomingRpcMessage>,
    tools: Res<ToolManager>,
    counts: Res<MissionCounts>,
    registry: Res<PlacedAssetRegistry>,
    layers: Res<TerrainLayers>,
    measurements: Res<MeasurementLog>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut planner_commands: EventWriter<PlannerCommandEvent>,
) {
    for event in events.read() {
        let request = match serde_json::from_str::<RpcRequest>(&event.content) {
            Ok(request) => request,
            Err(parse_error) => {
                warn!("Dropping malformed RPC message: {}", parse_error);
                continue;
            }
        };
        debug!("RPC {}", request.method);

        let result = match parse_action(&request) {
            Ok(RpcAction::Command(command)) => {
                planner_commands.write(PlannerCommandEvent {
                    command,
                    source: CommandSource::Rpc,
                });
                Ok(json!({ "accepted": true }))
            }
            Ok(RpcAction::GetMissionState) => Ok(mission_state(
                &tools,
                &counts,
                &registry,
                &layers,
                &measurements,
            )),
            Err(error) => {
                warn!("Rejected RPC {}: {}", request.method, error.message);
                Err(error)
            }
        };

        // Requests without an id are notifications and get no reply.
        if let Some(id) = request.id {
            rpc_interface.queue_response(create_response(id, result));
        }
    }
}

fn params<T: DeserializeOwned>(params: &Value, expected: &str) -> Result<T, RpcError> {
    serde_json::from_value(params.clone())
        .map_err(|_| RpcError::invalid_params(&format!("Expected {}", expected)))
}

fn asset_kind(name: &str) -> Result<AssetKind, RpcError> {
    AssetKind::from_string(name)
        .ok_or_else(|| RpcError::invalid_params(&format!("Unknown asset: {}", name)))
}

/// Map a request onto a planner command or query.
pub fn parse_action(request: &RpcRequest) -> Result<RpcAction, RpcError> {
    #[derive(Deserialize)]
    struct ToolSelectionParams {
        tool: String,
        asset: Option<String>,
    }

    #[derive(Deserialize)]
    struct LayerParams {
        id: u32,
    }

    #[derive(Deserialize)]
    struct VisibilityParams {
        id: u32,
        visible: bool,
    }

    #[derive(Deserialize)]
    struct ResolveParams {
        id: u32,
        file_url: String,
    }

    #[derive(Deserialize)]
    struct FailParams {
        id: u32,
        error: String,
    }

    #[derive(Deserialize)]
    struct TilesParams {
        id: u32,
        base_url: String,
    }

    #[derive(Deserialize)]
    struct MoveParams {
        index: usize,
        kind: String,
        position: [f32; 3],
    }

    #[derive(Deserialize)]
    struct ImportParams {
        file_name: String,
        bytes: Vec<u8>,
    }

    let p = &request.params;
    let command = match request.method.as_str() {
        "tool_selection" => {
            let parsed: ToolSelectionParams = params(p, "'tool' parameter")?;
            match parsed.tool.to_lowercase().as_str() {
                "measure" => PlannerCommand::Measure,
                "deploy" => {
                    let asset = parsed
                        .asset
                        .ok_or_else(|| RpcError::invalid_params("Deploy requires 'asset'"))?;
                    PlannerCommand::Deploy(asset_kind(&asset)?)
                }
                other => {
                    return Err(RpcError::invalid_params(&format!("Unknown tool: {}", other)));
                }
            }
        }
        "clear_tool" => PlannerCommand::ClearTool,
        "set_mission_counts" => {
            PlannerCommand::SetMissionCounts(params::<CountSheet>(p, "asset counts")?)
        }
        "clear_scene" => PlannerCommand::ClearScene,
        "import_terrain" => {
            let parsed: ImportParams = params(p, "'file_name' and 'bytes'")?;
            PlannerCommand::ImportTerrainBytes {
                file_name: parsed.file_name,
                bytes: parsed.bytes,
            }
        }
        "set_layer_visibility" => {
            let parsed: VisibilityParams = params(p, "'id' and 'visible'")?;
            PlannerCommand::SetLayerVisibility {
                id: LayerId(parsed.id),
                visible: parsed.visible,
            }
        }
        "remove_layer" => {
            let parsed: LayerParams = params(p, "'id' parameter")?;
            PlannerCommand::RemoveLayer(LayerId(parsed.id))
        }
        "resolve_layer" => {
            let parsed: ResolveParams = params(p, "'id' and 'file_url'")?;
            PlannerCommand::ResolveLayer {
                id: LayerId(parsed.id),
                file_url: parsed.file_url,
            }
        }
        "upload_failed" => {
            let parsed: FailParams = params(p, "'id' and 'error'")?;
            PlannerCommand::FailLayer {
                id: LayerId(parsed.id),
                error: parsed.error,
            }
        }
        "set_layer_tiles" => {
            let parsed: TilesParams = params(p, "'id' and 'base_url'")?;
            PlannerCommand::SetLayerTiles {
                id: LayerId(parsed.id),
                base_url: parsed.base_url,
            }
        }
        "move_asset" => {
            let parsed: MoveParams = params(p, "'index', 'kind' and 'position'")?;
            PlannerCommand::MoveAsset {
                index: parsed.index,
                kind: asset_kind(&parsed.kind)?,
                position: Vec3::from_array(parsed.position),
            }
        }
        "export_mission" => PlannerCommand::ExportMission,
        "get_mission_state" => return Ok(RpcAction::GetMissionState),
        _ => return Err(RpcError::method_not_found(&request.method)),
    };
    Ok(RpcAction::Command(command))
}

fn upload_label(state: &UploadState) -> &'static str {
    match state {
        UploadState::Pending => "pending",
        UploadState::InFlight => "uploading",
        UploadState::Failed(_) => "failed",
        UploadState::Resolved => "resolved",
    }
}

/// Snapshot of the session for `get_mission_state`.
pub fn mission_state(
    tools: &ToolManager,
    counts: &MissionCounts,
    registry: &PlacedAssetRegistry,
    layers: &TerrainLayers,
    measurements: &MeasurementLog,
) -> Value {
    let assets: Vec<Value> = registry
        .iter()
        .enumerate()
        .map(|(index, asset)| {
            json!({
                "index": index,
                "id": asset.id.0,
                "kind": asset.kind,
                "position": asset.position.to_array(),
            })
        })
        .collect();

    let terrain: Vec<Value> = layers
        .iter()
        .map(|layer| {
            json!({
                "id": layer.id.0,
                "name": layer.name,
                "kind": layer.kind,
                "visible": layer.visible,
                "upload": upload_label(&layer.upload),
                "content_url": layer.content_url,
                "tiles": layer
                    .tile_base_url
                    .as_deref()
                    .map(|base| TileTemplate::for_layer(base).as_str().to_string()),
            })
        })
        .collect();

    json!({
        "tool": tool_state_params(tools),
        "remaining": counts.remaining_sheet(),
        "planned": counts.planned_sheet(),
        "assets": assets,
        "layers": terrain,
        "measurement": measurements.last,
    })
}

fn create_response(id: Value, result: Result<Value, RpcError>) -> RpcResponse {
    match result {
        Ok(result_value) => RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result_value),
            error: None,
            id: Some(id),
        },
        Err(error) => RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id: Some(id),
        },
    }
}

/// Send queued notifications and responses to the host page.
fn send_outgoing_messages(mut rpc_interface: ResMut<WebRpcInterface>) {
    for notification in rpc_interface.outgoing_notifications.drain(..) {
        send_message_to_parent(&notification);
    }

    for response in rpc_interface.outgoing_responses.drain(..) {
        send_message_to_parent(&response);
    }
}

fn send_message_to_parent<T: Serialize>(message: &T) {
    #[cfg(target_arch = "wasm32")]
    {
        match serde_json::to_string(message) {
            Ok(json) => {
                if let Some(window) = window() {
                    if let Some(parent) = window.parent().ok().flatten() {
                        if let Err(e) = parent.post_message(&JsValue::from_str(&json), "*") {
                            error!("Failed to send message to parent: {:?}", e);
                        }
                    } else {
                        warn!("No parent window available for message transmission");
                    }
                } else {
                    error!("Window object not available");
                }
            }
            Err(e) => {
                error!("Failed to serialize message: {}", e);
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: &str, params: Value) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: Some(json!(1)),
        }
    }

    fn command(method: &str, params: Value) -> PlannerCommand {
        match parse_action(&request(method, params)) {
            Ok(RpcAction::Command(command)) => command,
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn tool_selection_maps_to_tools() {
        assert_eq!(
            command("tool_selection", json!({ "tool": "measure" })),
            PlannerCommand::Measure
        );
        assert_eq!(
            command("tool_selection", json!({ "tool": "deploy", "asset": "tanks" })),
            PlannerCommand::Deploy(AssetKind::Tanks)
        );
    }

    #[test]
    fn deploy_without_asset_is_invalid_params() {
        let err = parse_action(&request("tool_selection", json!({ "tool": "deploy" }))).unwrap_err();
        assert_eq!(err.code, -32602);

        let err = parse_action(&request(
            "tool_selection",
            json!({ "tool": "deploy", "asset": "artillery" }),
        ))
        .unwrap_err();
        assert_eq!(err.code, -32602);
    }

    #[test]
    fn unknown_method_is_not_found() {
        let err = parse_action(&request("launch", Value::Null)).unwrap_err();
        assert_eq!(err.code, -32601);
        assert_eq!(err.data, Some(json!({ "method": "launch" })));
    }

    #[test]
    fn counts_default_missing_kinds_to_zero() {
        assert_eq!(
            command("set_mission_counts", json!({ "troops": 4, "tanks": 1 })),
            PlannerCommand::SetMissionCounts(CountSheet {
                troops: 4,
                tanks: 1,
                ..default()
            })
        );
    }

    #[test]
    fn layer_commands_carry_ids() {
        assert_eq!(
            command(
                "resolve_layer",
                json!({ "id": 2, "file_url": "/uploads/t.obj" })
            ),
            PlannerCommand::ResolveLayer {
                id: LayerId(2),
                file_url: "/uploads/t.obj".to_string()
            }
        );
        assert_eq!(
            command("remove_layer", json!({ "id": 0 })),
            PlannerCommand::RemoveLayer(LayerId(0))
        );
        assert!(parse_action(&request("set_layer_visibility", json!({ "id": 0 }))).is_err());
    }

    #[test]
    fn move_asset_parses_position() {
        assert_eq!(
            command(
                "move_asset",
                json!({ "index": 3, "kind": "arsenal", "position": [1.0, 0.05, 2.0] })
            ),
            PlannerCommand::MoveAsset {
                index: 3,
                kind: AssetKind::Arsenal,
                position: Vec3::new(1.0, 0.05, 2.0)
            }
        );
    }

    #[test]
    fn mission_state_lists_assets_and_layers() {
        let mut registry = PlacedAssetRegistry::default();
        registry.append(AssetKind::Vehicles, Vec3::new(1.0, 0.075, 0.0));
        let mut layers = TerrainLayers::default();
        let id = layers.import("t.obj", b"v 0 0 0\n".to_vec()).unwrap();
        layers
            .set_tile_base_url(id, "http://tiles/t".to_string())
            .unwrap();

        let state = mission_state(
            &ToolManager::default(),
            &MissionCounts::default(),
            &registry,
            &layers,
            &MeasurementLog::default(),
        );

        assert_eq!(state["tool"]["mode"], "idle");
        assert_eq!(state["assets"][0]["kind"], "vehicles");
        assert_eq!(state["layers"][0]["upload"], "pending");
        assert_eq!(state["layers"][0]["tiles"], "http://tiles/t/{z}/{x}/{y}.png");
        assert_eq!(state["measurement"], Value::Null);
    }

    #[test]
    fn notifications_queue_in_order() {
        let mut rpc = WebRpcInterface::default();
        rpc.send_notification("a", json!({}));
        rpc.send_notification("b", json!({ "x": 1 }));
        let methods: Vec<_> = rpc
            .pending_notifications()
            .iter()
            .map(|n| n.method.as_str())
            .collect();
        assert_eq!(methods, ["a", "b"]);
    }
}
