//! JSON-RPC 2.0 bridge to the embedding page.
//!
//! The planner runs inside an iframe; the host page drives it with
//! `postMessage` requests and receives notifications for every state change.
//!
//! ## Message Flow
//!
//! ```text
//! Host (parent window)  <──postMessage──>  Planner (iframe)
//!        │                                        │
//!        ├─ Request (with ID) ──────────────────> │
//!        │                                        ├─ parse_action -> PlannerCommandEvent
//!        │ <───────────────── Response (with ID) ─┤
//!        │                                        │
//!        │ <────────── Notification (no ID) ─────┤
//! ```
//!
//! Requests never touch session state directly. They are parsed into
//! `PlannerCommand`s and applied by `apply_planner_commands` together with
//! keyboard and file-drop input, so the response only acknowledges that the
//! command was queued. State changes arrive as notifications.
//!
//! ## Methods
//!
//! ### Tools
//! - `tool_selection {tool: "measure" | "deploy", asset?}`
//! - `clear_tool`
//!
//! ### Mission
//! - `set_mission_counts {troops, arsenal, vehicles, tanks}`
//! - `move_asset {index, kind, position}`: out-of-range indices are ignored
//! - `clear_scene`
//! - `export_mission`
//! - `get_mission_state`: returns a snapshot instead of queueing a command
//!
//! ### Terrain
//! - `import_terrain {file_name, bytes}`
//! - `set_layer_visibility {id, visible}`
//! - `remove_layer {id}`
//! - `resolve_layer {id, file_url}` / `upload_failed {id, error}`: answers to `upload_requested`
//! - `set_layer_tiles {id, base_url}`
//!
//! ## Notifications
//!
//! `tool_state_changed`, `counts_changed`, `asset_placed`, `asset_moved`,
//! `measure_started`, `measure_completed`, `layer_imported`, `layer_removed`,
//! `layer_resolved`, `upload_requested`, `upload_started`, `upload_failed`,
//! `export_ready`, `mission_exported`, `export_failed`, `scene_cleared`.
//!
//! ## Error Handling
//!
//! - `-32601`: Method not found
//! - `-32602`: Invalid params

/// JSON-RPC 2.0 bidirectional communication system for the host page.
pub mod web_rpc;
