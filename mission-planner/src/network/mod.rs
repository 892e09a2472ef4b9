//! HTTP collaborators: terrain upload, mission export and map tiles.
//!
//! All remote calls go through the `MissionBackend` trait so the session
//! logic can be driven by a stub in tests. Native builds install the
//! blocking `reqwest` backend; web builds run without one and hand uploads
//! and exports to the host page over RPC instead.

pub mod base_map;
pub mod export;
#[cfg(not(target_arch = "wasm32"))]
pub mod http;
pub mod tiles;
pub mod upload;

use bevy::prelude::*;
use export::{SaveMissionRequest, SaveMissionResponse};
use serde::Deserialize;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[cfg(not(target_arch = "wasm32"))]
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("server rejected the request: {0}")]
    Rejected(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// Body returned by the upload endpoint. Error bodies only carry `error`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    pub file_url: Option<String>,
    pub filename: Option<String>,
    pub error: Option<String>,
}

impl UploadResponse {
    /// The server-relative file URL of a successful upload.
    pub fn into_file_url(self) -> Result<String, NetworkError> {
        match (self.success, self.file_url) {
            (true, Some(url)) => Ok(url),
            (true, None) => Err(NetworkError::InvalidResponse(
                "upload succeeded without a file_url".to_string(),
            )),
            (false, _) => Err(NetworkError::Rejected(
                self.error.unwrap_or_else(|| "upload rejected".to_string()),
            )),
        }
    }
}

/// Join the server origin with a server-relative URL. Absolute URLs pass through.
pub fn resolve_content_url(origin: &str, file_url: &str) -> String {
    if file_url.starts_with("http://") || file_url.starts_with("https://") {
        return file_url.to_string();
    }
    format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        file_url.trim_start_matches('/')
    )
}

/// Remote endpoints used by the planner.
pub trait MissionBackend: Send + Sync {
    /// Upload a terrain file; returns the server-relative file URL.
    fn upload_terrain(&self, file_name: &str, bytes: &[u8]) -> Result<String, NetworkError>;

    fn save_mission(&self, request: &SaveMissionRequest) -> Result<SaveMissionResponse, NetworkError>;

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, NetworkError>;

    /// Origin that relative file URLs are resolved against.
    fn origin(&self) -> &str;
}

/// Installed backend, if this build talks to the server itself.
#[derive(Resource, Clone)]
pub struct BackendHandle(pub Arc<dyn MissionBackend>);

/// Results posted by worker threads, drained on the frame loop.
#[derive(Resource)]
pub struct WorkerChannel<T: Send + 'static> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T: Send + 'static> Default for WorkerChannel<T> {
    fn default() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }
}

impl<T: Send + 'static> WorkerChannel<T> {
    pub fn sender(&self) -> Sender<T> {
        self.tx.clone()
    }

    /// Everything that has arrived since the last call.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }
}

pub struct NetworkPlugin;

impl Plugin for NetworkPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<upload::UploadChannel>()
            .init_resource::<export::ExportChannel>()
            .init_resource::<tiles::TileChannel>()
            .add_plugins(base_map::BaseMapPlugin)
            .add_systems(
                Update,
                (
                    upload::dispatch_pending_uploads,
                    upload::collect_upload_results,
                    export::export_mission_system,
                    export::collect_export_results,
                    tiles::dispatch_layer_tiles,
                    tiles::collect_tile_results,
                ),
            );

        #[cfg(not(target_arch = "wasm32"))]
        app.add_systems(PreStartup, http::install_http_backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_response_variants() {
        let ok: UploadResponse = serde_json::from_str(
            r#"{"success": true, "file_url": "/uploads/abc_t.obj", "filename": "abc_t.obj"}"#,
        )
        .unwrap();
        assert_eq!(ok.into_file_url().unwrap(), "/uploads/abc_t.obj");

        let rejected: UploadResponse =
            serde_json::from_str(r#"{"error": "File type not allowed"}"#).unwrap();
        match rejected.into_file_url() {
            Err(NetworkError::Rejected(message)) => assert_eq!(message, "File type not allowed"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn results_keep_flowing_after_a_worker_panics() {
        let channel = WorkerChannel::<u32>::default();
        let tx = channel.sender();
        let crashed = std::thread::spawn(move || {
            let _tx = tx;
            panic!("worker crashed");
        });
        assert!(crashed.join().is_err());
        assert!(channel.drain().is_empty());

        let tx = channel.sender();
        std::thread::spawn(move || tx.send(7).unwrap())
            .join()
            .unwrap();
        assert_eq!(channel.drain(), vec![7]);
    }

    #[test]
    fn content_url_joins_origin() {
        assert_eq!(
            resolve_content_url("http://localhost:5000/", "/uploads/t.obj"),
            "http://localhost:5000/uploads/t.obj"
        );
        assert_eq!(
            resolve_content_url("http://localhost:5000", "https://cdn/t.obj"),
            "https://cdn/t.obj"
        );
    }
}
