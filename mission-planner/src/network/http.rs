use super::export::{SaveMissionRequest, SaveMissionResponse};
use super::{BackendHandle, MissionBackend, NetworkError, UploadResponse};
use crate::engine::core::config::PlannerConfig;
use bevy::prelude::*;
use constants::network::{SAVE_MISSION_PATH, UPLOAD_FIELD, UPLOAD_PATH};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use std::sync::Arc;

/// Blocking HTTP backend. Calls run on worker threads, never on the frame loop.
pub struct HttpMissionBackend {
    client: Client,
    origin: String,
}

impl HttpMissionBackend {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            origin: origin.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }
}

/// Turn a non-2xx response into an error carrying the server's `error` field when present.
fn check_status(response: Response) -> Result<Response, NetworkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<UploadResponse>(&body)
        .ok()
        .and_then(|parsed| parsed.error)
        .unwrap_or(body);
    Err(NetworkError::Status {
        status: status.as_u16(),
        message,
    })
}

impl MissionBackend for HttpMissionBackend {
    fn upload_terrain(&self, file_name: &str, bytes: &[u8]) -> Result<String, NetworkError> {
        let part = Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(self.endpoint(UPLOAD_PATH))
            .multipart(form)
            .send()?;
        let body: UploadResponse = check_status(response)?.json()?;
        body.into_file_url()
    }

    fn save_mission(&self, request: &SaveMissionRequest) -> Result<SaveMissionResponse, NetworkError> {
        let response = self
            .client
            .post(self.endpoint(SAVE_MISSION_PATH))
            .json(request)
            .send()?;
        let body: SaveMissionResponse = check_status(response)?.json()?;
        body.into_result()
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        let response = check_status(self.client.get(url).send()?)?;
        Ok(response.bytes()?.to_vec())
    }

    fn origin(&self) -> &str {
        &self.origin
    }
}

pub fn install_http_backend(mut commands: Commands, config: Res<PlannerConfig>) {
    info!("Mission server: {}", config.server_origin);
    commands.insert_resource(BackendHandle(Arc::new(HttpMissionBackend::new(
        config.server_origin.clone(),
    ))));
}
