use super::{BackendHandle, WorkerChannel, resolve_content_url};
use crate::rpc::web_rpc::WebRpcInterface;
use crate::terrain::layer::{LayerId, TerrainLayers};
use crate::tools::tool_manager::{CommandSource, PlannerCommand, PlannerCommandEvent};
use bevy::prelude::*;
use std::thread;

/// Outcome of one upload: the resolved content URL or an error message.
#[derive(Debug)]
pub struct UploadResult {
    pub id: LayerId,
    pub outcome: Result<String, String>,
}

/// Worker threads report finished uploads here.
pub type UploadChannel = WorkerChannel<UploadResult>;

/// Start one upload per layer that has none yet. Distinct layers upload
/// concurrently; a layer is never uploaded twice.
pub fn dispatch_pending_uploads(
    backend: Option<Res<BackendHandle>>,
    channel: Res<UploadChannel>,
    mut layers: ResMut<TerrainLayers>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    let pending: Vec<_> = layers
        .pending_uploads()
        .map(|layer| (layer.id, layer.source.clone()))
        .collect();

    for (id, source) in pending {
        layers.mark_in_flight(id);

        let Some(backend) = backend.as_ref() else {
            // No HTTP client in this build: the host page uploads and answers
            // with `resolve_layer` or `upload_failed`.
            rpc_interface.send_notification(
                "upload_requested",
                serde_json::json!({ "id": id.0, "file_name": source.file_name }),
            );
            continue;
        };

        info!("Uploading terrain layer {} ({} bytes)", id, source.bytes.len());
        rpc_interface.send_notification(
            "upload_started",
            serde_json::json!({ "id": id.0, "file_name": source.file_name }),
        );

        let backend = backend.0.clone();
        let tx = channel.sender();
        let spawned = thread::Builder::new()
            .name(format!("terrain-upload-{}", id.0))
            .spawn(move || {
                let outcome = backend
                    .upload_terrain(&source.file_name, &source.bytes)
                    .map(|file_url| resolve_content_url(backend.origin(), &file_url))
                    .map_err(|err| err.to_string());
                // The app may have shut down; nothing to report to.
                let _ = tx.send(UploadResult { id, outcome });
            });

        if let Err(err) = spawned {
            error!("Failed to start upload worker: {}", err);
            layers.mark_upload_failed(id, &err.to_string());
        }
    }
}

/// Apply finished uploads through the command channel.
pub fn collect_upload_results(
    channel: Res<UploadChannel>,
    mut commands: EventWriter<PlannerCommandEvent>,
) {
    for result in channel.drain() {
        let command = match result.outcome {
            Ok(file_url) => PlannerCommand::ResolveLayer {
                id: result.id,
                file_url,
            },
            Err(error) => PlannerCommand::FailLayer {
                id: result.id,
                error,
            },
        };
        commands.write(PlannerCommandEvent {
            command,
            source: CommandSource::Network,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_drains_in_order() {
        let channel = UploadChannel::default();
        let tx = channel.sender();
        tx.send(UploadResult {
            id: LayerId(0),
            outcome: Ok("a".into()),
        })
        .unwrap();
        tx.send(UploadResult {
            id: LayerId(1),
            outcome: Err("refused".into()),
        })
        .unwrap();

        let results = channel.drain();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, LayerId(0));
        assert!(results[1].outcome.is_err());
        assert!(channel.drain().is_empty());
    }
}
