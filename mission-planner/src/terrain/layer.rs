use super::error::{ImportError, LayerError};
use super::geometry::TerrainGeometry;
use bevy::math::Affine3A;
use bevy::prelude::*;
use constants::network::{MESH_EXTENSIONS, RASTER_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Mesh,
    Raster,
}

impl LayerKind {
    /// Classify a file by extension, case-insensitively.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_lowercase();

        if MESH_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Mesh)
        } else if RASTER_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Raster)
        } else {
            None
        }
    }
}

/// Progress of the external upload that yields a layer's content URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Pending,
    InFlight,
    Failed(String),
    Resolved,
}

/// Progress of the texture tile for a raster layer with a tile base URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TileState {
    #[default]
    None,
    Pending,
    InFlight,
    Loaded,
    Failed(String),
}

/// The user file a layer was created from.
#[derive(Debug, Clone)]
pub struct TerrainSource {
    pub file_name: String,
    pub bytes: Arc<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct TerrainLayer {
    pub id: LayerId,
    pub name: String,
    pub kind: LayerKind,
    pub visible: bool,
    pub source: TerrainSource,
    pub content_url: Option<String>,
    pub upload: UploadState,
    pub geometry: Option<Arc<TerrainGeometry>>,
    /// Base URL of pre-processed `{z}/{x}/{y}.png` tiles for raster layers.
    pub tile_base_url: Option<String>,
    pub tiles: TileState,
}

impl TerrainLayer {
    /// Visible, resolved and decoded.
    pub fn is_pickable(&self) -> bool {
        self.visible && self.content_url.is_some() && self.geometry.is_some()
    }
}

/// Terrain geometry eligible for ray intersection this frame.
#[derive(Debug, Clone, Copy)]
pub struct Pickable<'a> {
    pub layer: LayerId,
    pub geometry: &'a TerrainGeometry,
    pub world_from_local: Affine3A,
}

/// All imported terrain layers in import order.
#[derive(Resource, Debug, Default)]
pub struct TerrainLayers {
    layers: Vec<TerrainLayer>,
    next_id: u32,
}

impl TerrainLayers {
    /// Register a user file as a new, inert layer.
    pub fn import(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<LayerId, ImportError> {
        let kind = LayerKind::from_file_name(file_name).ok_or_else(|| {
            ImportError::UnsupportedExtension {
                file_name: file_name.to_string(),
            }
        })?;

        let id = LayerId(self.next_id);
        self.next_id += 1;

        let name = Path::new(file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(file_name)
            .to_string();

        self.layers.push(TerrainLayer {
            id,
            name,
            kind,
            visible: true,
            source: TerrainSource {
                file_name: file_name.to_string(),
                bytes: Arc::new(bytes),
            },
            content_url: None,
            upload: UploadState::Pending,
            geometry: None,
            tile_base_url: None,
            tiles: TileState::None,
        });

        info!("Imported terrain layer {} from '{}' ({:?})", id, file_name, kind);
        Ok(id)
    }

    /// Read a file from disk and import it.
    pub fn import_path(&mut self, path: &Path) -> Result<LayerId, ImportError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();

        // Check the extension before touching the disk.
        if LayerKind::from_file_name(&file_name).is_none() {
            return Err(ImportError::UnsupportedExtension { file_name });
        }

        let bytes = std::fs::read(path).map_err(|source| ImportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.import(&file_name, bytes)
    }

    /// Attach the content URL and decode geometry. A layer accepts one URL only.
    pub fn resolve(&mut self, id: LayerId, url: String) -> Result<(), LayerError> {
        let layer = self.get_mut(id).ok_or(LayerError::UnknownLayer(id))?;
        if layer.content_url.is_some() {
            return Err(LayerError::AlreadyResolved(id));
        }

        let geometry = match TerrainGeometry::decode(layer.kind, &layer.source.bytes) {
            Ok(geometry) => geometry,
            Err(source) => {
                layer.upload = UploadState::Failed(source.to_string());
                return Err(LayerError::Decode { id, source });
            }
        };

        info!(
            "Terrain layer {} resolved at {} ({} triangles)",
            id,
            url,
            geometry.triangle_count()
        );
        layer.geometry = Some(Arc::new(geometry));
        layer.content_url = Some(url);
        layer.upload = UploadState::Resolved;
        Ok(())
    }

    pub fn mark_in_flight(&mut self, id: LayerId) {
        if let Some(layer) = self.get_mut(id) {
            layer.upload = UploadState::InFlight;
        }
    }

    /// Leave the layer inert; failed uploads are not retried.
    pub fn mark_upload_failed(&mut self, id: LayerId, message: &str) {
        if let Some(layer) = self.get_mut(id) {
            warn!("Upload of terrain layer {} failed: {}", id, message);
            layer.upload = UploadState::Failed(message.to_string());
        }
    }

    /// Attach a tile base URL. Raster layers queue a tile fetch when the URL changes;
    /// mesh layers only record it.
    pub fn set_tile_base_url(&mut self, id: LayerId, base_url: String) -> Result<(), LayerError> {
        let layer = self.get_mut(id).ok_or(LayerError::UnknownLayer(id))?;
        if layer.tile_base_url.as_deref() == Some(base_url.as_str()) {
            return Ok(());
        }
        layer.tile_base_url = Some(base_url);
        layer.tiles = match layer.kind {
            LayerKind::Raster => TileState::Pending,
            LayerKind::Mesh => TileState::None,
        };
        Ok(())
    }

    /// Raster layers whose tile has not been requested yet.
    pub fn pending_tiles(&self) -> impl Iterator<Item = &TerrainLayer> {
        self.layers
            .iter()
            .filter(|layer| layer.tiles == TileState::Pending && layer.tile_base_url.is_some())
    }

    pub fn mark_tiles_in_flight(&mut self, id: LayerId) {
        if let Some(layer) = self.get_mut(id) {
            layer.tiles = TileState::InFlight;
        }
    }

    /// Record a finished tile fetch for `base_url`. Returns `false` when the layer
    /// is gone or has moved on to another URL, so the result should be dropped.
    pub fn finish_tiles(&mut self, id: LayerId, base_url: &str, outcome: Result<(), String>) -> bool {
        let Some(layer) = self.get_mut(id) else {
            return false;
        };
        if layer.tile_base_url.as_deref() != Some(base_url) {
            return false;
        }
        layer.tiles = match outcome {
            Ok(()) => TileState::Loaded,
            Err(message) => {
                warn!("Tiles for terrain layer {} failed: {}", id, message);
                TileState::Failed(message)
            }
        };
        true
    }

    pub fn set_visible(&mut self, id: LayerId, visible: bool) -> Result<(), LayerError> {
        let layer = self.get_mut(id).ok_or(LayerError::UnknownLayer(id))?;
        layer.visible = visible;
        Ok(())
    }

    pub fn remove(&mut self, id: LayerId) -> Result<TerrainLayer, LayerError> {
        let index = self
            .layers
            .iter()
            .position(|layer| layer.id == id)
            .ok_or(LayerError::UnknownLayer(id))?;
        Ok(self.layers.remove(index))
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Layers that still need an upload. In-flight, failed and resolved layers are skipped.
    pub fn pending_uploads(&self) -> impl Iterator<Item = &TerrainLayer> {
        self.layers
            .iter()
            .filter(|layer| layer.content_url.is_none() && layer.upload == UploadState::Pending)
    }

    pub fn any_in_flight(&self) -> bool {
        self.layers
            .iter()
            .any(|layer| layer.upload == UploadState::InFlight)
    }

    pub fn pickables(&self) -> Vec<Pickable<'_>> {
        self.layers
            .iter()
            .filter(|layer| layer.is_pickable())
            .filter_map(|layer| {
                let geometry = layer.geometry.as_deref()?;
                Some(Pickable {
                    layer: layer.id,
                    geometry,
                    world_from_local: geometry.placement(),
                })
            })
            .collect()
    }

    pub fn get(&self, id: LayerId) -> Option<&TerrainLayer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    fn get_mut(&mut self, id: LayerId) -> Option<&mut TerrainLayer> {
        self.layers.iter_mut().find(|layer| layer.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TerrainLayer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
