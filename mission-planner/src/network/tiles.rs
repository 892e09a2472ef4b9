//! Slippy-map tile addressing and background tile fetches.

use super::base_map::BaseMapTexture;
use super::{BackendHandle, MissionBackend, WorkerChannel};
use crate::engine::core::config::PlannerConfig;
use crate::terrain::LayerTextures;
use crate::terrain::layer::{LayerId, TerrainLayers};
use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use constants::network::MAX_TILE_ZOOM;
use crossbeam_channel::Sender;
use std::f64::consts::PI;
use std::sync::Arc;
use std::thread;

/// A slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    /// Tile containing `(lon, lat)` at `zoom`. Longitude wraps, latitude is
    /// clamped to the projection's valid rows.
    pub fn from_lon_lat(lon: f64, lat: f64, zoom: u8) -> Self {
        let z = zoom.min(MAX_TILE_ZOOM);
        let n = 1_i64 << z;
        let x_raw = ((lon + 180.0) / 360.0 * n as f64).floor() as i64;
        let lat_rad = lat.to_radians();
        let y_raw = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n as f64)
            .floor() as i64;

        Self {
            z,
            x: x_raw.rem_euclid(n) as u32,
            y: y_raw.clamp(0, n - 1) as u32,
        }
    }
}

/// URL template with `{z}`, `{x}`, `{y}` and optional `{s}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileTemplate(String);

impl TileTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Template for a pre-tiled raster layer served under `base`.
    pub fn for_layer(base: &str) -> Self {
        Self(format!("{}/{{z}}/{{x}}/{{y}}.png", base.trim_end_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn url(&self, tile: TileCoord) -> String {
        self.0
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
            .replace("{s}", "a")
    }
}

/// Decode a PNG/JPEG tile into an sRGB texture.
pub fn decode_tile(bytes: &[u8]) -> Result<Image, image::ImageError> {
    let rgba = image::load_from_memory(bytes)?.into_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(Image::new(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        rgba.into_raw(),
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
    ))
}

/// What a fetched tile is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileTarget {
    BaseMap,
    Layer { id: LayerId, base_url: String },
}

#[derive(Debug)]
pub struct TileResult {
    pub target: TileTarget,
    pub url: String,
    pub outcome: Result<Image, String>,
}

pub type TileChannel = WorkerChannel<TileResult>;

/// Fetch and decode one tile on a worker thread.
pub fn spawn_tile_fetch(
    backend: Arc<dyn MissionBackend>,
    target: TileTarget,
    url: String,
    tx: Sender<TileResult>,
) -> std::io::Result<()> {
    thread::Builder::new()
        .name("tile-fetch".to_string())
        .spawn(move || {
            let outcome = backend
                .fetch_bytes(&url)
                .map_err(|err| err.to_string())
                .and_then(|bytes| decode_tile(&bytes).map_err(|err| err.to_string()));
            let _ = tx.send(TileResult {
                target,
                url,
                outcome,
            });
        })?;
    Ok(())
}

/// The tile of a layer's tile set shown on its mesh: the one around the map centre.
pub fn layer_tile_url(base_url: &str, config: &PlannerConfig) -> String {
    let tile = TileCoord::from_lon_lat(config.base_map_lon, config.base_map_lat, config.base_map_zoom);
    TileTemplate::for_layer(base_url).url(tile)
}

/// Start a tile fetch for every raster layer that was given a tile base URL.
pub fn dispatch_layer_tiles(
    backend: Option<Res<BackendHandle>>,
    config: Res<PlannerConfig>,
    channel: Res<TileChannel>,
    mut layers: ResMut<TerrainLayers>,
) {
    let pending: Vec<_> = layers
        .pending_tiles()
        .filter_map(|layer| Some((layer.id, layer.tile_base_url.clone()?)))
        .collect();

    for (id, base_url) in pending {
        layers.mark_tiles_in_flight(id);

        let Some(backend) = backend.as_ref() else {
            layers.finish_tiles(id, &base_url, Err("no HTTP backend installed".to_string()));
            continue;
        };

        let url = layer_tile_url(&base_url, &config);
        debug!("Fetching tile {} for terrain layer {}", url, id);
        let target = TileTarget::Layer {
            id,
            base_url: base_url.clone(),
        };
        if let Err(err) = spawn_tile_fetch(backend.0.clone(), target, url, channel.sender()) {
            error!("Failed to start tile worker: {}", err);
            layers.finish_tiles(id, &base_url, Err(err.to_string()));
        }
    }
}

/// Turn finished tile fetches into textures.
pub fn collect_tile_results(
    mut commands: Commands,
    channel: Res<TileChannel>,
    mut layers: ResMut<TerrainLayers>,
    mut images: ResMut<Assets<Image>>,
    mut textures: ResMut<LayerTextures>,
) {
    for result in channel.drain() {
        match result.target {
            TileTarget::BaseMap => match result.outcome {
                Ok(image) => {
                    info!("Loaded base map tile {}", result.url);
                    commands.insert_resource(BaseMapTexture(images.add(image)));
                }
                Err(err) => warn!("Failed to load base map tile {}: {}", result.url, err),
            },
            TileTarget::Layer { id, base_url } => {
                let (image, status) = match result.outcome {
                    Ok(image) => (Some(image), Ok(())),
                    Err(err) => (None, Err(err)),
                };
                if !layers.finish_tiles(id, &base_url, status) {
                    debug!("Dropping stale tile {} for terrain layer {}", result.url, id);
                    continue;
                }
                match image {
                    Some(image) => {
                        info!("Draping tile {} over terrain layer {}", result.url, id);
                        textures.0.insert(id, images.add(image));
                    }
                    None => {
                        textures.0.remove(&id);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let tile = RgbaImage::from_pixel(4, 2, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        tile.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_png_tiles() {
        let image = decode_tile(&png_bytes()).unwrap();
        assert_eq!(image.width(), 4);
        assert_eq!(image.height(), 2);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_tile(b"not an image").is_err());
    }

    #[test]
    fn layer_tile_sits_under_the_map_centre() {
        let config = PlannerConfig {
            server_origin: "http://localhost:5000".into(),
            preset_path: None,
            base_map_template: None,
            base_map_lat: 45.81298654949797,
            base_map_lon: 15.977990737614029,
            base_map_zoom: 17,
        };
        assert_eq!(
            layer_tile_url("http://localhost:5000/tiles/dem/", &config),
            "http://localhost:5000/tiles/dem/17/71353/46728.png"
        );
    }

    #[test]
    fn origin_at_zoom_one_is_bottom_right_quadrant() {
        assert_eq!(
            TileCoord::from_lon_lat(0.0, 0.0, 1),
            TileCoord { z: 1, x: 1, y: 1 }
        );
    }

    #[test]
    fn longitude_wraps_and_latitude_clamps() {
        let east = TileCoord::from_lon_lat(180.0, 0.0, 2);
        assert_eq!(east.x, 0);

        let north = TileCoord::from_lon_lat(0.0, 89.9, 2);
        assert_eq!(north.y, 0);
        let south = TileCoord::from_lon_lat(0.0, -89.9, 2);
        assert_eq!(south.y, 3);
    }

    #[test]
    fn zagreb_tile_at_zoom_seventeen() {
        let tile = TileCoord::from_lon_lat(15.977990737614029, 45.81298654949797, 17);
        assert_eq!(tile.z, 17);
        assert_eq!(tile.x, 71353);
        assert_eq!(tile.y, 46728);
    }

    #[test]
    fn templates_substitute_placeholders() {
        let tile = TileCoord { z: 3, x: 4, y: 5 };
        assert_eq!(
            TileTemplate::new("https://{s}.tiles/{z}/{x}/{y}.png").url(tile),
            "https://a.tiles/3/4/5.png"
        );
        assert_eq!(
            TileTemplate::for_layer("http://localhost:5000/tiles/abc/").url(tile),
            "http://localhost:5000/tiles/abc/3/4/5.png"
        );
    }
}
