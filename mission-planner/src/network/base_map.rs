//! Optional map tile under the scene, fetched once on a worker at startup.

use super::BackendHandle;
use super::tiles::{TileChannel, TileCoord, TileTarget, TileTemplate, spawn_tile_fetch};
use crate::engine::core::config::PlannerConfig;
use bevy::prelude::*;
use constants::scene::GRID_SIZE;

pub struct BaseMapPlugin;

impl Plugin for BaseMapPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, request_base_map).add_systems(
            Update,
            spawn_base_map.run_if(resource_added::<BaseMapTexture>),
        );
    }
}

#[derive(Component)]
pub struct BaseMap;

/// Decoded base map tile, inserted once the fetch completes.
#[derive(Resource, Debug, Clone)]
pub struct BaseMapTexture(pub Handle<Image>);

/// Tile URL around the configured centre, if a base map is configured.
pub fn base_map_url(config: &PlannerConfig) -> Option<String> {
    let template = config.base_map_template.as_deref()?;
    let tile = TileCoord::from_lon_lat(config.base_map_lon, config.base_map_lat, config.base_map_zoom);
    Some(TileTemplate::new(template).url(tile))
}

fn request_base_map(
    config: Res<PlannerConfig>,
    backend: Option<Res<BackendHandle>>,
    channel: Res<TileChannel>,
) {
    let Some(url) = base_map_url(&config) else {
        return;
    };
    let Some(backend) = backend else {
        warn!("Base map configured but no HTTP backend is installed");
        return;
    };

    info!(
        "Requesting base map tile {} around ({}, {})",
        url, config.base_map_lat, config.base_map_lon
    );
    if let Err(err) = spawn_tile_fetch(backend.0.clone(), TileTarget::BaseMap, url, channel.sender()) {
        error!("Failed to start base map worker: {}", err);
    }
}

pub fn spawn_base_map(
    mut commands: Commands,
    texture: Res<BaseMapTexture>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(GRID_SIZE, GRID_SIZE))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color_texture: Some(texture.0.clone()),
            unlit: true,
            ..default()
        })),
        // Just below the grid so the lines stay visible.
        Transform::from_xyz(0.0, -0.002, 0.0),
        BaseMap,
        Name::new("Base Map"),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_template_means_no_base_map() {
        let mut config = PlannerConfig {
            server_origin: "http://localhost:5000".into(),
            preset_path: None,
            base_map_template: None,
            base_map_lat: 0.0,
            base_map_lon: 0.0,
            base_map_zoom: 1,
        };
        assert_eq!(base_map_url(&config), None);

        config.base_map_template = Some("https://{s}.tile.example/{z}/{x}/{y}.png".into());
        assert_eq!(
            base_map_url(&config).as_deref(),
            Some("https://a.tile.example/1/1/1.png")
        );
    }
}
