//! Terrain layers imported from user files.
//!
//! A layer starts inert when the file is imported and becomes pickable once
//! its upload resolves a content URL and the geometry has been decoded. The
//! sync system mirrors resolved layers into the scene as meshes, draping a
//! tile texture over raster layers once one has been fetched.

pub mod error;
pub mod geometry;
pub mod layer;
pub mod obj;
pub mod raster;

use bevy::prelude::*;
use layer::{LayerId, LayerKind, TerrainLayers};
use std::collections::HashMap;

#[derive(Component, Debug, Clone, Copy)]
pub struct TerrainLayerEntity(pub LayerId);

/// Tile textures fetched for raster layers.
#[derive(Resource, Debug, Default)]
pub struct LayerTextures(pub HashMap<LayerId, Handle<Image>>);

fn layer_material(kind: LayerKind, texture: Option<Handle<Image>>) -> StandardMaterial {
    let base_color = match (kind, texture.is_some()) {
        (_, true) => Color::WHITE,
        (LayerKind::Mesh, false) => Color::srgb(0.55, 0.52, 0.45),
        (LayerKind::Raster, false) => Color::srgb(0.42, 0.55, 0.35),
    };
    StandardMaterial {
        base_color,
        base_color_texture: texture,
        perceptual_roughness: 0.9,
        double_sided: true,
        cull_mode: None,
        ..default()
    }
}

pub struct TerrainPlugin;

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TerrainLayers>()
            .init_resource::<LayerTextures>()
            .add_systems(Update, sync_terrain_entities);
    }
}

/// Spawn meshes for newly resolved layers, despawn removed ones and apply
/// visibility and tile textures.
pub fn sync_terrain_entities(
    mut commands: Commands,
    layers: Res<TerrainLayers>,
    mut textures: ResMut<LayerTextures>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut existing: Query<(
        Entity,
        &TerrainLayerEntity,
        &mut Visibility,
        &MeshMaterial3d<StandardMaterial>,
    )>,
) {
    if !layers.is_changed() && !textures.is_changed() {
        return;
    }

    if textures.0.keys().any(|id| layers.get(*id).is_none()) {
        textures.0.retain(|id, _| layers.get(*id).is_some());
    }

    let mut spawned = Vec::new();
    for (entity, tag, mut visibility, material) in &mut existing {
        match layers.get(tag.0) {
            Some(layer) if layer.geometry.is_some() => {
                spawned.push(tag.0);
                *visibility = if layer.visible {
                    Visibility::Inherited
                } else {
                    Visibility::Hidden
                };
                let texture = textures.0.get(&layer.id).cloned();
                let stale = materials
                    .get(&material.0)
                    .is_some_and(|current| current.base_color_texture != texture);
                if stale {
                    if let Some(current) = materials.get_mut(&material.0) {
                        *current = layer_material(layer.kind, texture);
                    }
                }
            }
            _ => {
                debug!("Despawning terrain entity for layer {}", tag.0);
                commands.entity(entity).despawn();
            }
        }
    }

    for layer in layers.iter() {
        let Some(geometry) = layer.geometry.as_ref() else {
            continue;
        };
        if spawned.contains(&layer.id) {
            continue;
        }

        let texture = textures.0.get(&layer.id).cloned();
        commands.spawn((
            Mesh3d(meshes.add(geometry.to_mesh())),
            MeshMaterial3d(materials.add(layer_material(layer.kind, texture))),
            Transform::from_matrix(Mat4::from(geometry.placement())),
            if layer.visible {
                Visibility::Inherited
            } else {
                Visibility::Hidden
            },
            TerrainLayerEntity(layer.id),
            Name::new(format!("terrain {}", layer.name)),
        ));
        info!("Spawned terrain mesh for layer {} '{}'", layer.id, layer.name);
    }
}
