use super::error::ImportError;
use super::layer::LayerKind;
use super::obj::parse_obj;
use super::raster::{Heightfield, decode_raster};
use crate::picking::ray::{ray_aabb_span, ray_triangle_hit_t};
use bevy::asset::RenderAssetUsages;
use bevy::math::Affine3A;
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use constants::scene::{MESH_TERRAIN_SCALE, RASTER_EXTENT, RASTER_MAX_RESOLUTION, RASTER_RELIEF};

/// Triangle soup read from a mesh file, in file coordinates.
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub min: Vec3,
    pub max: Vec3,
}

impl TerrainMesh {
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        let (min, max) = positions.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(min, max), p| (min.min(*p), max.max(*p)),
        );
        Self {
            positions,
            triangles,
            min,
            max,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Nearest triangle hit, with an AABB early-out.
    pub fn ray_hit_t(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        ray_aabb_span(origin, dir, self.min, self.max)?;

        self.triangles
            .iter()
            .filter_map(|[a, b, c]| {
                ray_triangle_hit_t(
                    origin,
                    dir,
                    self.positions[*a as usize],
                    self.positions[*b as usize],
                    self.positions[*c as usize],
                )
            })
            .min_by(|a, b| a.total_cmp(b))
    }
}

/// Decoded, pickable terrain in layer-local space.
#[derive(Debug, Clone)]
pub enum TerrainGeometry {
    Mesh(TerrainMesh),
    Raster(Heightfield),
}

impl TerrainGeometry {
    pub fn decode(kind: LayerKind, bytes: &[u8]) -> Result<Self, ImportError> {
        match kind {
            LayerKind::Mesh => {
                let text = std::str::from_utf8(bytes).map_err(|_| ImportError::InvalidUtf8)?;
                parse_obj(text).map(Self::Mesh)
            }
            LayerKind::Raster => {
                decode_raster(bytes, RASTER_MAX_RESOLUTION, RASTER_RELIEF, RASTER_EXTENT)
                    .map(Self::Raster)
            }
        }
    }

    /// Model transform placing the geometry in the scene.
    ///
    /// Meshes are recentred on their bounding box and scaled down; heightfields
    /// are already centred on the origin.
    pub fn placement(&self) -> Affine3A {
        match self {
            Self::Mesh(mesh) => {
                Affine3A::from_scale(Vec3::splat(MESH_TERRAIN_SCALE))
                    * Affine3A::from_translation(-mesh.center())
            }
            Self::Raster(_) => Affine3A::IDENTITY,
        }
    }

    /// Ray parameter of the nearest hit for a ray given in local space.
    pub fn ray_hit_t(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        match self {
            Self::Mesh(mesh) => mesh.ray_hit_t(origin, dir),
            Self::Raster(field) => field.ray_hit_t(origin, dir),
        }
    }

    pub fn triangle_count(&self) -> usize {
        match self {
            Self::Mesh(mesh) => mesh.triangles.len(),
            Self::Raster(field) => ((field.columns - 1) * (field.rows - 1) * 2) as usize,
        }
    }

    /// Build the render mesh. Raster terrain gets UVs so a tile texture can be draped over it.
    pub fn to_mesh(&self) -> Mesh {
        match self {
            Self::Mesh(mesh) => {
                let positions: Vec<[f32; 3]> = mesh.positions.iter().map(|p| p.to_array()).collect();
                let indices: Vec<u32> = mesh.triangles.iter().flatten().copied().collect();
                Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
                    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
                    .with_inserted_indices(Indices::U32(indices))
                    .with_computed_normals()
            }
            Self::Raster(field) => {
                let mut positions = Vec::with_capacity(field.heights.len());
                let mut uvs = Vec::with_capacity(field.heights.len());
                for row in 0..field.rows {
                    for column in 0..field.columns {
                        positions.push(field.sample_position(column, row).to_array());
                        uvs.push([
                            column as f32 / (field.columns - 1) as f32,
                            row as f32 / (field.rows - 1) as f32,
                        ]);
                    }
                }

                let mut indices = Vec::with_capacity(self.triangle_count() * 3);
                for row in 0..field.rows - 1 {
                    for column in 0..field.columns - 1 {
                        let i = row * field.columns + column;
                        let below = i + field.columns;
                        indices.extend_from_slice(&[i, below, i + 1, i + 1, below, below + 1]);
                    }
                }

                Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
                    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
                    .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
                    .with_inserted_indices(Indices::U32(indices))
                    .with_computed_normals()
            }
        }
    }
}
