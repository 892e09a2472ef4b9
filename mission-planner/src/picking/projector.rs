use super::ray::{ray_ground_plane_hit_t, ray_to_local};
use crate::terrain::layer::{LayerId, Pickable};
use bevy::prelude::*;
use constants::scene::GROUND_PLANE_SIZE;

/// Pointer ray for a camera; `None` until the camera has a viewport.
pub fn cursor_ray(cursor: Vec2, camera: &Camera, transform: &GlobalTransform) -> Option<Ray3d> {
    camera.viewport_to_world(transform, cursor).ok()
}

/// A raw intersection with the scene, before any vertical offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub point: Vec3,
    pub distance: f32,
    /// `None` when the fallback ground plane was hit.
    pub layer: Option<LayerId>,
}

/// Projects pointer rays onto terrain, falling back to an invisible ground plane.
#[derive(Resource, Debug, Clone, Copy)]
pub struct SurfaceProjector {
    pub ground_plane_size: f32,
    pub ground_height: f32,
}

impl Default for SurfaceProjector {
    fn default() -> Self {
        Self {
            ground_plane_size: GROUND_PLANE_SIZE,
            ground_height: 0.0,
        }
    }
}

impl SurfaceProjector {
    /// Nearest terrain hit, or the ground plane when there is no terrain or it is missed.
    pub fn intersect(&self, ray: Ray3d, pickables: &[Pickable<'_>]) -> Option<SurfaceHit> {
        let dir = *ray.direction;

        let terrain = pickables
            .iter()
            .filter_map(|pickable| {
                let (origin, local_dir) = ray_to_local(ray.origin, dir, &pickable.world_from_local);
                let t = pickable.geometry.ray_hit_t(origin, local_dir)?;
                Some(SurfaceHit {
                    point: ray.origin + dir * t,
                    distance: t,
                    layer: Some(pickable.layer),
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance));

        terrain.or_else(|| {
            let t = ray_ground_plane_hit_t(
                ray.origin,
                dir,
                self.ground_height,
                self.ground_plane_size * 0.5,
            )?;
            Some(SurfaceHit {
                point: ray.origin + dir * t,
                distance: t,
                layer: None,
            })
        })
    }

    /// Surface point lifted by `vertical_offset`, or `None` when nothing is under the pointer.
    pub fn project(&self, ray: Ray3d, pickables: &[Pickable<'_>], vertical_offset: f32) -> Option<Vec3> {
        self.intersect(ray, pickables)
            .map(|hit| hit.point + Vec3::Y * vertical_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::layer::TerrainLayers;

    #[test]
    fn ray_towards_origin_hits_ground_at_origin() {
        let origin = Vec3::new(0.0, 5.0, 10.0);
        let ray = Ray3d::new(origin, Dir3::new(-origin).unwrap());
        let projector = SurfaceProjector::default();
        let hit = projector.intersect(ray, &[]).unwrap();
        assert!(hit.point.length() < 1e-3, "hit {:?}", hit.point);
        assert_eq!(hit.layer, None);
    }

    #[test]
    fn sky_ray_misses() {
        let ray = Ray3d::new(Vec3::Y, Dir3::new(Vec3::new(0.0, 0.2, -1.0)).unwrap());
        assert_eq!(SurfaceProjector::default().project(ray, &[], 0.1), None);
    }

    #[test]
    fn ray_beyond_ground_plane_misses() {
        let ray = Ray3d::new(Vec3::new(0.0, 1.0, 0.0), Dir3::new(Vec3::new(0.0, -0.001, -1.0)).unwrap());
        assert_eq!(SurfaceProjector::default().intersect(ray, &[]), None);
    }

    #[test]
    fn cursor_ray_follows_the_camera() {
        let camera = Camera::default();
        let transform = GlobalTransform::from(Transform::from_xyz(0.0, 5.0, 0.0));
        // Without a computed viewport there is nothing to unproject against.
        assert_eq!(cursor_ray(Vec2::new(10.0, 10.0), &camera, &transform), None);
    }

    #[test]
    fn terrain_takes_precedence_and_offset_is_applied() {
        let mut layers = TerrainLayers::default();
        let id = layers
            .import("t.obj", b"v -4 2 -4\nv 4 2 -4\nv 4 2 4\nv -4 2 4\nf 1 2 3 4\n".to_vec())
            .unwrap();
        layers.resolve(id, "url".into()).unwrap();

        let ray = Ray3d::new(Vec3::new(0.5, 10.0, 0.5), Dir3::NEG_Y);
        let projector = SurfaceProjector::default();
        let pickables = layers.pickables();

        let hit = projector.intersect(ray, &pickables).unwrap();
        assert_eq!(hit.layer, Some(id));
        // Mesh is recentred to y = 0 and halved.
        let point = projector.project(ray, &pickables, 0.1).unwrap();
        assert!((point - Vec3::new(0.5, 0.1, 0.5)).length() < 1e-5);

        // Outside the terrain footprint the ground plane answers.
        let ray = Ray3d::new(Vec3::new(20.0, 10.0, 0.0), Dir3::NEG_Y);
        let hit = projector.intersect(ray, &pickables).unwrap();
        assert_eq!(hit.layer, None);
    }
}
