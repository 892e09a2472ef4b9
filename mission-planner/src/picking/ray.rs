use bevy::math::Affine3A;
use bevy::prelude::*;

/// Move a world-space ray into the local space of `world_from_local`.
///
/// The direction is not renormalised, so a parameter `t` found in local
/// space addresses the same point on the world ray.
pub fn ray_to_local(origin: Vec3, dir: Vec3, world_from_local: &Affine3A) -> (Vec3, Vec3) {
    let inv = world_from_local.inverse();
    (inv.transform_point3(origin), inv.transform_vector3(dir))
}

// Slab-method ray–AABB intersection, returns the entry and exit parameters
pub fn ray_aabb_span(ray_origin: Vec3, ray_direction: Vec3, min: Vec3, max: Vec3) -> Option<(f32, f32)> {
    let inv = Vec3::new(
        if ray_direction.x != 0.0 { 1.0 / ray_direction.x } else { f32::INFINITY },
        if ray_direction.y != 0.0 { 1.0 / ray_direction.y } else { f32::INFINITY },
        if ray_direction.z != 0.0 { 1.0 / ray_direction.z } else { f32::INFINITY },
    );

    let mut tmin = f32::NEG_INFINITY;
    let mut tmax = f32::INFINITY;
    for axis in 0..3 {
        if ray_direction[axis] == 0.0 {
            // Parallel to the slab: inside or a miss.
            if ray_origin[axis] < min[axis] || ray_origin[axis] > max[axis] {
                return None;
            }
            continue;
        }
        let (mut t0, mut t1) = (
            (min[axis] - ray_origin[axis]) * inv[axis],
            (max[axis] - ray_origin[axis]) * inv[axis],
        );
        if t0 > t1 { std::mem::swap(&mut t0, &mut t1); }
        tmin = tmin.max(t0);
        tmax = tmax.min(t1);
        if tmin > tmax { return None; }
    }

    if tmax < 0.0 { return None; }
    Some((tmin, tmax))
}

// Nearest non-negative hit against an AABB, Some(t) or None
pub fn ray_aabb_hit_t(ray_origin: Vec3, ray_direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let (tmin, tmax) = ray_aabb_span(ray_origin, ray_direction, min, max)?;
    Some(if tmin >= 0.0 { tmin } else { tmax })
}

/// Pick test against an axis-aligned box of `size` centred on `center`.
pub fn ray_hits_box(origin: Vec3, dir: Vec3, center: Vec3, size: Vec3) -> Option<f32> {
    let he = size * 0.5;
    ray_aabb_hit_t(origin, dir, center - he, center + he)
}

/// Möller–Trumbore ray–triangle intersection, double sided.
pub fn ray_triangle_hit_t(origin: Vec3, dir: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-10 {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    (t >= 0.0).then_some(t)
}

/// Hit against the finite horizontal square `|x|, |z| <= half_extent` at `plane_y`.
pub fn ray_ground_plane_hit_t(origin: Vec3, dir: Vec3, plane_y: f32, half_extent: f32) -> Option<f32> {
    if dir.y.abs() < 1e-6 {
        return None;
    }
    let t = (plane_y - origin.y) / dir.y;
    if t < 0.0 {
        return None;
    }
    let hit = origin + dir * t;
    (hit.x.abs() <= half_extent && hit.z.abs() <= half_extent).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_hit_from_outside_and_inside() {
        let t = ray_aabb_hit_t(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, Vec3::splat(-1.0), Vec3::ONE);
        assert_eq!(t, Some(4.0));

        // Origin inside the box reports the exit.
        let t = ray_aabb_hit_t(Vec3::ZERO, Vec3::Z, Vec3::splat(-1.0), Vec3::ONE);
        assert_eq!(t, Some(1.0));

        let miss = ray_aabb_hit_t(Vec3::new(3.0, 0.0, -5.0), Vec3::Z, Vec3::splat(-1.0), Vec3::ONE);
        assert_eq!(miss, None);
    }

    #[test]
    fn box_behind_the_ray_is_missed() {
        let t = ray_hits_box(Vec3::new(0.0, 0.0, 5.0), Vec3::Z, Vec3::ZERO, Vec3::ONE);
        assert_eq!(t, None);
    }

    #[test]
    fn triangle_hit_and_edges() {
        let (a, b, c) = (
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let t = ray_triangle_hit_t(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y, a, b, c).unwrap();
        assert!((t - 2.0).abs() < 1e-6);

        assert_eq!(ray_triangle_hit_t(Vec3::new(5.0, 2.0, 0.0), Vec3::NEG_Y, a, b, c), None);
        // Parallel ray.
        assert_eq!(ray_triangle_hit_t(Vec3::new(0.0, 0.0, -3.0), Vec3::Z, a, b, c), None);
    }

    #[test]
    fn ground_plane_is_finite() {
        let down = Vec3::NEG_Y;
        assert_eq!(ray_ground_plane_hit_t(Vec3::new(1.0, 3.0, 1.0), down, 0.0, 50.0), Some(3.0));
        assert_eq!(ray_ground_plane_hit_t(Vec3::new(60.0, 3.0, 0.0), down, 0.0, 50.0), None);
        assert_eq!(ray_ground_plane_hit_t(Vec3::new(0.0, 3.0, 0.0), Vec3::Y, 0.0, 50.0), None);
    }

    #[test]
    fn local_ray_keeps_world_parameter() {
        let xf = Affine3A::from_scale_rotation_translation(
            Vec3::splat(0.5),
            Quat::IDENTITY,
            Vec3::new(2.0, 0.0, 0.0),
        );
        let origin = Vec3::new(2.0, 4.0, 0.0);
        let (o, d) = ray_to_local(origin, Vec3::NEG_Y, &xf);
        // Local plane y = 0 maps to world y = 0.
        let t = -o.y / d.y;
        assert!((t - 4.0).abs() < 1e-5);
    }
}
