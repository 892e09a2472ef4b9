/// Heightfield decoding and sampling for raster (GeoTIFF) terrain
use super::error::ImportError;
use crate::picking::ray::ray_aabb_span;
use bevy::prelude::*;
use image::imageops::FilterType;

/// Regular grid of heights centred on the origin in local space.
///
/// Columns run along X, rows along Z. Heights are in world units with the
/// lowest sample at y = 0.
#[derive(Debug, Clone)]
pub struct Heightfield {
    pub columns: u32,
    pub rows: u32,
    pub heights: Vec<f32>,
    /// Local width along X; depth follows the raster aspect ratio.
    pub width: f32,
    pub depth: f32,
    pub relief: f32,
}

/// Decode raster bytes into a heightfield, decimating large images.
///
/// Sample values are normalised to the raster's own min/max range and then
/// scaled by `relief`, so integer and float rasters behave the same.
pub fn decode_raster(
    bytes: &[u8],
    max_resolution: u32,
    relief: f32,
    extent: f32,
) -> Result<Heightfield, ImportError> {
    let mut image = image::load_from_memory(bytes)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(ImportError::EmptyRaster);
    }
    if image.width() > max_resolution || image.height() > max_resolution {
        image = image.resize(max_resolution, max_resolution, FilterType::Triangle);
    }

    let luma = image.to_luma32f();
    let (columns, rows) = luma.dimensions();
    let samples: Vec<f32> = luma.pixels().map(|p| p.0[0]).collect();
    Heightfield::from_samples(columns, rows, &samples, relief, extent)
}

impl Heightfield {
    pub fn from_samples(
        columns: u32,
        rows: u32,
        samples: &[f32],
        relief: f32,
        extent: f32,
    ) -> Result<Self, ImportError> {
        if columns < 2 || rows < 2 || samples.len() != (columns * rows) as usize {
            return Err(ImportError::EmptyRaster);
        }

        let (lo, hi) = samples
            .iter()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        let range = hi - lo;

        let heights = samples
            .iter()
            .map(|v| {
                if !v.is_finite() || !range.is_finite() || range <= f32::EPSILON {
                    0.0
                } else {
                    (v - lo) / range * relief
                }
            })
            .collect();

        Ok(Self {
            columns,
            rows,
            heights,
            width: extent,
            depth: extent * (rows - 1) as f32 / (columns - 1) as f32,
            relief,
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.width / (self.columns - 1) as f32
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(-self.width * 0.5, 0.0, -self.depth * 0.5)
    }

    pub fn max(&self) -> Vec3 {
        let top = self.heights.iter().copied().fold(0.0f32, f32::max);
        Vec3::new(self.width * 0.5, top, self.depth * 0.5)
    }

    /// Local position of grid sample (column, row).
    pub fn sample_position(&self, column: u32, row: u32) -> Vec3 {
        let min = self.min();
        Vec3::new(
            min.x + column as f32 * self.cell_size(),
            self.heights[(row * self.columns + column) as usize],
            min.z + row as f32 * self.cell_size(),
        )
    }

    /// Bilinear height at local (x, z); None outside the grid.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        let min = self.min();
        let gx = (x - min.x) / self.cell_size();
        let gz = (z - min.z) / self.cell_size();
        let max_x = (self.columns - 1) as f32;
        let max_z = (self.rows - 1) as f32;
        if !(0.0..=max_x).contains(&gx) || !(0.0..=max_z).contains(&gz) {
            return None;
        }

        let x0 = (gx.floor() as u32).min(self.columns - 2);
        let z0 = (gz.floor() as u32).min(self.rows - 2);
        let wx = gx - x0 as f32;
        let wz = gz - z0 as f32;

        let h = |c: u32, r: u32| self.heights[(r * self.columns + c) as usize];
        let h_top = h(x0, z0) * (1.0 - wx) + h(x0 + 1, z0) * wx;
        let h_bottom = h(x0, z0 + 1) * (1.0 - wx) + h(x0 + 1, z0 + 1) * wx;
        Some(h_top * (1.0 - wz) + h_bottom * wz)
    }

    /// March the ray through the grid bounds, then refine the crossing with
    /// a binary search.
    pub fn ray_hit_t(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        let (enter, exit) = ray_aabb_span(origin, dir, self.min(), self.max())?;
        let speed = dir.length();
        if speed <= f32::EPSILON {
            return None;
        }

        let step = (self.cell_size() * 0.5) / speed;
        let mut t = enter.max(0.0);
        let mut last_above: Option<f32> = None;

        while t <= exit + step {
            let t_clamped = t.min(exit);
            let p = origin + dir * t_clamped;
            if let Some(ground) = self.height_at(p.x, p.z) {
                if p.y <= ground {
                    return Some(match last_above {
                        Some(above) => self.refine(origin, dir, above, t_clamped, 12),
                        None => t_clamped,
                    });
                }
                last_above = Some(t_clamped);
            }
            if t_clamped >= exit {
                break;
            }
            t += step;
        }

        None
    }

    fn refine(&self, origin: Vec3, dir: Vec3, mut low: f32, mut high: f32, iterations: usize) -> f32 {
        for _ in 0..iterations {
            let mid = (low + high) * 0.5;
            let p = origin + dir * mid;
            match self.height_at(p.x, p.z) {
                Some(ground) if p.y > ground => low = mid,
                _ => high = mid,
            }
        }
        high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Heightfield {
        // 3x3 grid rising along X: 0, 0.5, 1.
        let samples = [0.0, 0.5, 1.0, 0.0, 0.5, 1.0, 0.0, 0.5, 1.0];
        Heightfield::from_samples(3, 3, &samples, 2.0, 4.0).unwrap()
    }

    #[test]
    fn normalises_to_relief() {
        let field = ramp();
        assert_eq!(field.heights[2], 2.0);
        assert_eq!(field.heights[0], 0.0);
        assert_eq!(field.depth, 4.0);
        assert_eq!(field.cell_size(), 2.0);
    }

    #[test]
    fn bilinear_height_between_samples() {
        let field = ramp();
        // Local x = -1 is halfway between the first two columns.
        let h = field.height_at(-1.0, 0.0).unwrap();
        assert!((h - 0.5).abs() < 1e-6);
        assert_eq!(field.height_at(5.0, 0.0), None);
    }

    #[test]
    fn vertical_ray_hits_surface() {
        let field = ramp();
        let t = field.ray_hit_t(Vec3::new(2.0, 10.0, 0.0), Vec3::NEG_Y).unwrap();
        let hit = Vec3::new(2.0, 10.0, 0.0) + Vec3::NEG_Y * t;
        assert!((hit.y - 2.0).abs() < 1e-3);
    }

    #[test]
    fn oblique_ray_refines_crossing() {
        let field = ramp();
        let origin = Vec3::new(-2.0, 3.0, 0.0);
        let dir = Vec3::new(1.0, -0.5, 0.0);
        let t = field.ray_hit_t(origin, dir).unwrap();
        let hit = origin + dir * t;
        let ground = field.height_at(hit.x, hit.z).unwrap();
        assert!((hit.y - ground).abs() < 1e-2);
    }

    #[test]
    fn flat_rasters_are_level() {
        let field = Heightfield::from_samples(2, 2, &[7.0; 4], 1.0, 1.0).unwrap();
        assert!(field.heights.iter().all(|h| *h == 0.0));
        assert!(Heightfield::from_samples(1, 1, &[0.0], 1.0, 1.0).is_err());
    }
}
