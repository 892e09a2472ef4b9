use super::mission::AssetKind;
use super::registry::{AssetId, PlacedAssetRegistry};
use crate::picking::ray::ray_hits_box;
use bevy::color::Srgba;
use bevy::prelude::*;
use constants::mission::HIT_BOX_SIZE;

/// An asset being dragged. `position` is the visual position, committed on release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub asset: AssetId,
    pub index: usize,
    pub kind: AssetKind,
    pub position: Vec3,
    /// Deployment that was armed when the drag began, resumed afterwards.
    pub resume: Option<AssetKind>,
}

impl DragState {
    /// Track the pointer; off-surface moves keep the last valid position.
    pub fn pointer_moved(&mut self, hit: Option<Vec3>) {
        if let Some(point) = hit {
            self.position = point;
        }
    }

    /// Write the visual position back to the registry.
    pub fn commit(&self, registry: &mut PlacedAssetRegistry) -> bool {
        registry.reposition(self.asset, self.position)
    }
}

/// Visual feedback tier for a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerTier {
    #[default]
    Normal,
    Hovered,
    Dragging,
}

impl MarkerTier {
    pub fn colour(&self, kind: AssetKind) -> Srgba {
        let colours = &kind.marker().colours;
        match self {
            Self::Normal => colours.normal,
            Self::Hovered => colours.hovered,
            Self::Dragging => colours.dragging,
        }
    }
}

/// Closest asset whose hit box the ray passes through.
pub fn asset_under_ray(ray: Ray3d, registry: &PlacedAssetRegistry) -> Option<(usize, AssetId)> {
    registry
        .iter()
        .enumerate()
        .filter_map(|(index, asset)| {
            ray_hits_box(ray.origin, *ray.direction, asset.position, HIT_BOX_SIZE)
                .map(|t| (t, index, asset.id))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, index, id)| (index, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_keeps_last_valid_position() {
        let mut registry = PlacedAssetRegistry::default();
        let (index, asset) = registry.append(AssetKind::Vehicles, Vec3::ZERO);
        let mut drag = DragState {
            asset,
            index,
            kind: AssetKind::Vehicles,
            position: Vec3::ZERO,
            resume: None,
        };

        drag.pointer_moved(Some(Vec3::new(2.0, 0.075, 1.0)));
        drag.pointer_moved(None);
        assert!(drag.commit(&mut registry));
        assert_eq!(registry.get(index).map(|a| a.position), Some(Vec3::new(2.0, 0.075, 1.0)));
    }

    #[test]
    fn hit_box_is_larger_than_marker() {
        let mut registry = PlacedAssetRegistry::default();
        registry.append(AssetKind::Troops, Vec3::new(0.0, 0.1, 0.0));
        let (_, far) = registry.append(AssetKind::Troops, Vec3::new(0.0, 0.1, -3.0));

        // Passes 0.05 to the side of the troop body (radius 0.025) but inside the hit box.
        let ray = Ray3d::new(Vec3::new(0.05, 0.1, 5.0), Dir3::NEG_Z);
        assert_eq!(asset_under_ray(ray, &registry).map(|(i, _)| i), Some(0));

        let ray = Ray3d::new(Vec3::new(0.0, 0.1, -10.0), Dir3::Z);
        assert_eq!(asset_under_ray(ray, &registry).map(|(_, id)| id), Some(far));

        let ray = Ray3d::new(Vec3::new(1.0, 0.1, 5.0), Dir3::NEG_Z);
        assert_eq!(asset_under_ray(ray, &registry), None);
    }

    #[test]
    fn tiers_pick_marker_colours() {
        let colours = AssetKind::Tanks.marker().colours;
        assert_eq!(MarkerTier::Normal.colour(AssetKind::Tanks), colours.normal);
        assert_eq!(MarkerTier::Dragging.colour(AssetKind::Tanks), colours.dragging);
    }
}
