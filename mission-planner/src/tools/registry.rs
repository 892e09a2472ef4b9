use super::mission::AssetKind;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Stable identity of a placed asset, never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedAsset {
    pub id: AssetId,
    pub kind: AssetKind,
    /// Surface hit plus the kind's vertical offset.
    pub position: Vec3,
}

/// Ordered list of deployed assets.
///
/// Index order is insertion order and stays stable between frames; `AssetId`
/// is the identity used for repositioning.
#[derive(Resource, Debug, Default)]
pub struct PlacedAssetRegistry {
    assets: Vec<PlacedAsset>,
    next_id: u64,
}

impl PlacedAssetRegistry {
    /// Append a new asset; its index is the previous length.
    pub fn append(&mut self, kind: AssetKind, position: Vec3) -> (usize, AssetId) {
        let id = AssetId(self.next_id);
        self.next_id += 1;
        let index = self.assets.len();
        self.assets.push(PlacedAsset { id, kind, position });
        (index, id)
    }

    /// Replace the asset at `index`. Out of bounds is a no-op.
    pub fn replace_at(&mut self, index: usize, kind: AssetKind, position: Vec3) -> bool {
        let Some(slot) = self.assets.get_mut(index) else {
            debug!(
                "Ignoring replace at index {} (registry holds {})",
                index,
                self.assets.len()
            );
            return false;
        };
        slot.kind = kind;
        slot.position = position;
        true
    }

    /// Move the asset with `id`. Unknown ids (e.g. after a clear) are a no-op.
    pub fn reposition(&mut self, id: AssetId, position: Vec3) -> bool {
        match self.assets.iter_mut().find(|asset| asset.id == id) {
            Some(asset) => {
                asset.position = position;
                true
            }
            None => {
                debug!("Ignoring reposition of unknown asset {:?}", id);
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.assets.clear();
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PlacedAsset> {
        self.assets.get(index)
    }

    pub fn find(&self, id: AssetId) -> Option<(usize, &PlacedAsset)> {
        self.assets
            .iter()
            .enumerate()
            .find(|(_, asset)| asset.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlacedAsset> {
        self.assets.iter()
    }

    pub fn count_of(&self, kind: AssetKind) -> usize {
        self.assets.iter().filter(|asset| asset.kind == kind).count()
    }
}
