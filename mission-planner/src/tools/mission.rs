use bevy::prelude::*;
use constants::mission::{ASSET_MARKERS, AssetMarker};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deployable mission asset types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Troops,
    Arsenal,
    Vehicles,
    Tanks,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Troops,
        AssetKind::Arsenal,
        AssetKind::Vehicles,
        AssetKind::Tanks,
    ];

    /// Convert string identifier to asset kind for RPC compatibility.
    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "troops" => Some(Self::Troops),
            "arsenal" => Some(Self::Arsenal),
            "vehicles" => Some(Self::Vehicles),
            "tanks" => Some(Self::Tanks),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.marker().name
    }

    /// Position in `ASSET_MARKERS` and in count arrays.
    pub fn index(&self) -> usize {
        match self {
            Self::Troops => 0,
            Self::Arsenal => 1,
            Self::Vehicles => 2,
            Self::Tanks => 3,
        }
    }

    pub fn marker(&self) -> &'static AssetMarker {
        &ASSET_MARKERS[self.index()]
    }

    /// Vertical lift applied to surface hits so the marker base rests on the surface.
    pub fn surface_offset(&self) -> f32 {
        self.marker().surface_offset
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind counts as exchanged with the host and stored in presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSheet {
    #[serde(default)]
    pub troops: u32,
    #[serde(default)]
    pub arsenal: u32,
    #[serde(default)]
    pub vehicles: u32,
    #[serde(default)]
    pub tanks: u32,
}

impl CountSheet {
    pub fn get(&self, kind: AssetKind) -> u32 {
        match kind {
            AssetKind::Troops => self.troops,
            AssetKind::Arsenal => self.arsenal,
            AssetKind::Vehicles => self.vehicles,
            AssetKind::Tanks => self.tanks,
        }
    }

    pub fn set(&mut self, kind: AssetKind, value: u32) {
        match kind {
            AssetKind::Troops => self.troops = value,
            AssetKind::Arsenal => self.arsenal = value,
            AssetKind::Vehicles => self.vehicles = value,
            AssetKind::Tanks => self.tanks = value,
        }
    }

    pub fn total(&self) -> u32 {
        AssetKind::ALL.iter().map(|kind| self.get(*kind)).sum()
    }
}

/// Mission preset loaded from `assets/missions/*.mission.json`.
#[derive(Asset, TypePath, Debug, Clone, Deserialize)]
pub struct MissionPreset {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub counts: CountSheet,
}

/// Remaining and planned asset counts for the current mission.
///
/// `planned` is the last absolute value set by mission input; `remaining`
/// counts down as assets are deployed and never goes below zero.
#[derive(Resource, Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionCounts {
    remaining: [u32; 4],
    planned: [u32; 4],
}

impl MissionCounts {
    pub fn from_sheet(sheet: &CountSheet) -> Self {
        let mut counts = Self::default();
        counts.set(sheet);
        counts
    }

    /// Set absolute counts for every kind, replacing both planned and remaining.
    pub fn set(&mut self, sheet: &CountSheet) {
        for kind in AssetKind::ALL {
            self.remaining[kind.index()] = sheet.get(kind);
            self.planned[kind.index()] = sheet.get(kind);
        }
    }

    pub fn remaining(&self, kind: AssetKind) -> u32 {
        self.remaining[kind.index()]
    }

    pub fn planned(&self, kind: AssetKind) -> u32 {
        self.planned[kind.index()]
    }

    /// Take one unit of `kind`, returning what is left.
    pub fn decrement(&mut self, kind: AssetKind) -> u32 {
        let slot = &mut self.remaining[kind.index()];
        *slot = slot.saturating_sub(1);
        *slot
    }

    pub fn clear(&mut self) {
        self.remaining = [0; 4];
        self.planned = [0; 4];
    }

    pub fn remaining_sheet(&self) -> CountSheet {
        self.sheet(&self.remaining)
    }

    pub fn planned_sheet(&self) -> CountSheet {
        self.sheet(&self.planned)
    }

    fn sheet(&self, values: &[u32; 4]) -> CountSheet {
        let mut sheet = CountSheet::default();
        for kind in AssetKind::ALL {
            sheet.set(kind, values[kind.index()]);
        }
        sheet
    }
}
