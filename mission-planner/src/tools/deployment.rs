use super::mission::{AssetKind, MissionCounts};
use super::registry::{AssetId, PlacedAssetRegistry};
use bevy::prelude::*;

/// Deployment sub-state while a kind is armed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeployState {
    /// Armed with nothing under the pointer; no preview is shown.
    Armed(AssetKind),
    /// Armed with a preview at the last projected surface point.
    Previewing(AssetKind, Vec3),
}

/// A committed placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub index: usize,
    pub id: AssetId,
    pub kind: AssetKind,
    pub position: Vec3,
    pub remaining: u32,
}

impl DeployState {
    /// Arm `kind` if any are left to deploy.
    pub fn arm(kind: AssetKind, counts: &MissionCounts) -> Option<Self> {
        (counts.remaining(kind) > 0).then_some(Self::Armed(kind))
    }

    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Armed(kind) | Self::Previewing(kind, _) => *kind,
        }
    }

    pub fn preview(&self) -> Option<Vec3> {
        match self {
            Self::Armed(_) => None,
            Self::Previewing(_, point) => Some(*point),
        }
    }

    /// Follow the pointer. A miss hides the preview.
    pub fn pointer_moved(self, hit: Option<Vec3>) -> Self {
        match hit {
            Some(point) => Self::Previewing(self.kind(), point),
            None => Self::Armed(self.kind()),
        }
    }

    /// Place one asset at the preview point.
    ///
    /// Returns the state to continue in (`None` once the kind is exhausted)
    /// and the placement, if one was made. Without a preview nothing is
    /// placed and no count changes.
    pub fn confirm(
        self,
        counts: &mut MissionCounts,
        registry: &mut PlacedAssetRegistry,
    ) -> (Option<Self>, Option<Placement>) {
        let Self::Previewing(kind, position) = self else {
            return (Some(self), None);
        };

        if counts.remaining(kind) == 0 {
            warn!("No {} left to deploy", kind);
            return (None, None);
        }

        let (index, id) = registry.append(kind, position);
        let remaining = counts.decrement(kind);
        let placement = Placement {
            index,
            id,
            kind,
            position,
            remaining,
        };

        let next = (remaining > 0).then_some(Self::Armed(kind));
        (next, Some(placement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::mission::CountSheet;

    fn counts(tanks: u32) -> MissionCounts {
        MissionCounts::from_sheet(&CountSheet {
            tanks,
            ..default()
        })
    }

    #[test]
    fn cannot_arm_exhausted_kind() {
        assert_eq!(DeployState::arm(AssetKind::Tanks, &counts(0)), None);
        assert_eq!(
            DeployState::arm(AssetKind::Tanks, &counts(1)),
            Some(DeployState::Armed(AssetKind::Tanks))
        );
    }

    #[test]
    fn pointer_miss_hides_preview() {
        let state = DeployState::Armed(AssetKind::Tanks).pointer_moved(Some(Vec3::ONE));
        assert_eq!(state.preview(), Some(Vec3::ONE));
        let state = state.pointer_moved(None);
        assert_eq!(state, DeployState::Armed(AssetKind::Tanks));
    }

    #[test]
    fn confirm_without_preview_places_nothing() {
        let mut counts = counts(2);
        let mut registry = PlacedAssetRegistry::default();
        let (next, placement) =
            DeployState::Armed(AssetKind::Tanks).confirm(&mut counts, &mut registry);
        assert_eq!(next, Some(DeployState::Armed(AssetKind::Tanks)));
        assert_eq!(placement, None);
        assert!(registry.is_empty());
        assert_eq!(counts.remaining(AssetKind::Tanks), 2);
    }

    #[test]
    fn last_unit_returns_to_idle() {
        let mut counts = counts(2);
        let mut registry = PlacedAssetRegistry::default();

        let state = DeployState::Armed(AssetKind::Tanks).pointer_moved(Some(Vec3::X));
        let (next, placement) = state.confirm(&mut counts, &mut registry);
        assert_eq!(next, Some(DeployState::Armed(AssetKind::Tanks)));
        assert_eq!(placement.map(|p| (p.index, p.remaining)), Some((0, 1)));

        let state = next.unwrap().pointer_moved(Some(Vec3::Z));
        let (next, placement) = state.confirm(&mut counts, &mut registry);
        assert_eq!(next, None);
        assert_eq!(placement.map(|p| p.position), Some(Vec3::Z));
        assert_eq!(registry.len(), 2);
        assert_eq!(counts.remaining(AssetKind::Tanks), 0);
    }
}
