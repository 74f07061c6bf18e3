//! Services the engine calls out to but does not implement: a region
//! protection advisory, the claim preview renderer and an economy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::claims::claim::Claim;
use crate::claims::types::{Location, PlayerId};

/// Opaque id of a rendered preview, handed back for reverting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightStyle {
    Basic,
    Admin,
    Sub,
    /// Marker at the first click of a gesture.
    Start,
    Error,
    Delete,
}

impl HighlightStyle {
    pub fn for_claim(claim: &Claim) -> Self {
        if claim.is_subclaim() {
            HighlightStyle::Sub
        } else if claim.is_admin_claim() {
            HighlightStyle::Admin
        } else {
            HighlightStyle::Basic
        }
    }
}

/// External region protection service. Every method has a permissive default
/// so hosts without one can use [`NoRegionAdvisory`].
pub trait RegionAdvisory: Send + Sync {
    /// Whether the service is loaded. The build checks are skipped when not.
    fn is_present(&self) -> bool {
        false
    }

    fn create_region(&self, _claim: &Claim) {}

    fn sync_region(&self, _claim: &Claim) {}

    fn remove_region(&self, _claim: &Claim) {}

    /// Whether `player` may build at `location` according to the service.
    fn can_build(&self, _player: PlayerId, _location: &Location) -> bool {
        true
    }

    /// Whether `claim` would cover a region `player` may not build in.
    fn overlaps_forbidden(&self, _player: PlayerId, _claim: &Claim) -> bool {
        false
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoRegionAdvisory;

impl RegionAdvisory for NoRegionAdvisory {}

/// Renders claim borders to a single player. Previews expire on their own
/// after `ttl`; `revert` removes one early.
pub trait Visualizer: Send + Sync {
    fn show(
        &self,
        player: PlayerId,
        claims: &[Claim],
        style: HighlightStyle,
        ttl: Duration,
    ) -> Option<PreviewHandle>;

    fn mark(&self, player: PlayerId, location: &Location, ttl: Duration) -> Option<PreviewHandle>;

    fn revert(&self, player: PlayerId, handle: PreviewHandle);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoVisualizer;

impl Visualizer for NoVisualizer {
    fn show(&self, _: PlayerId, _: &[Claim], _: HighlightStyle, _: Duration) -> Option<PreviewHandle> {
        None
    }

    fn mark(&self, _: PlayerId, _: &Location, _: Duration) -> Option<PreviewHandle> {
        None
    }

    fn revert(&self, _: PlayerId, _: PreviewHandle) {}
}

/// Currency provider used by claim sales and leases.
pub trait EconomyService: Send + Sync {
    fn has(&self, player: PlayerId, amount: f64) -> bool;

    /// Returns false when the withdrawal was refused.
    fn withdraw(&self, player: PlayerId, amount: f64) -> bool;

    fn deposit(&self, player: PlayerId, amount: f64);
}
