//! The claim engine: caches, store, collaborators and the persistence worker
//! bundled into one context object owned by the simulation thread.
//!
//! Reads go straight to the caches. Mutations update the caches at once and
//! queue their store write on the persistence worker. Deleted claims leave
//! the caches when their delete commits, so call [`ClaimEngine::pump`] every
//! tick (or [`ClaimEngine::settle`] before reading the store directly).

use std::sync::Arc;

use log::{debug, info};

use crate::claims::cache::Caches;
use crate::claims::claim::Claim;
use crate::claims::collaborators::{
    EconomyService, HighlightStyle, NoRegionAdvisory, NoVisualizer, RegionAdvisory, Visualizer,
};
use crate::claims::errors::ClaimError;
use crate::claims::permission::ClaimPermission;
use crate::claims::persistence::WriteBehind;
use crate::claims::player_state::PlayerState;
use crate::claims::storage::ClaimStore;
use crate::claims::types::{ClaimKey, Location, PlayerId};
use crate::config::ClaimsConfig;

/// External services handed to the engine.
#[derive(Clone)]
pub struct Collaborators {
    pub region: Arc<dyn RegionAdvisory>,
    pub visualizer: Arc<dyn Visualizer>,
    /// Required only for claim sales and leases.
    pub economy: Option<Arc<dyn EconomyService>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            region: Arc::new(NoRegionAdvisory),
            visualizer: Arc::new(NoVisualizer),
            economy: None,
        }
    }
}

pub struct ClaimEngine {
    pub(crate) settings: ClaimsConfig,
    pub(crate) store: Arc<dyn ClaimStore>,
    pub(crate) caches: Caches,
    pub(crate) writer: WriteBehind,
    pub(crate) region: Arc<dyn RegionAdvisory>,
    pub(crate) visualizer: Arc<dyn Visualizer>,
    pub(crate) economy: Option<Arc<dyn EconomyService>>,
}

impl ClaimEngine {
    /// Load every cache from `store` (blocking) and start the persistence
    /// worker on the current tokio runtime.
    pub fn open(
        settings: ClaimsConfig,
        store: Arc<dyn ClaimStore>,
        collaborators: Collaborators,
    ) -> Result<Self, ClaimError> {
        settings
            .validate()
            .map_err(|e| ClaimError::InvalidArgument(e.to_string()))?;
        let caches = Caches::load(store.as_ref())?;
        store.raise_id_floor(highest_key(&caches))?;
        let writer = WriteBehind::spawn(Arc::clone(&store))?;
        info!(
            "claim engine ready on {} store: {} claims, {} players",
            store.backend_name(),
            caches.claims.len(),
            caches.players.len()
        );
        if !collaborators.region.is_present() {
            debug!("no region advisory; region checks are skipped");
        }
        Ok(Self {
            settings,
            store,
            caches,
            writer,
            region: collaborators.region,
            visualizer: collaborators.visualizer,
            economy: collaborators.economy,
        })
    }

    pub fn settings(&self) -> &ClaimsConfig {
        &self.settings
    }

    pub fn caches(&self) -> &Caches {
        &self.caches
    }

    pub fn store(&self) -> &Arc<dyn ClaimStore> {
        &self.store
    }

    /// Apply finished writes to the caches without blocking.
    pub fn pump(&mut self) -> usize {
        self.writer.pump(&mut self.caches)
    }

    /// Wait for every dispatched write and apply its cache commit.
    pub async fn settle(&mut self) {
        self.writer.settle(&mut self.caches).await;
    }

    /// Writes dispatched but not yet handed back by the worker.
    pub fn pending_writes(&self) -> usize {
        self.writer.pending()
    }

    /// Drain outstanding writes and flush the store.
    pub async fn shutdown(mut self) -> Result<(), ClaimError> {
        let pending = self.pending_writes();
        if pending > 0 {
            info!("draining {pending} pending writes");
        }
        self.settle().await;
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.flush())
            .await
            .map_err(|e| ClaimError::Internal(e.to_string()))??;
        info!("claim engine shut down");
        Ok(())
    }

    /// The region advisory forbids `player` building at `location`.
    pub(crate) fn region_forbids_location(&self, player: PlayerId, location: &Location) -> bool {
        self.region.is_present() && !self.region.can_build(player, location)
    }

    /// `claim` would cover a region `player` may not build in.
    pub(crate) fn region_forbids_claim(&self, player: PlayerId, claim: &Claim) -> bool {
        self.region.is_present() && self.region.overlaps_forbidden(player, claim)
    }

    pub fn claim(&self, key: ClaimKey) -> Option<&Claim> {
        self.caches.claims.get(key)
    }

    pub fn claim_at(&self, location: &Location, ignore_height: bool) -> Option<&Claim> {
        self.caches.claims.claim_at(location, ignore_height)
    }

    pub fn claims_by_owner(&self, owner: PlayerId) -> Vec<&Claim> {
        self.caches.claims.by_owner(owner)
    }

    pub fn children_of(&self, key: ClaimKey) -> Vec<&Claim> {
        self.caches.claims.children_of(key)
    }

    pub fn top_level_claims(&self) -> Vec<&Claim> {
        self.caches
            .claims
            .top_level()
            .filter(|claim| claim.is_active())
            .collect()
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.caches.players.get(id)
    }

    pub fn permission(&self, claim: ClaimKey, player: PlayerId) -> Option<&ClaimPermission> {
        self.caches.permissions.get(claim, player)
    }

    /// Render `claims` for `player`, replacing any preview already shown.
    pub(crate) fn show_preview(&mut self, player: PlayerId, claims: &[Claim], style: HighlightStyle) {
        self.revert_preview(player);
        let ttl = self.settings.preview_ttl();
        let handle = self.visualizer.show(player, claims, style, ttl);
        if let Some(state) = self.caches.players.get_mut(player) {
            state.visualization = handle;
        }
    }

    /// Show the start marker for a pending gesture.
    pub(crate) fn mark_start(&mut self, player: PlayerId, location: &Location) {
        self.revert_preview(player);
        let ttl = self.settings.preview_ttl();
        let handle = self.visualizer.mark(player, location, ttl);
        if let Some(state) = self.caches.players.get_mut(player) {
            state.visualization = handle;
        }
    }

    pub(crate) fn revert_preview(&mut self, player: PlayerId) {
        let handle = self
            .caches
            .players
            .get_mut(player)
            .and_then(|state| state.visualization.take());
        if let Some(handle) = handle {
            debug!("reverting preview {:?} for {}", handle, player);
            self.visualizer.revert(player, handle);
        }
    }
}

fn highest_key(caches: &Caches) -> u64 {
    let claims = caches.claims.iter().filter_map(|c| c.key).map(|k| k.get());
    let groups = caches.groups.iter().filter_map(|g| g.key).map(|k| k.get());
    let permissions = caches.permissions.iter().filter_map(|p| p.key).map(|k| k.get());
    claims.chain(groups).chain(permissions).max().unwrap_or(0)
}
