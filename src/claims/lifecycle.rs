//! Claim factories and structural mutations.

use chrono::Utc;
use log::{debug, info, warn};

use crate::claims::claim::{Claim, ClaimResult};
use crate::claims::engine::ClaimEngine;
use crate::claims::errors::ClaimError;
use crate::claims::types::{ClaimKey, ClaimStatus, Location, PlayerId, ADMIN_OWNER};

/// What `abandon` did with the claim family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonOutcome {
    /// The family was deleted.
    Deleted,
    /// The family belongs to a claim group and was handed to the admin owner.
    Reclaimed,
}

impl ClaimEngine {
    /// Validate a new top-level claim between two corners. The candidate is
    /// not persisted. Overlap is checked against every active top-level claim
    /// in the world and all conflicts are reported.
    pub fn create_claim(&self, first: &Location, second: &Location, owner: PlayerId) -> ClaimResult {
        if !first.same_world(second) {
            return ClaimResult::WorldMismatch;
        }
        let mut candidate = Claim::from_corners(
            first.world.clone(),
            first.block(),
            second.block(),
            owner,
            self.settings.world_max_height,
        );
        candidate.lower.y = candidate.lower.y.saturating_sub(self.settings.auto_depth);

        let conflicts: Vec<Claim> = self
            .caches
            .claims
            .top_level_overlapping(&candidate)
            .into_iter()
            .cloned()
            .collect();
        if conflicts.is_empty() {
            ClaimResult::Success(candidate)
        } else {
            debug!(
                "candidate {} overlaps {} claims",
                candidate.describe(),
                conflicts.len()
            );
            ClaimResult::Overlap(conflicts)
        }
    }

    /// Validate a subclaim candidate inside `parent`. Only siblings are
    /// checked for overlap; containment in the parent is the caller's job.
    /// The candidate inherits the parent's owner; `parent` is left unset.
    pub fn create_subclaim(&self, first: &Location, second: &Location, parent: &Claim) -> ClaimResult {
        if !first.same_world(second) || first.world != parent.world {
            return ClaimResult::WorldMismatch;
        }
        let mut candidate = Claim::from_corners(
            first.world.clone(),
            first.block(),
            second.block(),
            parent.owner,
            self.settings.world_max_height,
        );
        candidate.lower.y = candidate.lower.y.saturating_sub(self.settings.auto_depth);
        candidate.group = parent.group;

        let conflicts: Vec<Claim> = parent
            .key
            .map(|key| self.caches.claims.children_of(key))
            .unwrap_or_default()
            .into_iter()
            .filter(|sibling| sibling.is_active() && sibling.overlaps(&candidate))
            .cloned()
            .collect();
        if conflicts.is_empty() {
            ClaimResult::Success(candidate)
        } else {
            ClaimResult::Overlap(conflicts)
        }
    }

    /// Assign a key, notify the region advisory and persist. The claim is
    /// cached at once and written behind.
    pub fn insert_claim(&mut self, claim: Claim) -> Result<ClaimKey, ClaimError> {
        let stored = self.insert_claim_record(claim)?;
        stored.key.ok_or(ClaimError::MissingField {
            entity: "claim",
            field: "key",
        })
    }

    /// Like [`ClaimEngine::insert_claim`], returning the keyed record.
    pub(crate) fn insert_claim_record(&mut self, claim: Claim) -> Result<Claim, ClaimError> {
        let claim = self.prepare_insert(claim)?;
        self.region.create_region(&claim);
        let record = claim.clone();
        self.caches.claims.put(claim.clone());
        self.writer
            .dispatch("claim insert", move |store| store.put_claim(&record), |_| {});
        info!("claim {} inserted: {}", claim.key.map(|k| k.get()).unwrap_or(0), claim.describe());
        Ok(claim)
    }

    /// Blocking insert for startup and administrative seeding.
    pub fn insert_claim_blocking(&mut self, claim: Claim) -> Result<ClaimKey, ClaimError> {
        let claim = self.prepare_insert(claim)?;
        let key = claim.key.ok_or(ClaimError::MissingField {
            entity: "claim",
            field: "key",
        })?;
        self.store.put_claim(&claim)?;
        self.region.create_region(&claim);
        self.caches.claims.put(claim);
        Ok(key)
    }

    fn prepare_insert(&self, mut claim: Claim) -> Result<Claim, ClaimError> {
        if claim.world.is_empty() {
            return Err(ClaimError::MissingField {
                entity: "claim",
                field: "world",
            });
        }
        if claim.key.is_some() {
            return Err(ClaimError::InvalidArgument(
                "claim already has a key; use update_claim".into(),
            ));
        }
        if let Some(parent) = claim.parent {
            match self.caches.claims.get(parent) {
                Some(p) if p.is_top_level() => {}
                _ => {
                    return Err(ClaimError::InvalidArgument(format!(
                        "parent {parent} is not a top-level claim"
                    )))
                }
            }
        }
        debug_assert!(claim.lower.x <= claim.upper.x && claim.lower.z <= claim.upper.z);
        let now = Utc::now();
        claim.key = Some(self.store.next_claim_key()?);
        claim.created_at = now;
        claim.modified_at = now;
        claim.status = ClaimStatus::Active;
        Ok(claim)
    }

    /// Persist changes to an existing claim and stamp its modified time.
    pub fn update_claim(&mut self, mut claim: Claim) -> Result<(), ClaimError> {
        let key = claim.key.ok_or(ClaimError::MissingField {
            entity: "claim",
            field: "key",
        })?;
        match self.caches.claims.get(key) {
            Some(existing) if existing.is_active() => {}
            Some(_) => {
                return Err(ClaimError::InvalidArgument(format!(
                    "claim {key} is pending delete"
                )))
            }
            None => return Err(ClaimError::NotFound(format!("claim: {key}"))),
        }
        claim.touch();
        claim.status = ClaimStatus::Active;
        self.region.sync_region(&claim);
        let record = claim.clone();
        self.caches.claims.put(claim);
        self.writer
            .dispatch("claim update", move |store| store.put_claim(&record), |_| {});
        debug!("claim {key} update dispatched");
        Ok(())
    }

    /// Delete a claim, its children and all their permission records. The
    /// family is hidden from lookups immediately.
    pub fn delete_claim(&mut self, key: ClaimKey) -> Result<Vec<ClaimKey>, ClaimError> {
        let family: Vec<Claim> = self
            .caches
            .claims
            .family(key)
            .into_iter()
            .filter(|claim| claim.is_active())
            .cloned()
            .collect();
        if family.is_empty() {
            return Err(ClaimError::NotFound(format!("claim: {key}")));
        }
        let keys: Vec<ClaimKey> = family.iter().filter_map(|claim| claim.key).collect();
        for claim in &family {
            if let Some(k) = claim.key {
                self.caches.claims.set_status(k, ClaimStatus::PendingDelete);
            }
            self.region.remove_region(claim);
        }
        let doomed = keys.clone();
        let flushed = keys.clone();
        self.writer.dispatch(
            "claim delete",
            move |store| store.delete_claims(&doomed),
            move |caches| {
                for key in flushed {
                    caches.claims.remove(key);
                    caches.permissions.remove_claim(key);
                }
            },
        );
        info!("claim {key} deleted with {} children", keys.len() - 1);
        Ok(keys)
    }

    /// Lower the floor of the whole family to `depth - auto_depth`. Floors
    /// already below that are left alone.
    pub fn extend(&mut self, key: ClaimKey, depth: i32) -> Result<usize, ClaimError> {
        let claim = self
            .caches
            .claims
            .get(key)
            .ok_or_else(|| ClaimError::NotFound(format!("claim: {key}")))?;
        let root = claim.family_root().unwrap_or(key);
        let new_y = depth.saturating_sub(self.settings.auto_depth);
        let lowered: Vec<Claim> = self
            .caches
            .claims
            .family(root)
            .into_iter()
            .filter(|claim| claim.is_active() && claim.lower.y > new_y)
            .cloned()
            .collect();
        let count = lowered.len();
        for mut claim in lowered {
            claim.lower.y = new_y;
            self.update_claim(claim)?;
        }
        if count > 0 {
            debug!("extended family of claim {root} down to y={new_y}");
        }
        Ok(count)
    }

    /// Give up a claim. The owner is credited with its area. Grouped claims
    /// are reclaimed by the admin owner with permissions stripped; others are
    /// deleted with their children.
    pub fn abandon(&mut self, key: ClaimKey) -> Result<AbandonOutcome, ClaimError> {
        let claim = self
            .caches
            .claims
            .get(key)
            .filter(|claim| claim.is_active())
            .cloned()
            .ok_or_else(|| ClaimError::NotFound(format!("claim: {key}")))?;

        let area = claim.area();
        let credited = self.mutate_player(claim.owner, |state| state.add_earned_blocks(area));
        if !credited && !claim.is_admin_claim() {
            warn!("abandoned claim {key} has no owner state to credit");
        }

        if claim.group.is_some() {
            self.reassign_family(key, ADMIN_OWNER)?;
            info!("claim {key} reclaimed by administrator");
            Ok(AbandonOutcome::Reclaimed)
        } else {
            self.delete_claim(key)?;
            Ok(AbandonOutcome::Deleted)
        }
    }

    /// Hand the claim and all of its children to `new_owner`, dropping every
    /// permission granted on them.
    pub fn transfer(&mut self, key: ClaimKey, new_owner: PlayerId) -> Result<(), ClaimError> {
        self.reassign_family(key, new_owner)?;
        info!("claim {key} transferred to {new_owner}");
        Ok(())
    }

    fn reassign_family(&mut self, key: ClaimKey, owner: PlayerId) -> Result<(), ClaimError> {
        let family: Vec<Claim> = self
            .caches
            .claims
            .family(key)
            .into_iter()
            .filter(|claim| claim.is_active())
            .cloned()
            .collect();
        if family.is_empty() {
            return Err(ClaimError::NotFound(format!("claim: {key}")));
        }
        for mut claim in family {
            if let Some(k) = claim.key {
                self.remove_all_permissions(k);
            }
            claim.owner = owner;
            self.update_claim(claim)?;
        }
        Ok(())
    }
}
