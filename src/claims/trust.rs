//! Per-claim permission records: lookups, grants and the trust list.

use std::collections::BTreeMap;

use chrono::Utc;
use log::debug;
use thiserror::Error;

use crate::claims::engine::ClaimEngine;
use crate::claims::errors::ClaimError;
use crate::claims::permission::{ClaimPermission, PermissionLevel};
use crate::claims::types::{ClaimKey, Location, PermissionKey, PlayerId, PUBLIC_PLAYER};

/// Why a trust command was refused.
#[derive(Debug, Error)]
pub enum TrustError {
    #[error("no claim at this location")]
    NoClaim,
    #[error("not allowed to grant {0} on this claim")]
    NotPermitted(PermissionLevel),
    #[error("unknown player {0}")]
    UnknownRecipient(PlayerId),
    #[error("{0} is not an access tier")]
    InvalidTier(PermissionLevel),
    #[error(transparent)]
    Store(#[from] ClaimError),
}

impl ClaimEngine {
    /// Explicit record first, then the public record, else deny.
    pub fn allows(&self, claim: ClaimKey, player: PlayerId, level: PermissionLevel) -> bool {
        self.caches
            .permissions
            .get(claim, player)
            .or_else(|| self.caches.permissions.get(claim, PUBLIC_PLAYER))
            .map(|record| record.allows(level))
            .unwrap_or(false)
    }

    /// Insert or update the (claim, player) record.
    pub fn set_permission(
        &mut self,
        claim: ClaimKey,
        player: PlayerId,
        level: PermissionLevel,
    ) -> Result<(), ClaimError> {
        if !self.claim(claim).map(|c| c.is_active()).unwrap_or(false) {
            return Err(ClaimError::NotFound(format!("claim: {claim}")));
        }
        let record = match self.caches.permissions.get(claim, player) {
            Some(existing) => {
                let mut record = existing.clone();
                record.level = level;
                record.modified_at = Utc::now();
                record
            }
            None => {
                let mut record = ClaimPermission::new(claim, player, level);
                record.key = Some(self.store.next_permission_key()?);
                record
            }
        };
        let persisted = record.clone();
        let superseded = self.caches.permissions.put(record);
        self.writer.dispatch(
            "permission write",
            move |store| store.put_permission(&persisted),
            |_| {},
        );
        if let Some(stale) = superseded {
            self.dispatch_permission_removal(vec![stale]);
        }
        debug!("claim {claim}: {player} set to {level}");
        Ok(())
    }

    /// Add the grant bit to the player's record, creating a bare grant
    /// record when none exists.
    pub fn add_grant(&mut self, claim: ClaimKey, player: PlayerId) -> Result<(), ClaimError> {
        let level = self
            .caches
            .permissions
            .get(claim, player)
            .map(|record| record.level.add_grant())
            .unwrap_or(PermissionLevel::Grant);
        self.set_permission(claim, player, level)
    }

    /// Returns false when the player had no record.
    pub fn remove_player_permission(&mut self, claim: ClaimKey, player: PlayerId) -> bool {
        let Some(key) = self.caches.permissions.get(claim, player).and_then(|r| r.key) else {
            return false;
        };
        self.dispatch_permission_removal(vec![key]);
        true
    }

    /// Drop every record on `claim`; returns how many were removed.
    pub fn remove_all_permissions(&mut self, claim: ClaimKey) -> usize {
        let keys: Vec<PermissionKey> = self
            .caches
            .permissions
            .for_claim(claim)
            .into_iter()
            .filter_map(|record| record.key)
            .collect();
        let count = keys.len();
        if count > 0 {
            self.dispatch_permission_removal(keys);
        }
        count
    }

    fn dispatch_permission_removal(&mut self, keys: Vec<PermissionKey>) {
        for key in &keys {
            self.caches.permissions.remove(*key);
        }
        self.writer.dispatch(
            "permission delete",
            move |store| store.delete_permissions(&keys),
            |_| {},
        );
    }

    /// Player names on a claim grouped by their level. The public subject
    /// is listed as `public`; unknown players by id.
    pub fn permission_map(&self, claim: ClaimKey) -> BTreeMap<PermissionLevel, Vec<String>> {
        let mut map: BTreeMap<PermissionLevel, Vec<String>> = BTreeMap::new();
        for record in self.caches.permissions.for_claim(claim) {
            let name = if record.player == PUBLIC_PLAYER {
                "public".to_string()
            } else {
                self.caches
                    .players
                    .get(record.player)
                    .map(|state| state.name.clone())
                    .unwrap_or_else(|| record.player.to_string())
            };
            map.entry(record.level).or_default().push(name);
        }
        for names in map.values_mut() {
            names.sort();
        }
        map
    }

    /// Trust `recipient` at `tier` on the claim at `location`.
    ///
    /// The actor must own the claim, be in admin mode, or hold grant for the
    /// tier. A recipient who already holds the grant bit keeps it.
    pub fn grant_trust(
        &mut self,
        actor: PlayerId,
        location: &Location,
        recipient: PlayerId,
        tier: PermissionLevel,
    ) -> Result<ClaimKey, TrustError> {
        if tier.has_grant() || tier == PermissionLevel::None {
            return Err(TrustError::InvalidTier(tier));
        }
        let claim = self.claim_at(location, true).ok_or(TrustError::NoClaim)?;
        let key = claim.key.ok_or(TrustError::NoClaim)?;
        let actor_is_owner = claim.is_owned_by(actor);
        let actor_admin = self.player(actor).map(|s| s.admin_mode).unwrap_or(false);
        let actor_can_grant = self
            .permission(key, actor)
            .map(|record| record.can_grant(tier))
            .unwrap_or(false);
        if !actor_admin && !actor_is_owner && !actor_can_grant {
            return Err(TrustError::NotPermitted(tier));
        }
        if recipient != PUBLIC_PLAYER && self.player(recipient).is_none() {
            return Err(TrustError::UnknownRecipient(recipient));
        }
        let level = match self.permission(key, recipient) {
            Some(existing) if existing.allows(PermissionLevel::Grant) => tier.add_grant(),
            _ => tier,
        };
        self.set_permission(key, recipient, level)?;
        Ok(key)
    }
}
