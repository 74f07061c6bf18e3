//! Access checks used by event hooks and by other plugins.

use log::debug;

use crate::claims::engine::ClaimEngine;
use crate::claims::permission::PermissionLevel;
use crate::claims::types::{ClaimKey, Location, PlayerId};

/// Result of a block break/place check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockDecision {
    Allowed,
    /// The owner dug below the floor; the family floor was lowered.
    AllowedAndExtended(ClaimKey),
    Denied(ClaimKey),
}

impl BlockDecision {
    pub fn is_allowed(self) -> bool {
        !matches!(self, BlockDecision::Denied(_))
    }
}

impl ClaimEngine {
    /// Unclaimed land and the claim owner always pass; everyone else needs
    /// `level` on the claim at `location` (height ignored).
    pub fn has_permission_at(&self, player: PlayerId, location: &Location, level: PermissionLevel) -> bool {
        let Some(claim) = self.claim_at(location, true) else {
            return true;
        };
        if claim.is_owned_by(player) {
            return true;
        }
        claim
            .key
            .map(|key| self.allows(key, player, level))
            .unwrap_or(false)
    }

    pub fn has_access(&self, player: PlayerId, location: &Location) -> bool {
        self.has_permission_at(player, location, PermissionLevel::Access)
    }

    pub fn has_container(&self, player: PlayerId, location: &Location) -> bool {
        self.has_permission_at(player, location, PermissionLevel::Container)
    }

    pub fn has_build(&self, player: PlayerId, location: &Location) -> bool {
        self.has_permission_at(player, location, PermissionLevel::Build)
    }

    pub fn has_grant(&self, player: PlayerId, location: &Location) -> bool {
        self.has_permission_at(player, location, PermissionLevel::Grant)
    }

    pub fn claim_owner_at(&self, location: &Location) -> Option<PlayerId> {
        self.claim_at(location, true).map(|claim| claim.owner)
    }

    /// Guard a block break or place at `location`.
    ///
    /// Height is observed. Below every floor, an owner digging under their
    /// own claim extends the family downward.
    pub fn check_block_change(&mut self, player: PlayerId, location: &Location) -> BlockDecision {
        let admin_mode = self.player(player).map(|s| s.admin_mode).unwrap_or(false);

        let hit = self
            .claim_at(location, false)
            .map(|claim| (claim.key, claim.owner));
        let Some((key, owner)) = hit else {
            let above = self
                .claim_at(location, true)
                .filter(|claim| claim.is_owned_by(player))
                .and_then(|claim| claim.key);
            if let Some(key) = above {
                match self.extend(key, location.y) {
                    Ok(_) => return BlockDecision::AllowedAndExtended(key),
                    Err(e) => debug!("could not extend claim {key}: {e}"),
                }
            }
            return BlockDecision::Allowed;
        };

        let Some(key) = key else {
            return BlockDecision::Allowed;
        };
        if admin_mode || owner == player || self.allows(key, player, PermissionLevel::Build) {
            BlockDecision::Allowed
        } else {
            BlockDecision::Denied(key)
        }
    }
}
