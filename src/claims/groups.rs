//! Claim groups: named buckets with a per-player ownership limit.
//!
//! Group records change rarely and are looked up by name from commands, so
//! they are updated in the cache at once and written behind.

use log::info;

use crate::claims::claim::Claim;
use crate::claims::engine::ClaimEngine;
use crate::claims::errors::ClaimError;
use crate::claims::group::{ClaimGroup, MAX_GROUP_NAME_LEN};
use crate::claims::types::{ClaimKey, GroupKey, PlayerId};

impl ClaimEngine {
    pub fn group(&self, key: GroupKey) -> Option<&ClaimGroup> {
        self.caches.groups.get(key)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&ClaimGroup> {
        self.caches.groups.by_name(name)
    }

    /// All groups sorted by name.
    pub fn groups(&self) -> Vec<&ClaimGroup> {
        let mut groups: Vec<&ClaimGroup> = self.caches.groups.iter().collect();
        groups.sort_by_key(|group| group.normalized_name());
        groups
    }

    /// Create a group; `limit` falls back to `claimgroup_default_limit`.
    pub fn create_group(&mut self, name: &str, limit: Option<u32>) -> Result<GroupKey, ClaimError> {
        self.check_group_name(name, None)?;
        let limit = limit.unwrap_or(self.settings.claimgroup_default_limit);
        if limit == 0 {
            return Err(ClaimError::InvalidArgument("group limit must be at least 1".into()));
        }
        let mut group = ClaimGroup::new(name.trim(), limit);
        let key = self.store.next_group_key()?;
        group.key = Some(key);
        self.put_group(group);
        info!("claim group '{}' created with limit {limit}", name.trim());
        Ok(key)
    }

    pub fn rename_group(&mut self, key: GroupKey, name: &str) -> Result<(), ClaimError> {
        self.check_group_name(name, Some(key))?;
        let mut group = self.require_group(key)?.clone();
        group.name = name.trim().to_string();
        self.put_group(group);
        Ok(())
    }

    pub fn set_group_limit(&mut self, key: GroupKey, limit: u32) -> Result<(), ClaimError> {
        if limit == 0 {
            return Err(ClaimError::InvalidArgument("group limit must be at least 1".into()));
        }
        let mut group = self.require_group(key)?.clone();
        group.claim_limit = limit;
        self.put_group(group);
        Ok(())
    }

    /// Delete the group and detach every claim that was in it.
    pub fn delete_group(&mut self, key: GroupKey) -> Result<usize, ClaimError> {
        let group = self.require_group(key)?.clone();
        let members: Vec<Claim> = self
            .caches
            .claims
            .iter()
            .filter(|claim| claim.is_active() && claim.group == Some(key))
            .cloned()
            .collect();
        let detached = members.len();
        for mut claim in members {
            claim.group = None;
            self.update_claim(claim)?;
        }
        self.caches.groups.remove(key);
        self.writer.dispatch(
            "claim group delete",
            move |store| store.delete_group(key),
            |_| {},
        );
        info!("claim group '{}' deleted; {detached} claims detached", group.name);
        Ok(detached)
    }

    /// Put a top-level claim (and its subclaims) into `group`, or take it
    /// out with `None`.
    pub fn assign_group(&mut self, claim: ClaimKey, group: Option<GroupKey>) -> Result<(), ClaimError> {
        let target = self
            .claim(claim)
            .filter(|c| c.is_active())
            .ok_or_else(|| ClaimError::NotFound(format!("claim: {claim}")))?;
        if target.is_subclaim() {
            return Err(ClaimError::InvalidArgument(
                "subclaims follow their parent's group".into(),
            ));
        }
        if let Some(group) = group {
            self.require_group(group)?;
        }
        let family: Vec<Claim> = self
            .caches
            .claims
            .family(claim)
            .into_iter()
            .filter(|c| c.is_active())
            .cloned()
            .collect();
        for mut member in family {
            member.group = group;
            self.update_claim(member)?;
        }
        Ok(())
    }

    /// Active top-level claims in `group` owned by `player`.
    pub fn player_group_count(&self, player: PlayerId, group: GroupKey) -> usize {
        self.caches
            .claims
            .by_owner(player)
            .into_iter()
            .filter(|claim| claim.is_active() && claim.is_top_level() && claim.group == Some(group))
            .count()
    }

    /// True when `player` already owns as many claims in the group as it
    /// allows. Unknown groups never limit.
    pub fn group_limit_reached(&self, player: PlayerId, group: GroupKey) -> bool {
        self.group(group)
            .map(|g| self.player_group_count(player, group) >= g.claim_limit as usize)
            .unwrap_or(false)
    }

    fn require_group(&self, key: GroupKey) -> Result<&ClaimGroup, ClaimError> {
        self.caches
            .groups
            .get(key)
            .ok_or_else(|| ClaimError::NotFound(format!("claim group: {key}")))
    }

    fn check_group_name(&self, name: &str, renaming: Option<GroupKey>) -> Result<(), ClaimError> {
        if !ClaimGroup::is_valid_name(name) {
            return Err(ClaimError::InvalidArgument(format!(
                "group names must be 1 to {MAX_GROUP_NAME_LEN} characters"
            )));
        }
        match self.caches.groups.by_name(name.trim()) {
            Some(existing) if existing.key != renaming => Err(ClaimError::InvalidArgument(format!(
                "group '{}' already exists",
                existing.name
            ))),
            _ => Ok(()),
        }
    }

    fn put_group(&mut self, group: ClaimGroup) {
        let record = group.clone();
        self.caches.groups.put(group);
        self.writer.dispatch(
            "claim group write",
            move |store| store.put_group(&record),
            |_| {},
        );
    }
}
