//! In-memory mirrors of every store table.
//!
//! The caches are loaded in full at startup and are only ever mutated on the
//! simulation thread. Every mutation is applied here before its store write
//! is queued, so a read always sees the latest write. The one deferred step
//! is dropping deleted claims, which happens when the delete commits.

use std::collections::{BTreeSet, HashMap};

use log::{debug, warn};

use crate::claims::claim::Claim;
use crate::claims::errors::ClaimError;
use crate::claims::group::ClaimGroup;
use crate::claims::permission::ClaimPermission;
use crate::claims::player_state::PlayerState;
use crate::claims::spatial::SpatialIndex;
use crate::claims::storage::ClaimStore;
use crate::claims::types::{ClaimKey, ClaimStatus, GroupKey, Location, PermissionKey, PlayerId};

/// Claims by key, indexed by owner, parent and footprint.
#[derive(Default)]
pub struct ClaimCache {
    claims: HashMap<ClaimKey, Claim>,
    by_owner: HashMap<PlayerId, BTreeSet<ClaimKey>>,
    children: HashMap<ClaimKey, BTreeSet<ClaimKey>>,
    spatial: SpatialIndex,
}

impl ClaimCache {
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn get(&self, key: ClaimKey) -> Option<&Claim> {
        self.claims.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.claims.values()
    }

    /// Insert or replace a claim. Claims without a key are refused.
    pub fn put(&mut self, claim: Claim) -> bool {
        let Some(key) = claim.key else {
            warn!("refusing to cache claim without key: {}", claim.describe());
            return false;
        };
        self.unindex(key);
        self.by_owner.entry(claim.owner).or_default().insert(key);
        if let Some(parent) = claim.parent {
            self.children.entry(parent).or_default().insert(key);
        }
        self.spatial.insert(&claim);
        self.claims.insert(key, claim);
        true
    }

    pub fn remove(&mut self, key: ClaimKey) -> Option<Claim> {
        self.unindex(key);
        let removed = self.claims.remove(&key);
        if removed.is_some() {
            debug!("flushed claim {key} from cache");
        }
        removed
    }

    fn unindex(&mut self, key: ClaimKey) {
        let Some(old) = self.claims.get(&key) else {
            return;
        };
        if let Some(keys) = self.by_owner.get_mut(&old.owner) {
            keys.remove(&key);
            if keys.is_empty() {
                self.by_owner.remove(&old.owner);
            }
        }
        if let Some(parent) = old.parent {
            if let Some(keys) = self.children.get_mut(&parent) {
                keys.remove(&key);
                if keys.is_empty() {
                    self.children.remove(&parent);
                }
            }
        }
        self.spatial.remove(old);
    }

    pub fn set_status(&mut self, key: ClaimKey, status: ClaimStatus) {
        if let Some(claim) = self.claims.get_mut(&key) {
            claim.status = status;
        }
    }

    /// The active claim at `location`. A containing subclaim always wins over
    /// its top-level claim.
    pub fn claim_at(&self, location: &Location, ignore_height: bool) -> Option<&Claim> {
        let matches = |key: &ClaimKey| {
            self.claims
                .get(key)
                .filter(|claim| claim.is_active() && claim.contains(location, ignore_height))
        };
        self.spatial
            .subclaims_at(&location.world, location.x, location.z)
            .iter()
            .find_map(matches)
            .or_else(|| {
                self.spatial
                    .top_level_at(&location.world, location.x, location.z)
                    .iter()
                    .find_map(matches)
            })
    }

    pub fn by_owner(&self, owner: PlayerId) -> Vec<&Claim> {
        self.by_owner
            .get(&owner)
            .map(|keys| keys.iter().filter_map(|key| self.claims.get(key)).collect())
            .unwrap_or_default()
    }

    /// Active top-level claims owned by `owner`.
    pub fn owned_top_level_count(&self, owner: PlayerId) -> usize {
        self.by_owner(owner)
            .into_iter()
            .filter(|claim| claim.is_top_level() && claim.is_active())
            .count()
    }

    pub fn children_of(&self, parent: ClaimKey) -> Vec<&Claim> {
        self.children
            .get(&parent)
            .map(|keys| keys.iter().filter_map(|key| self.claims.get(key)).collect())
            .unwrap_or_default()
    }

    pub fn top_level(&self) -> impl Iterator<Item = &Claim> {
        self.claims.values().filter(|claim| claim.is_top_level())
    }

    /// Active top-level claims overlapping `candidate`, excluding its own key.
    pub fn top_level_overlapping(&self, candidate: &Claim) -> Vec<&Claim> {
        self.spatial
            .top_level_intersecting(candidate)
            .into_iter()
            .filter(|key| Some(*key) != candidate.key)
            .filter_map(|key| self.claims.get(&key))
            .filter(|claim| claim.is_active() && claim.overlaps(candidate))
            .collect()
    }

    /// The claim and all of its children, parent first.
    pub fn family(&self, key: ClaimKey) -> Vec<&Claim> {
        let mut family: Vec<&Claim> = self.claims.get(&key).into_iter().collect();
        family.extend(self.children_of(key));
        family
    }
}

/// Permission records by key, by claim and by (claim, player).
#[derive(Default)]
pub struct PermissionCache {
    records: HashMap<PermissionKey, ClaimPermission>,
    by_claim: HashMap<ClaimKey, BTreeSet<PermissionKey>>,
    by_pair: HashMap<(ClaimKey, PlayerId), PermissionKey>,
}

impl PermissionCache {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, claim: ClaimKey, player: PlayerId) -> Option<&ClaimPermission> {
        self.by_pair
            .get(&(claim, player))
            .and_then(|key| self.records.get(key))
    }

    pub fn by_key(&self, key: PermissionKey) -> Option<&ClaimPermission> {
        self.records.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClaimPermission> {
        self.records.values()
    }

    pub fn for_claim(&self, claim: ClaimKey) -> Vec<&ClaimPermission> {
        self.by_claim
            .get(&claim)
            .map(|keys| keys.iter().filter_map(|key| self.records.get(key)).collect())
            .unwrap_or_default()
    }

    /// Insert or replace a record. Returns the key of an older record for the
    /// same (claim, player) pair that this one displaced; the caller must
    /// delete it from the store.
    pub fn put(&mut self, permission: ClaimPermission) -> Option<PermissionKey> {
        let Some(key) = permission.key else {
            warn!(
                "refusing to cache permission without key for claim {}",
                permission.claim
            );
            return None;
        };
        let pair = (permission.claim, permission.player);
        let superseded = self
            .by_pair
            .get(&pair)
            .copied()
            .filter(|previous| *previous != key);
        if let Some(previous) = superseded {
            debug!("permission {key} supersedes {previous} for claim {}", pair.0);
            self.remove(previous);
        }
        self.remove(key);
        self.by_claim.entry(permission.claim).or_default().insert(key);
        self.by_pair.insert(pair, key);
        self.records.insert(key, permission);
        superseded
    }

    pub fn remove(&mut self, key: PermissionKey) -> Option<ClaimPermission> {
        let removed = self.records.remove(&key)?;
        if let Some(keys) = self.by_claim.get_mut(&removed.claim) {
            keys.remove(&key);
            if keys.is_empty() {
                self.by_claim.remove(&removed.claim);
            }
        }
        let pair = (removed.claim, removed.player);
        if self.by_pair.get(&pair) == Some(&key) {
            self.by_pair.remove(&pair);
        }
        Some(removed)
    }

    /// Drop every record attached to `claim`.
    pub fn remove_claim(&mut self, claim: ClaimKey) -> Vec<ClaimPermission> {
        let keys: Vec<PermissionKey> = self
            .by_claim
            .get(&claim)
            .map(|keys| keys.iter().copied().collect())
            .unwrap_or_default();
        keys.into_iter().filter_map(|key| self.remove(key)).collect()
    }
}

/// Claim groups by key and by case-folded name.
#[derive(Default)]
pub struct ClaimGroupCache {
    groups: HashMap<GroupKey, ClaimGroup>,
    by_name: HashMap<String, GroupKey>,
}

impl ClaimGroupCache {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: GroupKey) -> Option<&ClaimGroup> {
        self.groups.get(&key)
    }

    pub fn by_name(&self, name: &str) -> Option<&ClaimGroup> {
        self.by_name
            .get(&name.to_lowercase())
            .and_then(|key| self.groups.get(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClaimGroup> {
        self.groups.values()
    }

    pub fn put(&mut self, group: ClaimGroup) -> bool {
        let Some(key) = group.key else {
            warn!("refusing to cache claim group '{}' without key", group.name);
            return false;
        };
        self.remove(key);
        self.by_name.insert(group.normalized_name(), key);
        self.groups.insert(key, group);
        true
    }

    pub fn remove(&mut self, key: GroupKey) -> Option<ClaimGroup> {
        let removed = self.groups.remove(&key)?;
        let name = removed.normalized_name();
        if self.by_name.get(&name) == Some(&key) {
            self.by_name.remove(&name);
        }
        Some(removed)
    }
}

#[derive(Default)]
pub struct PlayerStateCache {
    states: HashMap<PlayerId, PlayerState>,
}

impl PlayerStateCache {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, id: PlayerId) -> Option<&PlayerState> {
        self.states.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.states.get_mut(&id)
    }

    pub fn put(&mut self, state: PlayerState) {
        self.states.insert(state.id, state);
    }

    pub fn get_or_insert_with<F>(&mut self, id: PlayerId, create: F) -> &mut PlayerState
    where
        F: FnOnce() -> PlayerState,
    {
        self.states.entry(id).or_insert_with(create)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerState> {
        self.states.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PlayerState> {
        self.states.values_mut()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&PlayerState> {
        self.states
            .values()
            .find(|state| state.name.eq_ignore_ascii_case(name))
    }
}

/// Everything the simulation thread reads during gameplay.
#[derive(Default)]
pub struct Caches {
    pub claims: ClaimCache,
    pub permissions: PermissionCache,
    pub groups: ClaimGroupCache,
    pub players: PlayerStateCache,
}

impl Caches {
    /// Blocking full load from the store.
    pub fn load(store: &dyn ClaimStore) -> Result<Self, ClaimError> {
        let mut caches = Caches::default();
        for claim in store.load_claims()? {
            caches.claims.put(claim);
        }
        let mut stale = Vec::new();
        for permission in store.load_permissions()? {
            stale.extend(caches.permissions.put(permission));
        }
        if !stale.is_empty() {
            warn!("dropping {} duplicate permission records", stale.len());
            store.delete_permissions(&stale)?;
        }
        for group in store.load_groups()? {
            caches.groups.put(group);
        }
        for state in store.load_player_states()? {
            caches.players.put(state);
        }
        debug!(
            "caches loaded: {} claims, {} permissions, {} groups, {} players",
            caches.claims.len(),
            caches.permissions.len(),
            caches.groups.len(),
            caches.players.len()
        );
        Ok(caches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::permission::PermissionLevel;
    use crate::claims::types::BlockPos;
    use uuid::Uuid;

    fn keyed(key: u64, owner: PlayerId, corners: (i32, i32, i32, i32), parent: Option<u64>) -> Claim {
        let (x1, z1, x2, z2) = corners;
        let mut claim = Claim::from_corners(
            "world",
            BlockPos::new(x1, 60, z1),
            BlockPos::new(x2, 60, z2),
            owner,
            256,
        );
        claim.key = Some(ClaimKey(key));
        claim.parent = parent.map(ClaimKey);
        claim
    }

    #[test]
    fn subclaim_wins_point_lookup() {
        let owner = Uuid::new_v4();
        let mut cache = ClaimCache::default();
        cache.put(keyed(1, owner, (0, 0, 20, 20), None));
        cache.put(keyed(2, owner, (5, 5, 8, 8), Some(1)));

        let inside_child = Location::new("world", 6, 70, 6);
        assert_eq!(cache.claim_at(&inside_child, false).and_then(|c| c.key), Some(ClaimKey(2)));
        let outside_child = Location::new("world", 15, 70, 15);
        assert_eq!(cache.claim_at(&outside_child, false).and_then(|c| c.key), Some(ClaimKey(1)));
        let below_floor = Location::new("world", 15, 10, 15);
        assert!(cache.claim_at(&below_floor, false).is_none());
        assert!(cache.claim_at(&below_floor, true).is_some());
    }

    #[test]
    fn pending_delete_claims_are_invisible_to_lookups() {
        let owner = Uuid::new_v4();
        let mut cache = ClaimCache::default();
        cache.put(keyed(1, owner, (0, 0, 20, 20), None));
        cache.set_status(ClaimKey(1), ClaimStatus::PendingDelete);
        assert!(cache.claim_at(&Location::new("world", 1, 70, 1), false).is_none());
        assert_eq!(cache.owned_top_level_count(owner), 0);
    }

    #[test]
    fn put_reindexes_owner_and_bounds() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut cache = ClaimCache::default();
        cache.put(keyed(1, alice, (0, 0, 10, 10), None));

        let mut moved = keyed(1, bob, (30, 30, 40, 40), None);
        moved.key = Some(ClaimKey(1));
        cache.put(moved);

        assert!(cache.by_owner(alice).is_empty());
        assert_eq!(cache.by_owner(bob).len(), 1);
        assert!(cache.claim_at(&Location::new("world", 5, 70, 5), true).is_none());
        assert!(cache.claim_at(&Location::new("world", 35, 70, 35), true).is_some());
    }

    #[test]
    fn children_follow_parent_index() {
        let owner = Uuid::new_v4();
        let mut cache = ClaimCache::default();
        cache.put(keyed(1, owner, (0, 0, 20, 20), None));
        cache.put(keyed(2, owner, (1, 1, 3, 3), Some(1)));
        cache.put(keyed(3, owner, (5, 5, 7, 7), Some(1)));
        assert_eq!(cache.children_of(ClaimKey(1)).len(), 2);
        assert_eq!(cache.family(ClaimKey(1)).len(), 3);
        cache.remove(ClaimKey(2));
        assert_eq!(cache.children_of(ClaimKey(1)).len(), 1);
    }

    #[test]
    fn claim_without_key_is_refused() {
        let mut cache = ClaimCache::default();
        let mut claim = keyed(1, Uuid::new_v4(), (0, 0, 1, 1), None);
        claim.key = None;
        assert!(!cache.put(claim));
        assert!(cache.is_empty());
    }

    #[test]
    fn permission_pair_lookup_and_claim_sweep() {
        let mut cache = PermissionCache::default();
        let player = Uuid::new_v4();
        let mut first = ClaimPermission::new(ClaimKey(1), player, PermissionLevel::Access);
        first.key = Some(PermissionKey(10));
        cache.put(first);
        let mut second = ClaimPermission::new(ClaimKey(1), Uuid::new_v4(), PermissionLevel::Build);
        second.key = Some(PermissionKey(11));
        cache.put(second);

        assert_eq!(
            cache.get(ClaimKey(1), player).map(|p| p.level),
            Some(PermissionLevel::Access)
        );
        assert_eq!(cache.for_claim(ClaimKey(1)).len(), 2);
        assert_eq!(cache.remove_claim(ClaimKey(1)).len(), 2);
        assert!(cache.get(ClaimKey(1), player).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn newer_record_for_same_pair_supersedes_older() {
        let mut cache = PermissionCache::default();
        let player = Uuid::new_v4();
        let mut first = ClaimPermission::new(ClaimKey(1), player, PermissionLevel::Access);
        first.key = Some(PermissionKey(10));
        cache.put(first);
        let mut second = ClaimPermission::new(ClaimKey(1), player, PermissionLevel::Build);
        second.key = Some(PermissionKey(12));
        assert_eq!(cache.put(second), Some(PermissionKey(10)));
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get(ClaimKey(1), player).map(|p| p.level),
            Some(PermissionLevel::Build)
        );
    }

    #[test]
    fn group_names_are_case_insensitive() {
        let mut cache = ClaimGroupCache::default();
        let mut group = ClaimGroup::new("Market", 2);
        group.key = Some(GroupKey(5));
        cache.put(group);
        assert!(cache.by_name("MARKET").is_some());
        let mut renamed = ClaimGroup::new("Bazaar", 2);
        renamed.key = Some(GroupKey(5));
        cache.put(renamed);
        assert!(cache.by_name("market").is_none());
        assert!(cache.by_name("bazaar").is_some());
    }
}
