//! Non-durable store for ephemeral servers and as a migration target.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::claims::claim::Claim;
use crate::claims::errors::ClaimError;
use crate::claims::group::ClaimGroup;
use crate::claims::permission::ClaimPermission;
use crate::claims::player_state::PlayerState;
use crate::claims::storage::{
    require_claim_key, require_group_key, require_permission_key, ClaimStore,
};
use crate::claims::types::{ClaimKey, GroupKey, PermissionKey, PlayerId};

#[derive(Default)]
struct Tables {
    last_id: u64,
    claims: BTreeMap<ClaimKey, Claim>,
    permissions: BTreeMap<PermissionKey, ClaimPermission>,
    groups: BTreeMap<GroupKey, ClaimGroup>,
    players: BTreeMap<PlayerId, PlayerState>,
}

#[derive(Default)]
pub struct MemoryClaimStore {
    tables: Mutex<Tables>,
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClaimStore for MemoryClaimStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn next_id(&self) -> Result<u64, ClaimError> {
        let mut tables = self.tables.lock();
        tables.last_id += 1;
        Ok(tables.last_id)
    }

    fn raise_id_floor(&self, floor: u64) -> Result<(), ClaimError> {
        let mut tables = self.tables.lock();
        tables.last_id = tables.last_id.max(floor);
        Ok(())
    }

    fn load_claims(&self) -> Result<Vec<Claim>, ClaimError> {
        Ok(self.tables.lock().claims.values().cloned().collect())
    }

    fn put_claim(&self, claim: &Claim) -> Result<(), ClaimError> {
        let key = require_claim_key(claim)?;
        self.tables.lock().claims.insert(key, claim.clone());
        Ok(())
    }

    fn delete_claims(&self, keys: &[ClaimKey]) -> Result<(), ClaimError> {
        let mut tables = self.tables.lock();
        for key in keys {
            tables.claims.remove(key);
        }
        tables
            .permissions
            .retain(|_, permission| !keys.contains(&permission.claim));
        Ok(())
    }

    fn load_permissions(&self) -> Result<Vec<ClaimPermission>, ClaimError> {
        Ok(self.tables.lock().permissions.values().cloned().collect())
    }

    fn put_permission(&self, permission: &ClaimPermission) -> Result<(), ClaimError> {
        let key = require_permission_key(permission)?;
        self.tables.lock().permissions.insert(key, permission.clone());
        Ok(())
    }

    fn delete_permissions(&self, keys: &[PermissionKey]) -> Result<(), ClaimError> {
        let mut tables = self.tables.lock();
        for key in keys {
            tables.permissions.remove(key);
        }
        Ok(())
    }

    fn load_groups(&self) -> Result<Vec<ClaimGroup>, ClaimError> {
        Ok(self.tables.lock().groups.values().cloned().collect())
    }

    fn put_group(&self, group: &ClaimGroup) -> Result<(), ClaimError> {
        let key = require_group_key(group)?;
        self.tables.lock().groups.insert(key, group.clone());
        Ok(())
    }

    fn delete_group(&self, key: GroupKey) -> Result<(), ClaimError> {
        self.tables.lock().groups.remove(&key);
        Ok(())
    }

    fn load_player_states(&self) -> Result<Vec<PlayerState>, ClaimError> {
        Ok(self.tables.lock().players.values().cloned().collect())
    }

    fn put_player_state(&self, state: &PlayerState) -> Result<(), ClaimError> {
        self.tables.lock().players.insert(state.id, state.clone());
        Ok(())
    }

    fn flush(&self) -> Result<(), ClaimError> {
        Ok(())
    }
}
