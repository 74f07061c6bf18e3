//! Durable record store behind the claim caches.
//!
//! Every call is blocking. The engine runs them on the persistence worker for
//! gameplay mutations and directly for startup loads and migration.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{de::DeserializeOwned, Serialize};
use sled::IVec;

use crate::claims::claim::Claim;
use crate::claims::errors::ClaimError;
use crate::claims::group::ClaimGroup;
use crate::claims::permission::ClaimPermission;
use crate::claims::player_state::PlayerState;
use crate::claims::types::{
    ClaimKey, GroupKey, PermissionKey, PlayerId, CLAIM_SCHEMA_VERSION, GROUP_SCHEMA_VERSION,
    PERMISSION_SCHEMA_VERSION, PLAYER_STATE_SCHEMA_VERSION,
};

const TREE_CLAIMS: &str = "claims";
const TREE_PERMISSIONS: &str = "claim_permissions";
const TREE_GROUPS: &str = "claim_groups";
const TREE_PLAYERS: &str = "player_states";
const TREE_META: &str = "meta";
const META_NEXT_ID: &[u8] = b"next_id";

/// Persistence contract the caches are mirrored from.
pub trait ClaimStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Allocate a fresh record id. Ids are shared across record kinds and
    /// never zero.
    fn next_id(&self) -> Result<u64, ClaimError>;

    /// Make sure future ids are strictly greater than `floor`.
    fn raise_id_floor(&self, floor: u64) -> Result<(), ClaimError>;

    fn load_claims(&self) -> Result<Vec<Claim>, ClaimError>;
    /// Insert or replace by key.
    fn put_claim(&self, claim: &Claim) -> Result<(), ClaimError>;
    /// Remove the claims and every permission record attached to them.
    fn delete_claims(&self, keys: &[ClaimKey]) -> Result<(), ClaimError>;

    fn load_permissions(&self) -> Result<Vec<ClaimPermission>, ClaimError>;
    fn put_permission(&self, permission: &ClaimPermission) -> Result<(), ClaimError>;
    fn delete_permissions(&self, keys: &[PermissionKey]) -> Result<(), ClaimError>;

    fn load_groups(&self) -> Result<Vec<ClaimGroup>, ClaimError>;
    fn put_group(&self, group: &ClaimGroup) -> Result<(), ClaimError>;
    fn delete_group(&self, key: GroupKey) -> Result<(), ClaimError>;

    fn load_player_states(&self) -> Result<Vec<PlayerState>, ClaimError>;
    fn put_player_state(&self, state: &PlayerState) -> Result<(), ClaimError>;

    fn flush(&self) -> Result<(), ClaimError>;

    fn next_claim_key(&self) -> Result<ClaimKey, ClaimError> {
        self.next_id().map(ClaimKey)
    }

    fn next_permission_key(&self) -> Result<PermissionKey, ClaimError> {
        self.next_id().map(PermissionKey)
    }

    fn next_group_key(&self) -> Result<GroupKey, ClaimError> {
        self.next_id().map(GroupKey)
    }
}

pub(crate) fn require_claim_key(claim: &Claim) -> Result<ClaimKey, ClaimError> {
    let key = claim.key.ok_or(ClaimError::MissingField {
        entity: "claim",
        field: "key",
    })?;
    if claim.world.is_empty() {
        return Err(ClaimError::MissingField {
            entity: "claim",
            field: "world",
        });
    }
    Ok(key)
}

pub(crate) fn require_permission_key(
    permission: &ClaimPermission,
) -> Result<PermissionKey, ClaimError> {
    permission.key.ok_or(ClaimError::MissingField {
        entity: "permission",
        field: "key",
    })
}

pub(crate) fn require_group_key(group: &ClaimGroup) -> Result<GroupKey, ClaimError> {
    group.key.ok_or(ClaimError::MissingField {
        entity: "group",
        field: "key",
    })
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct ClaimStoreBuilder {
    path: PathBuf,
    flush_every_write: bool,
}

impl ClaimStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flush_every_write: true,
        }
    }

    /// Leave flushing to sled's background thread and explicit `flush` calls.
    pub fn lazy_flush(mut self) -> Self {
        self.flush_every_write = false;
        self
    }

    pub fn open(self) -> Result<SledClaimStore, ClaimError> {
        SledClaimStore::open_with_options(self.path, self.flush_every_write)
    }
}

/// Sled-backed claim persistence.
pub struct SledClaimStore {
    _db: sled::Db,
    claims: sled::Tree,
    permissions: sled::Tree,
    groups: sled::Tree,
    players: sled::Tree,
    meta: sled::Tree,
    flush_every_write: bool,
}

impl SledClaimStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ClaimError> {
        Self::open_with_options(path, true)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, flush_every_write: bool) -> Result<Self, ClaimError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let store = Self {
            claims: db.open_tree(TREE_CLAIMS)?,
            permissions: db.open_tree(TREE_PERMISSIONS)?,
            groups: db.open_tree(TREE_GROUPS)?,
            players: db.open_tree(TREE_PLAYERS)?,
            meta: db.open_tree(TREE_META)?,
            _db: db,
            flush_every_write,
        };
        info!("opened sled claim store at {}", path_ref.display());
        Ok(store)
    }

    fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, ClaimError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: DeserializeOwned>(bytes: IVec) -> Result<T, ClaimError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    fn check_version(entity: &'static str, expected: u8, found: u8) -> Result<(), ClaimError> {
        if found != expected {
            return Err(ClaimError::SchemaMismatch {
                entity,
                expected,
                found,
            });
        }
        Ok(())
    }

    fn maybe_flush(&self, tree: &sled::Tree) -> Result<(), ClaimError> {
        if self.flush_every_write {
            tree.flush()?;
        }
        Ok(())
    }

    fn read_counter(value: Option<&[u8]>) -> u64 {
        value
            .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
            .map(u64::from_be_bytes)
            .unwrap_or(0)
    }

    fn scan_all<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>, ClaimError> {
        let mut out = Vec::new();
        for entry in tree.iter() {
            let (_, bytes) = entry?;
            out.push(Self::deserialize(bytes)?);
        }
        Ok(out)
    }
}

impl ClaimStore for SledClaimStore {
    fn backend_name(&self) -> &'static str {
        "sled"
    }

    fn next_id(&self) -> Result<u64, ClaimError> {
        let updated = self.meta.update_and_fetch(META_NEXT_ID, |old| {
            let next = Self::read_counter(old) + 1;
            Some(next.to_be_bytes().to_vec())
        })?;
        Ok(Self::read_counter(updated.as_deref()))
    }

    fn raise_id_floor(&self, floor: u64) -> Result<(), ClaimError> {
        self.meta.update_and_fetch(META_NEXT_ID, |old| {
            let current = Self::read_counter(old);
            Some(current.max(floor).to_be_bytes().to_vec())
        })?;
        self.meta.flush()?;
        Ok(())
    }

    fn load_claims(&self) -> Result<Vec<Claim>, ClaimError> {
        let claims: Vec<Claim> = Self::scan_all(&self.claims)?;
        for claim in &claims {
            Self::check_version("claim", CLAIM_SCHEMA_VERSION, claim.schema_version)?;
        }
        debug!("loaded {} claims from sled", claims.len());
        Ok(claims)
    }

    fn put_claim(&self, claim: &Claim) -> Result<(), ClaimError> {
        let key = require_claim_key(claim)?;
        let mut record = claim.clone();
        record.schema_version = CLAIM_SCHEMA_VERSION;
        self.claims
            .insert(key.to_be_bytes(), Self::serialize(&record)?)?;
        self.maybe_flush(&self.claims)
    }

    fn delete_claims(&self, keys: &[ClaimKey]) -> Result<(), ClaimError> {
        for key in keys {
            self.claims.remove(key.to_be_bytes())?;
        }
        let mut doomed = Vec::new();
        for entry in self.permissions.iter() {
            let (raw_key, bytes) = entry?;
            let record: ClaimPermission = Self::deserialize(bytes)?;
            if keys.contains(&record.claim) {
                doomed.push(raw_key);
            }
        }
        for raw_key in doomed {
            self.permissions.remove(raw_key)?;
        }
        self.maybe_flush(&self.claims)?;
        self.maybe_flush(&self.permissions)
    }

    fn load_permissions(&self) -> Result<Vec<ClaimPermission>, ClaimError> {
        let permissions: Vec<ClaimPermission> = Self::scan_all(&self.permissions)?;
        for permission in &permissions {
            Self::check_version(
                "permission",
                PERMISSION_SCHEMA_VERSION,
                permission.schema_version,
            )?;
        }
        Ok(permissions)
    }

    fn put_permission(&self, permission: &ClaimPermission) -> Result<(), ClaimError> {
        let key = require_permission_key(permission)?;
        let mut record = permission.clone();
        record.schema_version = PERMISSION_SCHEMA_VERSION;
        self.permissions
            .insert(key.to_be_bytes(), Self::serialize(&record)?)?;
        self.maybe_flush(&self.permissions)
    }

    fn delete_permissions(&self, keys: &[PermissionKey]) -> Result<(), ClaimError> {
        for key in keys {
            self.permissions.remove(key.to_be_bytes())?;
        }
        self.maybe_flush(&self.permissions)
    }

    fn load_groups(&self) -> Result<Vec<ClaimGroup>, ClaimError> {
        let groups: Vec<ClaimGroup> = Self::scan_all(&self.groups)?;
        for group in &groups {
            Self::check_version("group", GROUP_SCHEMA_VERSION, group.schema_version)?;
        }
        Ok(groups)
    }

    fn put_group(&self, group: &ClaimGroup) -> Result<(), ClaimError> {
        let key = require_group_key(group)?;
        let mut record = group.clone();
        record.schema_version = GROUP_SCHEMA_VERSION;
        self.groups
            .insert(key.to_be_bytes(), Self::serialize(&record)?)?;
        self.maybe_flush(&self.groups)
    }

    fn delete_group(&self, key: GroupKey) -> Result<(), ClaimError> {
        self.groups.remove(key.to_be_bytes())?;
        self.maybe_flush(&self.groups)
    }

    fn load_player_states(&self) -> Result<Vec<PlayerState>, ClaimError> {
        let states: Vec<PlayerState> = Self::scan_all(&self.players)?;
        for state in &states {
            Self::check_version(
                "player_state",
                PLAYER_STATE_SCHEMA_VERSION,
                state.schema_version,
            )?;
        }
        Ok(states)
    }

    fn put_player_state(&self, state: &PlayerState) -> Result<(), ClaimError> {
        let mut record = state.clone();
        record.schema_version = PLAYER_STATE_SCHEMA_VERSION;
        self.players
            .insert(state.id.as_bytes(), Self::serialize(&record)?)?;
        self.maybe_flush(&self.players)
    }

    fn flush(&self) -> Result<(), ClaimError> {
        for tree in [
            &self.claims,
            &self.permissions,
            &self.groups,
            &self.players,
            &self.meta,
        ] {
            tree.flush()?;
        }
        Ok(())
    }
}
