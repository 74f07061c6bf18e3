//! Backend selection and datastore-to-datastore migration.
//!
//! Migration is a startup operation: it runs synchronously and must finish
//! before an engine is opened on the target.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::claims::errors::ClaimError;
use crate::claims::memory_store::MemoryClaimStore;
use crate::claims::storage::{ClaimStore, ClaimStoreBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sled,
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Sled => f.write_str("sled"),
            StoreBackend::Memory => f.write_str("memory"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sled" => Ok(StoreBackend::Sled),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ClaimError::InvalidArgument(format!(
                "unknown storage backend: {other}"
            ))),
        }
    }
}

/// Open a store of the given kind rooted at `data_dir` (ignored for memory).
/// With `flush_every_write` off, sled flushes on its own schedule and on
/// [`ClaimStore::flush`].
pub fn open_store(
    backend: StoreBackend,
    data_dir: impl AsRef<Path>,
    flush_every_write: bool,
) -> Result<Arc<dyn ClaimStore>, ClaimError> {
    match backend {
        StoreBackend::Sled => {
            let mut builder = ClaimStoreBuilder::new(data_dir.as_ref());
            if !flush_every_write {
                builder = builder.lazy_flush();
            }
            Ok(Arc::new(builder.open()?))
        }
        StoreBackend::Memory => {
            warn!("using the in-memory claim store; nothing will survive a restart");
            Ok(Arc::new(MemoryClaimStore::new()))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStats {
    pub claims: usize,
    pub permissions: usize,
    pub groups: usize,
    pub player_states: usize,
}

/// Copy every record from `from` into `to`, preserving keys. The target's id
/// counter is raised past the largest migrated key.
pub fn migrate(from: &dyn ClaimStore, to: &dyn ClaimStore) -> Result<MigrationStats, ClaimError> {
    info!(
        "migrating claim data from {} to {}",
        from.backend_name(),
        to.backend_name()
    );
    let mut stats = MigrationStats::default();
    let mut max_key = 0u64;

    for group in from.load_groups()? {
        max_key = max_key.max(group.key.map(|k| k.get()).unwrap_or(0));
        to.put_group(&group)?;
        stats.groups += 1;
    }
    for claim in from.load_claims()? {
        max_key = max_key.max(claim.key.map(|k| k.get()).unwrap_or(0));
        to.put_claim(&claim)?;
        stats.claims += 1;
    }
    for permission in from.load_permissions()? {
        max_key = max_key.max(permission.key.map(|k| k.get()).unwrap_or(0));
        to.put_permission(&permission)?;
        stats.permissions += 1;
    }
    for state in from.load_player_states()? {
        to.put_player_state(&state)?;
        stats.player_states += 1;
    }

    to.raise_id_floor(max_key)?;
    to.flush()?;
    info!(
        "migration complete: {} claims, {} permissions, {} groups, {} player states",
        stats.claims, stats.permissions, stats.groups, stats.player_states
    );
    Ok(stats)
}
