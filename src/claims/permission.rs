//! Access tiers and the grant bit.
//!
//! Each level carries a numeric value (what is stored) and a cumulative mask.
//! A tier's mask covers every lower tier, so `Build` satisfies `Container`
//! and `Access` checks. The grant bit (64) is orthogonal to the tiers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claims::types::{ClaimKey, PermissionKey, PlayerId, PERMISSION_SCHEMA_VERSION};

const GRANT_BIT: u8 = 0b0100_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum PermissionLevel {
    #[default]
    None,
    Access,
    Container,
    Build,
    Grant,
    AccessGrant,
    ContainerGrant,
    BuildGrant,
}

impl PermissionLevel {
    pub const ALL: [PermissionLevel; 8] = [
        PermissionLevel::None,
        PermissionLevel::Access,
        PermissionLevel::Container,
        PermissionLevel::Build,
        PermissionLevel::Grant,
        PermissionLevel::AccessGrant,
        PermissionLevel::ContainerGrant,
        PermissionLevel::BuildGrant,
    ];

    /// Stored numeric value.
    pub const fn value(self) -> u8 {
        match self {
            PermissionLevel::None => 0,
            PermissionLevel::Access => 2,
            PermissionLevel::Container => 8,
            PermissionLevel::Build => 32,
            PermissionLevel::Grant => 64,
            PermissionLevel::AccessGrant => 66,
            PermissionLevel::ContainerGrant => 72,
            PermissionLevel::BuildGrant => 96,
        }
    }

    /// Cumulative mask: every bit this level satisfies.
    pub const fn mask(self) -> u8 {
        match self {
            PermissionLevel::None => 0,
            PermissionLevel::Access => 3,
            PermissionLevel::Container => 15,
            PermissionLevel::Build => 63,
            PermissionLevel::Grant => 64,
            PermissionLevel::AccessGrant => 67,
            PermissionLevel::ContainerGrant => 79,
            PermissionLevel::BuildGrant => 127,
        }
    }

    /// Map a stored value back to a level. Unknown values fold to `None`.
    pub fn from_numeric(value: u8) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.value() == value)
            .unwrap_or(PermissionLevel::None)
    }

    pub fn allows(self, requested: PermissionLevel) -> bool {
        self.mask() & requested.value() == requested.value()
    }

    /// True when this level both covers `requested` and carries the grant bit.
    pub fn can_grant(self, requested: PermissionLevel) -> bool {
        self.allows(requested) && self.mask() & GRANT_BIT != 0
    }

    pub fn has_grant(self) -> bool {
        self.value() & GRANT_BIT != 0
    }

    /// Merge in another level's mask.
    pub fn add(self, other: PermissionLevel) -> Self {
        Self::from_numeric(self.value() | other.mask())
    }

    pub fn add_grant(self) -> Self {
        Self::from_numeric(self.value() | GRANT_BIT)
    }

    /// The access tier with the grant bit stripped.
    pub fn tier(self) -> Self {
        Self::from_numeric(self.value() & !GRANT_BIT)
    }

    /// Same tier, grant bit preserved from `self`.
    pub fn with_tier(self, tier: PermissionLevel) -> Self {
        let base = tier.tier();
        if self.has_grant() {
            base.add_grant()
        } else {
            base
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionLevel::None => "none",
            PermissionLevel::Access => "access",
            PermissionLevel::Container => "container",
            PermissionLevel::Build => "build",
            PermissionLevel::Grant => "grant",
            PermissionLevel::AccessGrant => "access+grant",
            PermissionLevel::ContainerGrant => "container+grant",
            PermissionLevel::BuildGrant => "build+grant",
        }
    }
}

impl From<u8> for PermissionLevel {
    fn from(value: u8) -> Self {
        Self::from_numeric(value)
    }
}

impl From<PermissionLevel> for u8 {
    fn from(level: PermissionLevel) -> Self {
        level.value()
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (claim, player) access record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimPermission {
    pub key: Option<PermissionKey>,
    pub claim: ClaimKey,
    pub player: PlayerId,
    pub level: PermissionLevel,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl ClaimPermission {
    pub fn new(claim: ClaimKey, player: PlayerId, level: PermissionLevel) -> Self {
        let now = Utc::now();
        Self {
            key: None,
            claim,
            player,
            level,
            created_at: now,
            modified_at: now,
            schema_version: PERMISSION_SCHEMA_VERSION,
        }
    }

    pub fn allows(&self, requested: PermissionLevel) -> bool {
        self.level.allows(requested)
    }

    pub fn can_grant(&self, requested: PermissionLevel) -> bool {
        self.level.can_grant(requested)
    }
}
