//! Identifiers, positions and small enums shared across the claim engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CLAIM_SCHEMA_VERSION: u8 = 1;
pub const PERMISSION_SCHEMA_VERSION: u8 = 1;
pub const GROUP_SCHEMA_VERSION: u8 = 1;
pub const PLAYER_STATE_SCHEMA_VERSION: u8 = 1;

/// Players are identified by their account uuid.
pub type PlayerId = Uuid;

/// Owner of server-owned ("admin") claims.
pub const ADMIN_OWNER: PlayerId = Uuid::nil();

/// Permission subject meaning "everyone without an explicit record".
pub const PUBLIC_PLAYER: PlayerId = Uuid::nil();

macro_rules! record_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }

            pub(crate) fn to_be_bytes(self) -> [u8; 8] {
                self.0.to_be_bytes()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_key!(
    /// Store-assigned claim identity. Zero is never allocated.
    ClaimKey
);
record_key!(PermissionKey);
record_key!(GroupKey);

/// An integer block coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// A block position inside a named world.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Location {
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    pub fn block(&self) -> BlockPos {
        BlockPos::new(self.x, self.y, self.z)
    }

    pub fn same_world(&self, other: &Location) -> bool {
        self.world == other.world
    }

    /// Squared distance in blocks; `None` across worlds.
    pub fn distance_squared(&self, other: &Location) -> Option<i64> {
        if !self.same_world(other) {
            return None;
        }
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        let dz = i64::from(self.z) - i64::from(other.z);
        Some(dx * dx + dy * dy + dz * dz)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{},{},{}", self.world, self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClaimStatus {
    #[default]
    Active,
    /// Removal has been dispatched; the claim is no longer matched by lookups.
    PendingDelete,
}

/// Editing behaviour bound to the player's claim tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToolMode {
    #[default]
    Basic,
    Admin,
    Subclaim,
    Resize,
    Delete,
}

impl ToolMode {
    pub const ALL: [ToolMode; 5] = [
        ToolMode::Basic,
        ToolMode::Admin,
        ToolMode::Subclaim,
        ToolMode::Resize,
        ToolMode::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolMode::Basic => "basic",
            ToolMode::Admin => "admin",
            ToolMode::Subclaim => "subclaim",
            ToolMode::Resize => "resize",
            ToolMode::Delete => "delete",
        }
    }
}

bitflags::bitflags! {
    /// Host-granted abilities of the acting player, checked by the tools.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const CREATE        = 0b0000_0001;
        const SUBCLAIM      = 0b0000_0010;
        const DELETE        = 0b0000_0100;
        const ADMIN_CREATE  = 0b0000_1000;
        const ADMIN_RESIZE  = 0b0001_0000;
        /// Ignore the configured `max_claims` cap.
        const BYPASS_LIMIT  = 0b0010_0000;
    }
}

impl Capabilities {
    /// What an ordinary player holds.
    pub fn player() -> Self {
        Self::CREATE | Self::SUBCLAIM | Self::DELETE
    }

    pub fn admin() -> Self {
        Self::all()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::player()
    }
}
