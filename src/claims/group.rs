use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claims::types::{GroupKey, GROUP_SCHEMA_VERSION};

pub const MAX_GROUP_NAME_LEN: usize = 15;

/// Named bucket capping how many of its claims one player may own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimGroup {
    pub key: Option<GroupKey>,
    pub name: String,
    pub claim_limit: u32,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl ClaimGroup {
    pub fn new(name: impl Into<String>, claim_limit: u32) -> Self {
        Self {
            key: None,
            name: name.into(),
            claim_limit,
            created_at: Utc::now(),
            schema_version: GROUP_SCHEMA_VERSION,
        }
    }

    /// Group names are compared case-insensitively.
    pub fn normalized_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// Checked against the trimmed name, which is what gets stored.
    pub fn is_valid_name(name: &str) -> bool {
        let name = name.trim();
        !name.is_empty() && name.chars().count() <= MAX_GROUP_NAME_LEN
    }
}
