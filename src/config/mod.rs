//! # Configuration
//!
//! TOML configuration for the claim engine and the `claimwarden` binary.
//!
//! Sections:
//!
//! - [`ClaimsConfig`] - claim sizing, budgets, limits and expiry
//! - [`StorageConfig`] - backend selection and data directory
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use claimwarden::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("claimwarden.toml").await?;
//!     let config = Config::load("claimwarden.toml").await?;
//!     println!("auto depth: {}", config.claims.auto_depth);
//!     Ok(())
//! }
//! ```
//!
//! ## File format
//!
//! ```toml
//! [claims]
//! auto_depth = 5
//! min_width = 5
//! min_length = 5
//! min_area = 25
//! max_claims = 0
//! initial_blocks = 100
//!
//! [storage]
//! backend = "sled"
//! data_dir = "./data"
//! flush_every_write = true
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every key has a default, so a partial file is valid.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::claims::StoreBackend;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimsConfig {
    /// Blocks below the clicked Y that a new claim reaches.
    #[serde(default = "default_auto_depth")]
    pub auto_depth: i32,
    #[serde(default = "default_min_side")]
    pub min_width: i64,
    #[serde(default = "default_min_side")]
    pub min_length: i64,
    #[serde(default = "default_min_area")]
    pub min_area: i64,
    /// Top-level claims a player may own. 0 disables the cap.
    #[serde(default)]
    pub max_claims: usize,
    /// Earned blocks granted to a new player.
    #[serde(default = "default_initial_blocks")]
    pub initial_blocks: i64,
    /// Earned blocks accrued per hour of active play, paid in five-minute ticks.
    #[serde(default = "default_blocks_per_hour")]
    pub blocks_per_hour: i64,
    /// Require the create/subclaim capability before a first click.
    #[serde(default)]
    pub require_permission_create: bool,
    /// Admin-mode edits skip the region advisory.
    #[serde(default = "default_true")]
    pub admin_overrides_region: bool,
    #[serde(default)]
    pub claim_auto_expire: bool,
    #[serde(default = "default_expire_days")]
    pub claim_expire_days: i64,
    /// Claim limit given to newly created claim groups.
    #[serde(default = "default_group_limit")]
    pub claimgroup_default_limit: u32,
    /// Exclusive build ceiling; claims reach up to `world_max_height - 1`.
    #[serde(default = "default_world_max_height")]
    pub world_max_height: i32,
    /// How long tool previews stay rendered.
    #[serde(default = "default_preview_seconds")]
    pub preview_seconds: u64,
    /// Display name used for server-owned claims.
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
}

fn default_auto_depth() -> i32 {
    5
}

fn default_min_side() -> i64 {
    5
}

fn default_min_area() -> i64 {
    25
}

fn default_initial_blocks() -> i64 {
    100
}

fn default_blocks_per_hour() -> i64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_expire_days() -> i64 {
    60
}

fn default_group_limit() -> u32 {
    1
}

fn default_world_max_height() -> i32 {
    256
}

fn default_preview_seconds() -> u64 {
    30
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        Self {
            auto_depth: default_auto_depth(),
            min_width: default_min_side(),
            min_length: default_min_side(),
            min_area: default_min_area(),
            max_claims: 0,
            initial_blocks: default_initial_blocks(),
            blocks_per_hour: default_blocks_per_hour(),
            require_permission_create: false,
            admin_overrides_region: true,
            claim_auto_expire: false,
            claim_expire_days: default_expire_days(),
            claimgroup_default_limit: default_group_limit(),
            world_max_height: default_world_max_height(),
            preview_seconds: default_preview_seconds(),
            admin_name: default_admin_name(),
        }
    }
}

impl ClaimsConfig {
    pub fn preview_ttl(&self) -> Duration {
        Duration::from_secs(self.preview_seconds)
    }

    pub fn validate(&self) -> Result<()> {
        if self.auto_depth < 0 {
            return Err(anyhow!("claims.auto_depth must not be negative"));
        }
        if self.world_max_height <= 0 {
            return Err(anyhow!("claims.world_max_height must be positive"));
        }
        if self.min_width < 1 || self.min_length < 1 {
            return Err(anyhow!("claims.min_width and claims.min_length must be at least 1"));
        }
        if self.min_area < 0 {
            return Err(anyhow!("claims.min_area must not be negative"));
        }
        if self.claimgroup_default_limit < 1 {
            return Err(anyhow!("claims.claimgroup_default_limit must be at least 1"));
        }
        if self.blocks_per_hour < 0 || self.initial_blocks < 0 {
            return Err(anyhow!("claim block amounts must not be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Flush the sled database after every write instead of in the background.
    #[serde(default = "default_flush_every_write")]
    pub flush_every_write: bool,
}

fn default_flush_every_write() -> bool {
    true
}

fn default_data_dir() -> String {
    "./data".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            data_dir: default_data_dir(),
            flush_every_write: default_flush_every_write(),
        }
    }
}

impl StorageConfig {
    /// Sled database directory under `data_dir`.
    pub fn claims_db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("claims")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub claims: ClaimsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.claims.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn default_config_round_trips_through_disk() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("claimwarden.toml");
        let path = path.to_str().expect("utf8 path");
        Config::create_default(path).await.expect("write default");
        let loaded = Config::load(path).await.expect("load");
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [claims]
            max_claims = 3
            claim_auto_expire = true

            [storage]
            backend = "memory"
            flush_every_write = false
            "#,
        )
        .expect("parse");
        assert_eq!(config.claims.max_claims, 3);
        assert!(config.claims.claim_auto_expire);
        assert_eq!(config.claims.auto_depth, 5);
        assert_eq!(config.claims.preview_ttl(), Duration::from_secs(30));
        assert_eq!(config.storage.backend, StoreBackend::Memory);
        assert!(!config.storage.flush_every_write);
        assert!(StorageConfig::default().flush_every_write);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut claims = ClaimsConfig::default();
        assert!(claims.validate().is_ok());
        claims.world_max_height = 0;
        assert!(claims.validate().is_err());
        let claims = ClaimsConfig {
            claimgroup_default_limit: 0,
            ..ClaimsConfig::default()
        };
        assert!(claims.validate().is_err());
        let claims = ClaimsConfig {
            auto_depth: -1,
            ..ClaimsConfig::default()
        };
        assert!(claims.validate().is_err());
    }
}
