//! Claim data model, caches, persistence and the claim tool.
//!
//! [`ClaimEngine`] is the entry point. It owns the in-memory caches and a
//! background writer, and every gameplay query and mutation goes through it.

pub mod access;
pub mod cache;
pub mod claim;
pub mod collaborators;
pub mod engine;
pub mod errors;
pub mod expiry;
pub mod group;
pub mod groups;
pub mod lifecycle;
pub mod market;
pub mod memory_store;
pub mod migration;
pub mod permission;
pub mod persistence;
pub mod player_state;
pub mod players;
pub mod spatial;
pub mod storage;
pub mod tool;
pub mod trust;
pub mod types;

pub use access::BlockDecision;
pub use cache::Caches;
pub use claim::{Claim, ClaimResult};
pub use collaborators::{
    EconomyService, HighlightStyle, NoRegionAdvisory, NoVisualizer, PreviewHandle, RegionAdvisory,
    Visualizer,
};
pub use engine::{ClaimEngine, Collaborators};
pub use errors::ClaimError;
pub use expiry::{ExpiringClaim, ExpiryStats};
pub use group::ClaimGroup;
pub use lifecycle::AbandonOutcome;
pub use market::{parse_price, Listing, MarketError, Purchase, SaleKind};
pub use memory_store::MemoryClaimStore;
pub use migration::{migrate, open_store, MigrationStats, StoreBackend};
pub use permission::{ClaimPermission, PermissionLevel};
pub use player_state::PlayerState;
pub use storage::{ClaimStore, ClaimStoreBuilder, SledClaimStore};
pub use tool::{tool_for, ClaimTool, ToolClick, ToolOutcome, ToolRejection};
pub use trust::TrustError;
pub use types::*;
