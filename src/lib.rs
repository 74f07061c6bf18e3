//! # Claimwarden - land claims for shared block worlds
//!
//! Claimwarden lets players stake out rectangular territories ("claims") in a
//! shared, mutable world and decides who may touch the blocks inside them.
//!
//! ## Features
//!
//! - **Claims and subclaims**: top-level claims never overlap; subclaims nest one level deep inside them.
//! - **Tiered trust**: Access, Container and Build levels with an orthogonal Grant bit.
//! - **Two-click tool**: Basic, Admin, Subclaim, Resize and Delete modes with live previews.
//! - **Claim blocks**: earned, purchased and bonus balances pay for claim area.
//! - **Claim groups**: cap how many claims of a group one player may own.
//! - **Write-behind persistence**: sled or in-memory stores, written on a background worker.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use claimwarden::claims::{
//!     Capabilities, ClaimEngine, Collaborators, Location, MemoryClaimStore, ToolClick,
//! };
//! use claimwarden::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("claimwarden.toml").await?;
//!     let store = Arc::new(MemoryClaimStore::new());
//!     let mut engine = ClaimEngine::open(config.claims, store, Collaborators::default())?;
//!
//!     let alice = uuid::Uuid::new_v4();
//!     engine.on_login(alice, "alice");
//!     let caps = Capabilities::player();
//!     engine.use_tool(&ToolClick::new(alice, Location::new("world", 10, 64, 10), caps))?;
//!     engine.use_tool(&ToolClick::new(alice, Location::new("world", 20, 64, 20), caps))?;
//!     engine.settle().await;
//!     engine.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`claims`] - claim model, caches, stores, permissions and the claim tool
//! - [`config`] - configuration loading and validation

pub mod claims;
pub mod config;
