//! Player state lifecycle: login, logout, balances and block accrual.
//!
//! Player state changes land in the cache immediately; the snapshot is
//! written behind.

use log::{debug, info};

use crate::claims::engine::ClaimEngine;
use crate::claims::player_state::PlayerState;
use crate::claims::types::{Location, PlayerId, ToolMode};

/// Players standing within this many blocks (squared) of their last sample
/// earn nothing for the tick.
const IDLE_DISTANCE_SQUARED: i64 = 9;

/// Earned-block ticks per hour.
const ACCRUAL_TICKS_PER_HOUR: i64 = 12;

impl ClaimEngine {
    /// Record a login: create the state with the initial block grant if new,
    /// stamp the login time and release the name from stale records.
    /// Returns the updated state.
    pub fn on_login(&mut self, id: PlayerId, name: &str) -> PlayerState {
        let initial_blocks = self.settings.initial_blocks;
        let state = self.caches.players.get_or_insert_with(id, || {
            info!("new player {name} ({id}) granted {initial_blocks} blocks");
            PlayerState::new(id, name, initial_blocks)
        });
        state.name = name.to_string();
        state.touch_login();
        let snapshot = state.clone();
        self.persist_player_snapshot(snapshot.clone());
        self.resolve_name_conflicts(id);
        snapshot
    }

    /// Cancel any pending gesture and reset the tool session.
    pub fn on_logout(&mut self, id: PlayerId) {
        self.revert_preview(id);
        self.mutate_player(id, |state| {
            state.reset_tool();
            state.tool_mode = ToolMode::Basic;
            state.admin_mode = false;
            state.last_accrual_location = None;
        });
        debug!("player {id} logged out; tool session reset");
    }

    /// Apply `change` to the cached state and persist the snapshot. Returns
    /// false when the player is unknown.
    pub fn mutate_player<F>(&mut self, id: PlayerId, change: F) -> bool
    where
        F: FnOnce(&mut PlayerState),
    {
        let Some(state) = self.caches.players.get_mut(id) else {
            return false;
        };
        change(state);
        let snapshot = state.clone();
        self.persist_player_snapshot(snapshot);
        true
    }

    fn persist_player_snapshot(&mut self, snapshot: PlayerState) {
        self.writer.dispatch(
            "player state write",
            move |store| store.put_player_state(&snapshot),
            |_| {},
        );
    }

    /// Rename every other record sharing this player's name to `old-<name>`.
    pub fn resolve_name_conflicts(&mut self, id: PlayerId) -> usize {
        let Some(name) = self.caches.players.get(id).map(|s| s.name.clone()) else {
            return 0;
        };
        let stale: Vec<PlayerId> = self
            .caches
            .players
            .iter()
            .filter(|state| state.id != id && state.name == name)
            .map(|state| state.id)
            .collect();
        for other in &stale {
            self.mutate_player(*other, |state| state.name = format!("old-{name}"));
            info!("renamed stale player record {other} to old-{name}");
        }
        stale.len()
    }

    /// Five-minute accrual tick. Players who moved at least three blocks
    /// since the previous tick (or changed world) earn `blocks_per_hour / 12`.
    pub fn accrue_earned_blocks(&mut self, id: PlayerId, current: &Location) -> i64 {
        let per_tick = self.settings.blocks_per_hour / ACCRUAL_TICKS_PER_HOUR;
        let Some(state) = self.caches.players.get(id) else {
            return 0;
        };
        let idle = state
            .last_accrual_location
            .as_ref()
            .and_then(|last| last.distance_squared(current))
            .map(|d| d < IDLE_DISTANCE_SQUARED)
            .unwrap_or(false);
        if idle {
            return 0;
        }
        let here = current.clone();
        self.mutate_player(id, |state| {
            state.add_earned_blocks(per_tick);
            state.last_accrual_location = Some(here);
        });
        per_tick
    }

    /// Toggle admin mode; returns the new value.
    pub fn set_admin_mode(&mut self, id: PlayerId, enabled: bool) -> bool {
        self.mutate_player(id, |state| state.admin_mode = enabled) && enabled
    }

    /// Adjust a balance by `delta` (negative removes, never below zero).
    pub fn adjust_bonus_blocks(&mut self, id: PlayerId, delta: i64) -> bool {
        self.mutate_player(id, |state| {
            state.bonus_blocks = (state.bonus_blocks + delta).max(0);
        })
    }

    pub fn adjust_purchased_blocks(&mut self, id: PlayerId, delta: i64) -> bool {
        self.mutate_player(id, |state| {
            state.purchased_blocks = (state.purchased_blocks + delta).max(0);
        })
    }
}
