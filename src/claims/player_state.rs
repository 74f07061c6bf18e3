//! Per-player balances and claim-tool session state.
//!
//! Block balances persist. The tool fields (`last_tool_location`,
//! `working_claim`, `visualization`) live only in memory and are cleared on
//! logout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claims::collaborators::PreviewHandle;
use crate::claims::types::{ClaimKey, Location, PlayerId, ToolMode, PLAYER_STATE_SCHEMA_VERSION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub last_login: DateTime<Utc>,
    pub earned_blocks: i64,
    pub purchased_blocks: i64,
    pub bonus_blocks: i64,
    #[serde(skip)]
    pub admin_mode: bool,
    #[serde(skip)]
    pub tool_mode: ToolMode,
    /// First click of a pending tool gesture. `None` means idle.
    #[serde(skip)]
    pub last_tool_location: Option<Location>,
    #[serde(skip)]
    pub working_claim: Option<ClaimKey>,
    #[serde(skip)]
    pub visualization: Option<PreviewHandle>,
    /// Where the player stood at the last earned-block tick.
    #[serde(skip)]
    pub last_accrual_location: Option<Location>,
    pub schema_version: u8,
}

impl PlayerState {
    pub fn new(id: PlayerId, name: impl Into<String>, initial_blocks: i64) -> Self {
        Self {
            id,
            name: name.into(),
            last_login: Utc::now(),
            earned_blocks: initial_blocks,
            purchased_blocks: 0,
            bonus_blocks: 0,
            admin_mode: false,
            tool_mode: ToolMode::Basic,
            last_tool_location: None,
            working_claim: None,
            visualization: None,
            last_accrual_location: None,
            schema_version: PLAYER_STATE_SCHEMA_VERSION,
        }
    }

    pub fn total_blocks(&self) -> i64 {
        self.earned_blocks + self.purchased_blocks + self.bonus_blocks
    }

    /// Debit `amount` blocks, draining bonus, then purchased, then earned.
    /// Earned never goes below zero. Non-positive amounts are ignored.
    pub fn remove_claim_blocks(&mut self, amount: i64) {
        if amount <= 0 {
            return;
        }
        let mut remaining = amount;

        let from_bonus = remaining.min(self.bonus_blocks.max(0));
        self.bonus_blocks -= from_bonus;
        remaining -= from_bonus;

        let from_purchased = remaining.min(self.purchased_blocks.max(0));
        self.purchased_blocks -= from_purchased;
        remaining -= from_purchased;

        self.earned_blocks = (self.earned_blocks - remaining).max(0);
    }

    pub fn add_earned_blocks(&mut self, amount: i64) {
        self.earned_blocks += amount;
    }

    pub fn is_pending(&self) -> bool {
        self.last_tool_location.is_some()
    }

    pub fn begin_pending(&mut self, location: Location, working_claim: Option<ClaimKey>) {
        self.last_tool_location = Some(location);
        self.working_claim = working_claim;
    }

    /// Back to idle and forget the working claim.
    pub fn reset_tool(&mut self) {
        self.last_tool_location = None;
        self.working_claim = None;
    }

    pub fn touch_login(&mut self) {
        self.last_login = Utc::now();
    }
}
