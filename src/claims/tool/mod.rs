//! The two-click claim tool.
//!
//! Every tool mode shares one shape: the first click records a location
//! (and possibly a working claim) on the player's state, the second click
//! validates and commits. A player is Pending while
//! `PlayerState::last_tool_location` is set and Idle otherwise.
//!
//! The engine methods here handle what all modes have in common: choosing
//! the first or second click, restarting a gesture whose second click lands
//! in another world, and cancelling a pending gesture when the tool is put
//! away or swapped for another mode.

mod admin;
mod basic;
mod delete;
mod resize;
mod subclaim;

use log::debug;
use thiserror::Error;

use crate::claims::claim::Claim;
use crate::claims::collaborators::HighlightStyle;
use crate::claims::engine::ClaimEngine;
use crate::claims::errors::ClaimError;
use crate::claims::player_state::PlayerState;
use crate::claims::types::{Capabilities, ClaimKey, Location, PlayerId, ToolMode};

pub use admin::AdminTool;
pub use basic::BasicTool;
pub use delete::DeleteTool;
pub use resize::ResizeTool;
pub use subclaim::SubclaimTool;

/// One click with the claim tool.
#[derive(Debug, Clone)]
pub struct ToolClick {
    pub player: PlayerId,
    pub location: Location,
    pub capabilities: Capabilities,
}

impl ToolClick {
    pub fn new(player: PlayerId, location: Location, capabilities: Capabilities) -> Self {
        Self {
            player,
            location,
            capabilities,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// A first click was recorded; the player is Pending.
    Started,
    Created(Claim),
    Resized(Claim),
    /// The claim and its children were deleted.
    Deleted(ClaimKey),
    /// Nothing happened; the workflow state is as it was.
    Unchanged,
    /// A pending gesture was abandoned.
    Cancelled,
    Rejected(ToolRejection),
}

impl ToolOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, ToolOutcome::Rejected(_))
    }

    pub fn rejection(&self) -> Option<&ToolRejection> {
        match self {
            ToolOutcome::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolRejection {
    #[error("you do not have permission to do that")]
    NoPermission,
    #[error("there is already a claim here")]
    AlreadyClaimed,
    #[error("overlaps {} existing claims", .0.len())]
    Overlap(Vec<Claim>),
    #[error("overlaps a protected region")]
    RegionConflict,
    #[error("claims must be at least {min_width} by {min_length} blocks")]
    TooNarrow { min_width: i64, min_length: i64 },
    #[error("claims must cover at least {min_area} blocks")]
    TooSmall { min_area: i64 },
    #[error("needs {needed} claim blocks but only {available} are available")]
    InsufficientBlocks { needed: i64, available: i64 },
    #[error("claim limit of {limit} reached")]
    ClaimLimit { limit: usize },
    #[error("there is no claim here")]
    NoClaim,
    #[error("the parent claim no longer exists")]
    NoParent,
    #[error("subclaims cannot contain subclaims")]
    InsideSubclaim,
    #[error("you do not own this claim")]
    NotOwner,
    #[error("must stay inside the parent claim")]
    OutsideParent,
    #[error("this claim cannot be resized")]
    NotResizeable,
    #[error("click a corner of the claim to resize it")]
    NotCorner,
    #[error("the claim no longer exists")]
    ClaimInactive,
    #[error("a claim corner cannot cross the opposite edge")]
    CrossedOwnEdge,
    #[error("subclaim {0} would end up outside the claim")]
    ChildOutside(ClaimKey),
}

/// Per-mode behaviour of the claim tool.
pub trait ClaimTool: Sync {
    fn mode(&self) -> ToolMode;

    fn on_first_click(&self, engine: &mut ClaimEngine, click: &ToolClick) -> Result<ToolOutcome, ClaimError>;

    /// `first` is the pending location, always in the click's world.
    fn on_second_click(
        &self,
        engine: &mut ClaimEngine,
        click: &ToolClick,
        first: &Location,
    ) -> Result<ToolOutcome, ClaimError>;

    fn on_equip(&self, _engine: &mut ClaimEngine, _player: PlayerId, _capabilities: Capabilities) -> ToolOutcome {
        ToolOutcome::Unchanged
    }

    /// Cancel a pending gesture and forget the working claim.
    fn on_unequip(&self, engine: &mut ClaimEngine, player: PlayerId) -> ToolOutcome {
        let pending = engine.player(player).map(PlayerState::is_pending).unwrap_or(false);
        engine.revert_preview(player);
        if let Some(state) = engine.tool_state(player) {
            state.reset_tool();
        }
        if pending {
            debug!("{} tool put away mid-gesture by {player}", self.mode().as_str());
            ToolOutcome::Cancelled
        } else {
            ToolOutcome::Unchanged
        }
    }
}

static TOOLS: [&dyn ClaimTool; 5] = [&BasicTool, &AdminTool, &SubclaimTool, &ResizeTool, &DeleteTool];

/// The tool implementing `mode`.
pub fn tool_for(mode: ToolMode) -> &'static dyn ClaimTool {
    TOOLS[mode as usize]
}

impl ClaimEngine {
    /// Handle a click with the player's current tool.
    pub fn use_tool(&mut self, click: &ToolClick) -> Result<ToolOutcome, ClaimError> {
        let state = self
            .player(click.player)
            .ok_or_else(|| ClaimError::NotFound(format!("player state: {}", click.player)))?;
        let tool = tool_for(state.tool_mode);
        match state.last_tool_location.clone() {
            None => tool.on_first_click(self, click),
            Some(first) if !first.same_world(&click.location) => {
                debug!(
                    "{} gesture by {} restarted in {}",
                    tool.mode().as_str(),
                    click.player,
                    click.location.world
                );
                self.revert_preview(click.player);
                if let Some(state) = self.tool_state(click.player) {
                    state.reset_tool();
                }
                tool.on_first_click(self, click)
            }
            Some(first) => tool.on_second_click(self, click, &first),
        }
    }

    /// Switch the player's tool to `mode`, cancelling any pending gesture of
    /// the previous mode.
    pub fn equip_tool(
        &mut self,
        player: PlayerId,
        mode: ToolMode,
        capabilities: Capabilities,
    ) -> Result<ToolOutcome, ClaimError> {
        let current = self
            .player(player)
            .map(|state| state.tool_mode)
            .ok_or_else(|| ClaimError::NotFound(format!("player state: {player}")))?;
        let outcome = tool_for(mode).on_equip(self, player, capabilities);
        if outcome.is_rejected() {
            return Ok(outcome);
        }
        let cancelled = tool_for(current).on_unequip(self, player);
        if let Some(state) = self.tool_state(player) {
            state.tool_mode = mode;
        }
        debug!("{player} equipped the {} tool", mode.as_str());
        Ok(match cancelled {
            ToolOutcome::Cancelled => cancelled,
            _ => outcome,
        })
    }

    /// The player stopped holding the claim tool.
    pub fn unequip_tool(&mut self, player: PlayerId) -> ToolOutcome {
        match self.player(player).map(|state| state.tool_mode) {
            Some(mode) => tool_for(mode).on_unequip(self, player),
            None => ToolOutcome::Unchanged,
        }
    }

    /// Show the claim at `location` to the player. Returns the claim key, or
    /// `None` (and clears any preview) when the land is unclaimed.
    pub fn inspect(&mut self, player: PlayerId, location: &Location) -> Option<ClaimKey> {
        let Some(claim) = self.claim_at(location, true).cloned() else {
            self.revert_preview(player);
            return None;
        };
        let style = if claim.is_admin_claim() {
            HighlightStyle::Admin
        } else {
            HighlightStyle::Basic
        };
        self.show_preview(player, std::slice::from_ref(&claim), style);
        claim.key
    }

    /// Mutable access to transient tool fields; nothing is persisted.
    pub(crate) fn tool_state(&mut self, player: PlayerId) -> Option<&mut PlayerState> {
        self.caches.players.get_mut(player)
    }

    pub(crate) fn admin_mode(&self, player: PlayerId) -> bool {
        self.player(player).map(|state| state.admin_mode).unwrap_or(false)
    }

    /// Record the first click and show the start marker.
    pub(crate) fn begin_gesture(&mut self, player: PlayerId, location: &Location, working: Option<ClaimKey>) {
        if let Some(state) = self.tool_state(player) {
            state.begin_pending(location.clone(), working);
        }
        self.mark_start(player, location);
    }

    /// Back to Idle, dropping the preview.
    pub(crate) fn end_gesture(&mut self, player: PlayerId) {
        if let Some(state) = self.tool_state(player) {
            state.reset_tool();
        }
        self.revert_preview(player);
    }

    /// Leave the gesture state alone and show `claims` as an error.
    pub(crate) fn reject_with_preview(
        &mut self,
        player: PlayerId,
        claims: &[Claim],
        reason: ToolRejection,
    ) -> ToolOutcome {
        self.show_preview(player, claims, HighlightStyle::Error);
        ToolOutcome::Rejected(reason)
    }

    /// Back to Idle and report `reason`.
    pub(crate) fn reject_and_reset(&mut self, player: PlayerId, reason: ToolRejection) -> ToolOutcome {
        self.end_gesture(player);
        ToolOutcome::Rejected(reason)
    }
}
