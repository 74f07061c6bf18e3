//! Admin mode: server-owned claims. No block budget, and the claims are
//! not resizeable outside admin mode.

use crate::claims::engine::ClaimEngine;
use crate::claims::errors::ClaimError;
use crate::claims::tool::basic::{create_top_level, start_top_level};
use crate::claims::tool::{ClaimTool, ToolClick, ToolOutcome, ToolRejection};
use crate::claims::types::{Capabilities, Location, PlayerId, ToolMode};

pub struct AdminTool;

impl ClaimTool for AdminTool {
    fn mode(&self) -> ToolMode {
        ToolMode::Admin
    }

    fn on_first_click(&self, engine: &mut ClaimEngine, click: &ToolClick) -> Result<ToolOutcome, ClaimError> {
        if !click.capabilities.contains(Capabilities::ADMIN_CREATE) {
            return Ok(ToolOutcome::Rejected(ToolRejection::NoPermission));
        }
        Ok(start_top_level(engine, click, true))
    }

    fn on_second_click(
        &self,
        engine: &mut ClaimEngine,
        click: &ToolClick,
        first: &Location,
    ) -> Result<ToolOutcome, ClaimError> {
        if !click.capabilities.contains(Capabilities::ADMIN_CREATE) {
            return Ok(engine.reject_and_reset(click.player, ToolRejection::NoPermission));
        }
        create_top_level(engine, click, first, true)
    }

    /// Holding the admin tool puts the player in admin mode.
    fn on_equip(&self, engine: &mut ClaimEngine, player: PlayerId, capabilities: Capabilities) -> ToolOutcome {
        if !capabilities.contains(Capabilities::ADMIN_CREATE) {
            return ToolOutcome::Rejected(ToolRejection::NoPermission);
        }
        if let Some(state) = engine.tool_state(player) {
            state.admin_mode = true;
        }
        ToolOutcome::Unchanged
    }
}
