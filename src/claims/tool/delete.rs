//! Delete mode: select a claim, then click inside it again to confirm.

use log::info;

use crate::claims::collaborators::HighlightStyle;
use crate::claims::engine::ClaimEngine;
use crate::claims::errors::ClaimError;
use crate::claims::tool::{ClaimTool, ToolClick, ToolOutcome, ToolRejection};
use crate::claims::types::{Capabilities, Location, ToolMode};

pub struct DeleteTool;

impl ClaimTool for DeleteTool {
    fn mode(&self) -> ToolMode {
        ToolMode::Delete
    }

    fn on_first_click(&self, engine: &mut ClaimEngine, click: &ToolClick) -> Result<ToolOutcome, ClaimError> {
        if !click.capabilities.contains(Capabilities::DELETE) {
            return Ok(ToolOutcome::Rejected(ToolRejection::NoPermission));
        }
        let Some(claim) = engine.claim_at(&click.location, true).cloned() else {
            return Ok(ToolOutcome::Rejected(ToolRejection::NoClaim));
        };
        if !claim.is_owned_by(click.player) && !engine.admin_mode(click.player) {
            return Ok(ToolOutcome::Rejected(ToolRejection::NotOwner));
        }
        if let Some(state) = engine.tool_state(click.player) {
            state.begin_pending(click.location.clone(), claim.key);
        }
        engine.show_preview(click.player, std::slice::from_ref(&claim), HighlightStyle::Delete);
        Ok(ToolOutcome::Started)
    }

    fn on_second_click(
        &self,
        engine: &mut ClaimEngine,
        click: &ToolClick,
        _first: &Location,
    ) -> Result<ToolOutcome, ClaimError> {
        if !click.capabilities.contains(Capabilities::DELETE) {
            return Ok(engine.reject_and_reset(click.player, ToolRejection::NoPermission));
        }
        let working = engine
            .player(click.player)
            .and_then(|state| state.working_claim)
            .and_then(|key| engine.claim(key))
            .filter(|claim| claim.is_active())
            .cloned();
        let Some(working) = working else {
            return Ok(engine.reject_and_reset(click.player, ToolRejection::ClaimInactive));
        };
        let Some(key) = working.key else {
            return Ok(engine.reject_and_reset(click.player, ToolRejection::ClaimInactive));
        };
        if !working.contains(&click.location, true) {
            engine.end_gesture(click.player);
            return Ok(ToolOutcome::Cancelled);
        }
        let removed = engine.delete_claim(key)?;
        engine.end_gesture(click.player);
        info!(
            "{} deleted claim {key} ({} records)",
            click.player,
            removed.len()
        );
        Ok(ToolOutcome::Deleted(key))
    }
}
