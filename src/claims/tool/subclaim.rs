//! Subclaim mode: carve a subclaim out of a top-level claim the player owns.
//! The working claim is the parent chosen by the first click.

use log::debug;

use crate::claims::claim::ClaimResult;
use crate::claims::collaborators::HighlightStyle;
use crate::claims::engine::ClaimEngine;
use crate::claims::errors::ClaimError;
use crate::claims::tool::{ClaimTool, ToolClick, ToolOutcome, ToolRejection};
use crate::claims::types::{Capabilities, Location, ToolMode};

pub struct SubclaimTool;

impl ClaimTool for SubclaimTool {
    fn mode(&self) -> ToolMode {
        ToolMode::Subclaim
    }

    fn on_first_click(&self, engine: &mut ClaimEngine, click: &ToolClick) -> Result<ToolOutcome, ClaimError> {
        if engine.settings.require_permission_create && !click.capabilities.contains(Capabilities::SUBCLAIM) {
            return Ok(ToolOutcome::Rejected(ToolRejection::NoPermission));
        }
        let Some(clicked) = engine.claim_at(&click.location, true).cloned() else {
            return Ok(ToolOutcome::Rejected(ToolRejection::NoClaim));
        };
        if let Some(parent) = clicked.parent {
            let parent = engine.claim(parent).cloned();
            let shown: Vec<_> = parent.into_iter().collect();
            return Ok(engine.reject_with_preview(click.player, &shown, ToolRejection::InsideSubclaim));
        }
        if !clicked.is_owned_by(click.player) && !engine.admin_mode(click.player) {
            return Ok(ToolOutcome::Rejected(ToolRejection::NotOwner));
        }
        engine.begin_gesture(click.player, &click.location, clicked.key);
        Ok(ToolOutcome::Started)
    }

    fn on_second_click(
        &self,
        engine: &mut ClaimEngine,
        click: &ToolClick,
        first: &Location,
    ) -> Result<ToolOutcome, ClaimError> {
        let parent = engine
            .player(click.player)
            .and_then(|state| state.working_claim)
            .and_then(|key| engine.claim(key))
            .filter(|claim| claim.is_active())
            .cloned();
        let Some(parent) = parent else {
            return Ok(engine.reject_and_reset(click.player, ToolRejection::NoParent));
        };
        if !parent.contains(&click.location, true) {
            return Ok(engine.reject_with_preview(
                click.player,
                std::slice::from_ref(&parent),
                ToolRejection::OutsideParent,
            ));
        }

        match engine.create_subclaim(first, &click.location, &parent) {
            ClaimResult::Success(mut candidate) => {
                candidate.parent = parent.key;
                let created = engine.insert_claim_record(candidate)?;
                if let Some(state) = engine.tool_state(click.player) {
                    state.reset_tool();
                }
                engine.show_preview(click.player, std::slice::from_ref(&created), HighlightStyle::Sub);
                debug!("{} created subclaim {}", click.player, created.describe());
                Ok(ToolOutcome::Created(created))
            }
            ClaimResult::Overlap(conflicts) => {
                engine.end_gesture(click.player);
                engine.show_preview(click.player, &conflicts, HighlightStyle::Error);
                Ok(ToolOutcome::Rejected(ToolRejection::Overlap(conflicts)))
            }
            ClaimResult::WorldMismatch => {
                engine.end_gesture(click.player);
                Ok(ToolOutcome::Cancelled)
            }
        }
    }
}
