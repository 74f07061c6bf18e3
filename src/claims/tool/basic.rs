//! Basic mode: a player stakes a new top-level claim paid for with claim
//! blocks. Admin mode reuses the same gesture through [`create_top_level`].

use log::debug;

use crate::claims::claim::ClaimResult;
use crate::claims::collaborators::HighlightStyle;
use crate::claims::engine::ClaimEngine;
use crate::claims::errors::ClaimError;
use crate::claims::tool::{ClaimTool, ToolClick, ToolOutcome, ToolRejection};
use crate::claims::types::{Capabilities, Location, PlayerId, ToolMode, ADMIN_OWNER};

pub struct BasicTool;

impl ClaimTool for BasicTool {
    fn mode(&self) -> ToolMode {
        ToolMode::Basic
    }

    fn on_first_click(&self, engine: &mut ClaimEngine, click: &ToolClick) -> Result<ToolOutcome, ClaimError> {
        if engine.settings.require_permission_create && !click.capabilities.contains(Capabilities::CREATE) {
            return Ok(ToolOutcome::Rejected(ToolRejection::NoPermission));
        }
        if let Some(limit) = claim_limit_reached(engine, click) {
            return Ok(ToolOutcome::Rejected(limit));
        }
        Ok(start_top_level(engine, click, false))
    }

    fn on_second_click(
        &self,
        engine: &mut ClaimEngine,
        click: &ToolClick,
        first: &Location,
    ) -> Result<ToolOutcome, ClaimError> {
        if let Some(limit) = claim_limit_reached(engine, click) {
            return Ok(engine.reject_and_reset(click.player, limit));
        }
        create_top_level(engine, click, first, false)
    }

    fn on_equip(&self, engine: &mut ClaimEngine, player: PlayerId, _capabilities: Capabilities) -> ToolOutcome {
        if let Some(state) = engine.tool_state(player) {
            state.admin_mode = false;
        }
        ToolOutcome::Unchanged
    }
}

fn claim_limit_reached(engine: &ClaimEngine, click: &ToolClick) -> Option<ToolRejection> {
    let limit = engine.settings.max_claims;
    if limit == 0 || click.capabilities.contains(Capabilities::BYPASS_LIMIT) {
        return None;
    }
    let owned = engine.caches.claims.owned_top_level_count(click.player);
    (owned >= limit).then_some(ToolRejection::ClaimLimit { limit })
}

/// First click of a top-level gesture: refuse claimed or protected land,
/// otherwise go Pending.
pub(super) fn start_top_level(engine: &mut ClaimEngine, click: &ToolClick, admin: bool) -> ToolOutcome {
    if let Some(existing) = engine.claim_at(&click.location, true).cloned() {
        return engine.reject_with_preview(
            click.player,
            std::slice::from_ref(&existing),
            ToolRejection::AlreadyClaimed,
        );
    }
    let consult_region = !(admin && engine.settings.admin_overrides_region);
    if consult_region && engine.region_forbids_location(click.player, &click.location) {
        return ToolOutcome::Rejected(ToolRejection::RegionConflict);
    }
    engine.begin_gesture(click.player, &click.location, None);
    ToolOutcome::Started
}

/// Second click of a top-level gesture.
///
/// Structural overlap returns to Idle. Region, size and budget failures stay
/// Pending so the player can pick another corner.
pub(super) fn create_top_level(
    engine: &mut ClaimEngine,
    click: &ToolClick,
    first: &Location,
    admin: bool,
) -> Result<ToolOutcome, ClaimError> {
    let owner = if admin { ADMIN_OWNER } else { click.player };
    let mut candidate = match engine.create_claim(first, &click.location, owner) {
        ClaimResult::Success(candidate) => candidate,
        ClaimResult::Overlap(conflicts) => {
            engine.end_gesture(click.player);
            engine.show_preview(click.player, &conflicts, HighlightStyle::Error);
            return Ok(ToolOutcome::Rejected(ToolRejection::Overlap(conflicts)));
        }
        ClaimResult::WorldMismatch => {
            engine.end_gesture(click.player);
            return Ok(ToolOutcome::Cancelled);
        }
    };

    let consult_region = !(admin && engine.settings.admin_overrides_region);
    if consult_region && engine.region_forbids_claim(click.player, &candidate) {
        engine.revert_preview(click.player);
        return Ok(ToolOutcome::Rejected(ToolRejection::RegionConflict));
    }

    let (min_width, min_length, min_area) = (
        engine.settings.min_width,
        engine.settings.min_length,
        engine.settings.min_area,
    );
    if candidate.width() < min_width || candidate.length() < min_length {
        let reason = ToolRejection::TooNarrow {
            min_width,
            min_length,
        };
        return Ok(engine.reject_with_preview(click.player, std::slice::from_ref(&candidate), reason));
    }
    if candidate.area() < min_area {
        let reason = ToolRejection::TooSmall { min_area };
        return Ok(engine.reject_with_preview(click.player, std::slice::from_ref(&candidate), reason));
    }

    let area = candidate.area();
    if !admin {
        let available = engine.player(click.player).map(|s| s.total_blocks()).unwrap_or(0);
        if area > available {
            let reason = ToolRejection::InsufficientBlocks {
                needed: area,
                available,
            };
            return Ok(engine.reject_with_preview(click.player, std::slice::from_ref(&candidate), reason));
        }
    } else {
        candidate.resizeable = false;
    }

    let created = engine.insert_claim_record(candidate)?;
    if !admin {
        engine.mutate_player(click.player, |state| state.remove_claim_blocks(area));
    }
    if let Some(state) = engine.tool_state(click.player) {
        state.reset_tool();
    }
    engine.show_preview(
        click.player,
        std::slice::from_ref(&created),
        HighlightStyle::for_claim(&created),
    );
    debug!("{} created claim {}", click.player, created.describe());
    Ok(ToolOutcome::Created(created))
}
