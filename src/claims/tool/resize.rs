//! Resize mode: drag a claim corner to a new position.
//!
//! The first click must hit a corner of the claim under the cursor. The
//! second click is where that corner moves to; the claim keeps its key and
//! only its X/Z bounds change. Players pay for growth and are credited for
//! shrinkage unless the claim is server-owned or they are in admin mode.

use log::debug;

use crate::claims::claim::Claim;
use crate::claims::collaborators::HighlightStyle;
use crate::claims::engine::ClaimEngine;
use crate::claims::errors::ClaimError;
use crate::claims::tool::{ClaimTool, ToolClick, ToolOutcome, ToolRejection};
use crate::claims::types::{Capabilities, Location, ToolMode};

pub struct ResizeTool;

impl ClaimTool for ResizeTool {
    fn mode(&self) -> ToolMode {
        ToolMode::Resize
    }

    fn on_first_click(&self, engine: &mut ClaimEngine, click: &ToolClick) -> Result<ToolOutcome, ClaimError> {
        let Some(claim) = engine.claim_at(&click.location, true).cloned() else {
            return Ok(ToolOutcome::Rejected(ToolRejection::NoClaim));
        };
        let admin_mode = engine.admin_mode(click.player);
        if claim.is_admin_claim() && !click.capabilities.contains(Capabilities::ADMIN_RESIZE) {
            return Ok(ToolOutcome::Rejected(ToolRejection::NoPermission));
        }
        if !claim.resizeable && !admin_mode {
            return Ok(ToolOutcome::Rejected(ToolRejection::NotResizeable));
        }
        if !claim.is_owned_by(click.player) && !admin_mode {
            return Ok(ToolOutcome::Rejected(ToolRejection::NotOwner));
        }
        if !claim.is_corner(&click.location) {
            return Ok(engine.reject_with_preview(
                click.player,
                std::slice::from_ref(&claim),
                ToolRejection::NotCorner,
            ));
        }
        if let Some(state) = engine.tool_state(click.player) {
            state.begin_pending(click.location.clone(), claim.key);
        }
        engine.show_preview(
            click.player,
            std::slice::from_ref(&claim),
            HighlightStyle::for_claim(&claim),
        );
        Ok(ToolOutcome::Started)
    }

    fn on_second_click(
        &self,
        engine: &mut ClaimEngine,
        click: &ToolClick,
        first: &Location,
    ) -> Result<ToolOutcome, ClaimError> {
        if click.location.block() == first.block() {
            return Ok(ToolOutcome::Unchanged);
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
        let Some(mut shape) = working.resize_check(first, &click.location) else {
            return Ok(engine.reject_and_reset(click.player, ToolRejection::CrossedOwnEdge));
        };

        let mut target = working;
        if let Some(parent_key) = target.parent {
            let parent = engine.claim(parent_key).filter(|c| c.is_active()).cloned();
            let Some(parent) = parent else {
                return Ok(engine.reject_and_reset(click.player, ToolRejection::NoParent));
            };
            // A shared corner dragged outward moves the parent.
            if parent.is_corner(first) && target.grows_to(&shape) {
                let Some(parent_shape) = parent.resize_check(first, &click.location) else {
                    return Ok(engine.reject_and_reset(click.player, ToolRejection::CrossedOwnEdge));
                };
                debug!("resize of subclaim {parent_key} corner moves the parent");
                target = parent;
                shape = parent_shape;
            }
        }

        if target.is_top_level() {
            resize_top_level(engine, click, target, shape)
        } else {
            resize_subclaim(engine, click, target, shape)
        }
    }
}

fn resize_top_level(
    engine: &mut ClaimEngine,
    click: &ToolClick,
    mut target: Claim,
    shape: Claim,
) -> Result<ToolOutcome, ClaimError> {
    let admin_mode = engine.admin_mode(click.player);
    let charged = !target.is_admin_claim() && !admin_mode;
    let delta = shape.area() - target.area();

    if charged {
        let settings = engine.settings();
        let (min_width, min_length, min_area) = (settings.min_width, settings.min_length, settings.min_area);
        if shape.width() < min_width || shape.length() < min_length {
            let reason = ToolRejection::TooNarrow {
                min_width,
                min_length,
            };
            return Ok(engine.reject_with_preview(click.player, std::slice::from_ref(&shape), reason));
        }
        if shape.area() < min_area {
            let reason = ToolRejection::TooSmall { min_area };
            return Ok(engine.reject_with_preview(click.player, std::slice::from_ref(&shape), reason));
        }
        let available = engine.player(click.player).map(|s| s.total_blocks()).unwrap_or(0);
        if delta > available {
            let reason = ToolRejection::InsufficientBlocks {
                needed: delta,
                available,
            };
            return Ok(engine.reject_and_reset(click.player, reason));
        }
    }

    if target.shrinks_to(&shape) {
        if let Some(key) = target.key {
            let stranded = engine
                .children_of(key)
                .into_iter()
                .find(|child| child.is_active() && !shape.contains_claim(child))
                .cloned();
            if let Some(child) = stranded {
                let reason = ToolRejection::ChildOutside(child.key.unwrap_or(key));
                return Ok(engine.reject_with_preview(click.player, std::slice::from_ref(&child), reason));
            }
        }
    }

    if target.grows_to(&shape) {
        let conflicts: Vec<Claim> = engine
            .caches
            .claims
            .top_level_overlapping(&shape)
            .into_iter()
            .cloned()
            .collect();
        if !conflicts.is_empty() {
            engine.end_gesture(click.player);
            engine.show_preview(click.player, &conflicts, HighlightStyle::Error);
            return Ok(ToolOutcome::Rejected(ToolRejection::Overlap(conflicts)));
        }
        let consult_region = !(admin_mode && engine.settings.admin_overrides_region);
        if consult_region && engine.region_forbids_claim(click.player, &shape) {
            return Ok(engine.reject_and_reset(click.player, ToolRejection::RegionConflict));
        }
    }

    if charged && delta != 0 {
        engine.mutate_player(click.player, |state| {
            if delta > 0 {
                state.remove_claim_blocks(delta);
            } else {
                state.add_earned_blocks(-delta);
            }
        });
    }
    finish(engine, click, &mut target, &shape)
}

fn resize_subclaim(
    engine: &mut ClaimEngine,
    click: &ToolClick,
    mut target: Claim,
    shape: Claim,
) -> Result<ToolOutcome, ClaimError> {
    let parent = target
        .parent
        .and_then(|key| engine.claim(key))
        .filter(|c| c.is_active())
        .cloned();
    let Some(parent) = parent else {
        return Ok(engine.reject_and_reset(click.player, ToolRejection::NoParent));
    };
    if !parent.contains_claim(&shape) {
        return Ok(engine.reject_with_preview(
            click.player,
            std::slice::from_ref(&parent),
            ToolRejection::OutsideParent,
        ));
    }
    let conflicts: Vec<Claim> = parent
        .key
        .map(|key| engine.children_of(key))
        .unwrap_or_default()
        .into_iter()
        .filter(|sibling| sibling.is_active() && sibling.key != target.key && sibling.overlaps(&shape))
        .cloned()
        .collect();
    if !conflicts.is_empty() {
        engine.end_gesture(click.player);
        engine.show_preview(click.player, &conflicts, HighlightStyle::Error);
        return Ok(ToolOutcome::Rejected(ToolRejection::Overlap(conflicts)));
    }
    finish(engine, click, &mut target, &shape)
}

fn finish(
    engine: &mut ClaimEngine,
    click: &ToolClick,
    target: &mut Claim,
    shape: &Claim,
) -> Result<ToolOutcome, ClaimError> {
    target.reshape(shape);
    engine.update_claim(target.clone())?;
    if let Some(state) = engine.tool_state(click.player) {
        state.reset_tool();
    }
    engine.show_preview(
        click.player,
        std::slice::from_ref(target),
        HighlightStyle::for_claim(target),
    );
    debug!("{} resized claim to {}", click.player, target.describe());
    Ok(ToolOutcome::Resized(target.clone()))
}
