//! Two-click tool behaviour across all modes.
mod common;

use claimwarden::claims::{
    Capabilities, ClaimKey, HighlightStyle, Location, PlayerId, ToolMode, ToolOutcome,
    ToolRejection, ADMIN_OWNER,
};
use claimwarden::config::ClaimsConfig;
use common::{at, click, click_as, harness, harness_with, test_settings, Harness};
use uuid::Uuid;

fn pending(h: &Harness, player: PlayerId) -> bool {
    h.engine.player(player).map(|s| s.is_pending()).unwrap_or(false)
}

fn blocks(h: &Harness, player: PlayerId) -> i64 {
    h.engine.player(player).map(|s| s.total_blocks()).unwrap_or(-1)
}

async fn basic_claim(h: &mut Harness, player: PlayerId, a: Location, b: Location) -> ClaimKey {
    assert_eq!(click(&mut h.engine, player, a), ToolOutcome::Started);
    let key = match click(&mut h.engine, player, b) {
        ToolOutcome::Created(claim) => claim.key.expect("keyed"),
        other => panic!("expected a claim, got {other:?}"),
    };
    h.engine.settle().await;
    key
}

#[tokio::test]
async fn basic_gesture_creates_and_charges() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");

    assert_eq!(click(&mut h.engine, alice, at(0, 0)), ToolOutcome::Started);
    assert!(pending(&h, alice));
    assert_eq!(h.visualizer.marks.lock().len(), 1);

    let created = match click(&mut h.engine, alice, at(9, 9)) {
        ToolOutcome::Created(claim) => claim,
        other => panic!("unexpected {other:?}"),
    };
    assert!(!pending(&h, alice));
    assert_eq!(created.owner, alice);
    assert_eq!(created.area(), 100);
    assert_eq!(blocks(&h, alice), 900);

    h.engine.settle().await;
    let key = created.key.expect("key");
    assert_eq!(h.engine.claim_at(&at(5, 5), true).and_then(|c| c.key), Some(key));
    assert_eq!(h.engine.store().load_claims().expect("load").len(), 1);
}

#[tokio::test]
async fn size_and_budget_failures_stay_pending() {
    let mut h = harness_with(ClaimsConfig {
        initial_blocks: 120,
        ..test_settings()
    });
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");

    click(&mut h.engine, alice, at(0, 0));
    let narrow = click(&mut h.engine, alice, at(2, 9));
    assert_eq!(
        narrow,
        ToolOutcome::Rejected(ToolRejection::TooNarrow {
            min_width: 5,
            min_length: 5
        })
    );
    assert!(pending(&h, alice));
    assert_eq!(h.visualizer.last_style(), Some(HighlightStyle::Error));

    let costly = click(&mut h.engine, alice, at(19, 19));
    assert_eq!(
        costly,
        ToolOutcome::Rejected(ToolRejection::InsufficientBlocks {
            needed: 400,
            available: 120
        })
    );
    assert!(pending(&h, alice));

    assert!(matches!(click(&mut h.engine, alice, at(9, 9)), ToolOutcome::Created(_)));
    assert_eq!(blocks(&h, alice), 20);
}

#[tokio::test]
async fn structural_overlap_resets_to_idle() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    h.engine.on_login(bob, "bob");
    let existing = basic_claim(&mut h, alice, at(0, 0), at(9, 9)).await;

    let taken = click(&mut h.engine, bob, at(5, 5));
    assert_eq!(taken, ToolOutcome::Rejected(ToolRejection::AlreadyClaimed));
    assert!(!pending(&h, bob));

    click(&mut h.engine, bob, at(15, 15));
    match click(&mut h.engine, bob, at(5, 5)) {
        ToolOutcome::Rejected(ToolRejection::Overlap(conflicts)) => {
            assert_eq!(conflicts[0].key, Some(existing));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!pending(&h, bob));
    assert_eq!(blocks(&h, bob), 1000);
}

#[tokio::test]
async fn claim_limit_respects_bypass() {
    let mut h = harness_with(ClaimsConfig {
        max_claims: 1,
        ..test_settings()
    });
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    basic_claim(&mut h, alice, at(0, 0), at(9, 9)).await;

    assert_eq!(
        click(&mut h.engine, alice, at(20, 20)),
        ToolOutcome::Rejected(ToolRejection::ClaimLimit { limit: 1 })
    );
    let bypass = Capabilities::player() | Capabilities::BYPASS_LIMIT;
    assert_eq!(click_as(&mut h.engine, alice, at(20, 20), bypass), ToolOutcome::Started);
}

#[tokio::test]
async fn create_permission_is_enforced_when_required() {
    let mut h = harness_with(ClaimsConfig {
        require_permission_create: true,
        ..test_settings()
    });
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    assert_eq!(
        click_as(&mut h.engine, alice, at(0, 0), Capabilities::empty()),
        ToolOutcome::Rejected(ToolRejection::NoPermission)
    );
    assert_eq!(click(&mut h.engine, alice, at(0, 0)), ToolOutcome::Started);
}

#[tokio::test]
async fn region_advisory_blocks_players_but_not_admins() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    *h.region.forbidden_world.lock() = Some("world".to_string());

    assert_eq!(
        click(&mut h.engine, alice, at(0, 0)),
        ToolOutcome::Rejected(ToolRejection::RegionConflict)
    );

    let admin = Capabilities::admin();
    assert_eq!(
        h.engine.equip_tool(alice, ToolMode::Admin, admin).expect("equip"),
        ToolOutcome::Unchanged
    );
    assert!(h.engine.player(alice).map(|s| s.admin_mode).unwrap_or(false));
    assert_eq!(click_as(&mut h.engine, alice, at(0, 0), admin), ToolOutcome::Started);
    match click_as(&mut h.engine, alice, at(9, 9), admin) {
        ToolOutcome::Created(claim) => {
            assert_eq!(claim.owner, ADMIN_OWNER);
            assert!(!claim.resizeable);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(blocks(&h, alice), 1000);

    h.engine
        .equip_tool(alice, ToolMode::Basic, admin)
        .expect("equip");
    assert!(!h.engine.player(alice).map(|s| s.admin_mode).unwrap_or(true));
}

#[tokio::test]
async fn unloaded_region_advisory_is_not_consulted() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    *h.region.forbidden_world.lock() = Some("world".to_string());
    *h.region.unloaded.lock() = true;

    assert_eq!(click(&mut h.engine, alice, at(0, 0)), ToolOutcome::Started);
    assert!(matches!(
        click(&mut h.engine, alice, at(9, 9)),
        ToolOutcome::Created(_)
    ));
}

#[tokio::test]
async fn admin_tool_requires_admin_capability() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    let outcome = h
        .engine
        .equip_tool(alice, ToolMode::Admin, Capabilities::player())
        .expect("equip");
    assert_eq!(outcome, ToolOutcome::Rejected(ToolRejection::NoPermission));
    assert_eq!(h.engine.player(alice).map(|s| s.tool_mode), Some(ToolMode::Basic));
}

#[tokio::test]
async fn second_click_in_another_world_restarts() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    click(&mut h.engine, alice, at(0, 0));
    let elsewhere = Location::new("nether", 5, 64, 5);
    assert_eq!(click(&mut h.engine, alice, elsewhere.clone()), ToolOutcome::Started);
    let state = h.engine.player(alice).expect("state");
    assert_eq!(state.last_tool_location.as_ref(), Some(&elsewhere));
}

#[tokio::test]
async fn putting_the_tool_away_cancels() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    assert_eq!(h.engine.unequip_tool(alice), ToolOutcome::Unchanged);

    click(&mut h.engine, alice, at(0, 0));
    assert_eq!(h.engine.unequip_tool(alice), ToolOutcome::Cancelled);
    assert!(!pending(&h, alice));
    assert_eq!(h.visualizer.reverted.lock().len(), 1);

    click(&mut h.engine, alice, at(0, 0));
    let swapped = h
        .engine
        .equip_tool(alice, ToolMode::Resize, Capabilities::player())
        .expect("equip");
    assert_eq!(swapped, ToolOutcome::Cancelled);
    assert_eq!(h.engine.player(alice).map(|s| s.tool_mode), Some(ToolMode::Resize));
}

#[tokio::test]
async fn logout_resets_the_tool_session() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    h.engine
        .equip_tool(alice, ToolMode::Delete, Capabilities::player())
        .expect("equip");
    insert_plain_claim(&mut h, alice).await;
    click(&mut h.engine, alice, at(1, 1));
    assert!(pending(&h, alice));

    h.engine.on_logout(alice);
    let state = h.engine.player(alice).expect("state");
    assert!(!state.is_pending());
    assert!(state.working_claim.is_none());
    assert_eq!(state.tool_mode, ToolMode::Basic);
}

async fn insert_plain_claim(h: &mut Harness, player: PlayerId) {
    let claim = h
        .engine
        .create_claim(&at(0, 0), &at(9, 9), player)
        .into_claim()
        .expect("claim");
    h.engine.insert_claim(claim).expect("insert");
    h.engine.settle().await;
}

#[tokio::test]
async fn subclaim_gesture() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    h.engine.on_login(bob, "bob");
    let parent = basic_claim(&mut h, alice, at(0, 0), at(9, 9)).await;
    for player in [alice, bob] {
        h.engine
            .equip_tool(player, ToolMode::Subclaim, Capabilities::player())
            .expect("equip");
    }

    assert_eq!(
        click(&mut h.engine, bob, at(2, 2)),
        ToolOutcome::Rejected(ToolRejection::NotOwner)
    );
    assert_eq!(
        click(&mut h.engine, alice, at(20, 20)),
        ToolOutcome::Rejected(ToolRejection::NoClaim)
    );

    assert_eq!(click(&mut h.engine, alice, at(2, 2)), ToolOutcome::Started);
    assert_eq!(
        click(&mut h.engine, alice, at(12, 4)),
        ToolOutcome::Rejected(ToolRejection::OutsideParent)
    );
    assert!(pending(&h, alice));
    let child = match click(&mut h.engine, alice, at(4, 4)) {
        ToolOutcome::Created(claim) => claim,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(child.parent, Some(parent));
    assert_eq!(blocks(&h, alice), 900);
    h.engine.settle().await;

    assert_eq!(
        click(&mut h.engine, alice, at(3, 3)),
        ToolOutcome::Rejected(ToolRejection::InsideSubclaim)
    );
    assert_eq!(h.engine.claim_at(&at(3, 3), true).and_then(|c| c.key), child.key);
    assert_eq!(h.engine.claim_at(&at(8, 8), true).and_then(|c| c.key), Some(parent));
}

#[tokio::test]
async fn resize_round_trip_restores_bounds_and_balance() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    let key = basic_claim(&mut h, alice, at(0, 0), at(9, 9)).await;
    let original = h.engine.claim(key).cloned().expect("claim");
    h.engine
        .equip_tool(alice, ToolMode::Resize, Capabilities::player())
        .expect("equip");

    assert_eq!(
        click(&mut h.engine, alice, at(5, 5)),
        ToolOutcome::Rejected(ToolRejection::NotCorner)
    );
    assert_eq!(click(&mut h.engine, alice, at(9, 9)), ToolOutcome::Started);
    assert_eq!(click(&mut h.engine, alice, at(9, 9)), ToolOutcome::Unchanged);
    assert!(matches!(click(&mut h.engine, alice, at(14, 14)), ToolOutcome::Resized(_)));
    h.engine.settle().await;
    assert_eq!(blocks(&h, alice), 1000 - 225);

    assert_eq!(click(&mut h.engine, alice, at(14, 14)), ToolOutcome::Started);
    match click(&mut h.engine, alice, at(9, 9)) {
        ToolOutcome::Resized(claim) => assert_eq!(claim.key, Some(key)),
        other => panic!("unexpected {other:?}"),
    }
    h.engine.settle().await;
    let restored = h.engine.claim(key).expect("claim");
    assert_eq!((restored.lower, restored.upper), (original.lower, original.upper));
    assert_eq!(blocks(&h, alice), 900);
}

#[tokio::test]
async fn resize_crossing_the_opposite_edge_resets() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    basic_claim(&mut h, alice, at(0, 0), at(9, 9)).await;
    h.engine
        .equip_tool(alice, ToolMode::Resize, Capabilities::player())
        .expect("equip");
    click(&mut h.engine, alice, at(9, 9));
    assert_eq!(
        click(&mut h.engine, alice, at(-3, 4)),
        ToolOutcome::Rejected(ToolRejection::CrossedOwnEdge)
    );
    assert!(!pending(&h, alice));
}

#[tokio::test]
async fn dragging_a_shared_corner_outward_resizes_the_parent() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    let parent = basic_claim(&mut h, alice, at(0, 0), at(9, 9)).await;
    h.engine
        .equip_tool(alice, ToolMode::Subclaim, Capabilities::player())
        .expect("equip");
    click(&mut h.engine, alice, at(0, 0));
    let child = match click(&mut h.engine, alice, at(3, 3)) {
        ToolOutcome::Created(claim) => claim.key.expect("key"),
        other => panic!("unexpected {other:?}"),
    };
    h.engine.settle().await;

    h.engine
        .equip_tool(alice, ToolMode::Resize, Capabilities::player())
        .expect("equip");
    assert_eq!(click(&mut h.engine, alice, at(0, 0)), ToolOutcome::Started);
    match click(&mut h.engine, alice, at(-5, -5)) {
        ToolOutcome::Resized(claim) => assert_eq!(claim.key, Some(parent)),
        other => panic!("unexpected {other:?}"),
    }
    h.engine.settle().await;
    let grown = h.engine.claim(parent).expect("parent");
    assert_eq!((grown.lower.x, grown.lower.z), (-5, -5));
    let untouched = h.engine.claim(child).expect("child");
    assert_eq!((untouched.lower.x, untouched.upper.x), (0, 3));
}

#[tokio::test]
async fn subclaim_resize_stays_inside_parent() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    basic_claim(&mut h, alice, at(0, 0), at(9, 9)).await;
    h.engine
        .equip_tool(alice, ToolMode::Subclaim, Capabilities::player())
        .expect("equip");
    click(&mut h.engine, alice, at(2, 2));
    click(&mut h.engine, alice, at(4, 4));
    h.engine.settle().await;

    h.engine
        .equip_tool(alice, ToolMode::Resize, Capabilities::player())
        .expect("equip");
    click(&mut h.engine, alice, at(4, 4));
    assert_eq!(
        click(&mut h.engine, alice, at(12, 4)),
        ToolOutcome::Rejected(ToolRejection::OutsideParent)
    );
    assert!(pending(&h, alice));
    assert!(matches!(click(&mut h.engine, alice, at(6, 6)), ToolOutcome::Resized(_)));
    assert_eq!(blocks(&h, alice), 900);
}

#[tokio::test]
async fn admin_claims_need_admin_resize() {
    let mut h = harness();
    let admin = Uuid::new_v4();
    h.engine.on_login(admin, "admin");
    let caps = Capabilities::admin();
    h.engine.equip_tool(admin, ToolMode::Admin, caps).expect("equip");
    click_as(&mut h.engine, admin, at(0, 0), caps);
    click_as(&mut h.engine, admin, at(9, 9), caps);
    h.engine.settle().await;

    h.engine.equip_tool(admin, ToolMode::Resize, caps).expect("equip");
    assert_eq!(
        click_as(&mut h.engine, admin, at(9, 9), Capabilities::player()),
        ToolOutcome::Rejected(ToolRejection::NoPermission)
    );
    assert_eq!(click_as(&mut h.engine, admin, at(9, 9), caps), ToolOutcome::Started);
    assert!(matches!(
        click_as(&mut h.engine, admin, at(19, 19), caps),
        ToolOutcome::Resized(_)
    ));
    assert_eq!(blocks(&h, admin), 1000);
}

#[tokio::test]
async fn delete_needs_confirmation_inside_the_claim() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    h.engine.on_login(bob, "bob");
    let key = basic_claim(&mut h, alice, at(0, 0), at(9, 9)).await;
    for player in [alice, bob] {
        h.engine
            .equip_tool(player, ToolMode::Delete, Capabilities::player())
            .expect("equip");
    }

    assert_eq!(
        click(&mut h.engine, bob, at(1, 1)),
        ToolOutcome::Rejected(ToolRejection::NotOwner)
    );

    assert_eq!(click(&mut h.engine, alice, at(1, 1)), ToolOutcome::Started);
    assert_eq!(h.visualizer.last_style(), Some(HighlightStyle::Delete));
    assert_eq!(click(&mut h.engine, alice, at(50, 50)), ToolOutcome::Cancelled);
    assert!(!pending(&h, alice));
    assert!(h.engine.claim(key).is_some());

    click(&mut h.engine, alice, at(1, 1));
    assert_eq!(click(&mut h.engine, alice, at(8, 2)), ToolOutcome::Deleted(key));
    assert!(h.engine.claim_at(&at(1, 1), true).is_none());
    h.engine.settle().await;
    assert!(h.engine.claim(key).is_none());
    assert_eq!(blocks(&h, alice), 900);
}

#[tokio::test]
async fn inspect_previews_the_claim_under_the_cursor() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    let key = basic_claim(&mut h, alice, at(0, 0), at(9, 9)).await;
    assert_eq!(h.engine.inspect(alice, &at(3, 3)), Some(key));
    assert_eq!(h.visualizer.last_style(), Some(HighlightStyle::Basic));
    assert_eq!(h.engine.inspect(alice, &at(30, 30)), None);
}
