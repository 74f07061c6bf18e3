//! Reads issued in the same tick as a mutation, and what the store holds
//! once the writes land.
mod common;

use std::sync::Arc;

use claimwarden::claims::{
    ClaimEngine, ClaimKey, ClaimPermission, ClaimStore, Collaborators, Location, MemoryClaimStore,
    PermissionKey, PermissionLevel, PlayerId, ToolOutcome, ToolRejection,
};
use common::{at, click, harness, test_settings, Harness};
use uuid::Uuid;

fn claim_for(h: &mut Harness, owner: PlayerId, a: Location, b: Location) -> ClaimKey {
    let claim = h
        .engine
        .create_claim(&a, &b, owner)
        .into_claim()
        .expect("claim");
    h.engine.insert_claim(claim).expect("insert")
}

#[tokio::test]
async fn tool_sees_claim_created_earlier_in_the_tick() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    h.engine.on_login(bob, "bob");

    assert_eq!(click(&mut h.engine, alice, at(0, 0)), ToolOutcome::Started);
    assert!(matches!(
        click(&mut h.engine, alice, at(10, 10)),
        ToolOutcome::Created(_)
    ));
    h.engine.pump();

    assert_eq!(
        click(&mut h.engine, bob, at(5, 5)),
        ToolOutcome::Rejected(ToolRejection::AlreadyClaimed)
    );
    assert_eq!(click(&mut h.engine, bob, at(15, 15)), ToolOutcome::Started);
    match click(&mut h.engine, bob, at(5, 5)) {
        ToolOutcome::Rejected(ToolRejection::Overlap(conflicts)) => {
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].owner, alice);
        }
        other => panic!("unexpected {other:?}"),
    }

    h.engine.settle().await;
    assert_eq!(h.engine.top_level_claims().len(), 1);
    assert_eq!(h.engine.store().load_claims().expect("claims").len(), 1);
}

#[tokio::test]
async fn sibling_subclaims_conflict_before_settle() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    let parent_key = claim_for(&mut h, alice, at(0, 0), at(19, 19));
    let parent = h.engine.claim(parent_key).cloned().expect("parent");

    let mut shop = h
        .engine
        .create_subclaim(&at(2, 2), &at(6, 6), &parent)
        .into_claim()
        .expect("subclaim");
    shop.parent = Some(parent_key);
    h.engine.insert_claim(shop).expect("insert");

    let overlap = h.engine.create_subclaim(&at(5, 5), &at(9, 9), &parent);
    assert_eq!(overlap.overlaps().len(), 1);
}

#[tokio::test]
async fn subclaim_floor_matches_parent_for_same_click_height() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    let parent_key = claim_for(&mut h, alice, at(0, 0), at(19, 19));
    let parent = h.engine.claim(parent_key).cloned().expect("parent");

    let sub = h
        .engine
        .create_subclaim(&at(2, 2), &at(6, 6), &parent)
        .into_claim()
        .expect("subclaim");
    assert_eq!(parent.lower.y, 64 - h.engine.settings().auto_depth);
    assert_eq!(sub.lower.y, parent.lower.y);
}

#[tokio::test]
async fn extend_then_transfer_in_one_tick_keeps_both() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    h.engine.on_login(bob, "bob");
    let key = claim_for(&mut h, alice, at(0, 0), at(9, 9));

    assert_eq!(h.engine.extend(key, 30).expect("extend"), 1);
    h.engine.transfer(key, bob).expect("transfer");
    let cached = h.engine.claim(key).cloned().expect("cached");
    assert_eq!((cached.owner, cached.lower.y), (bob, 25));

    h.engine.settle().await;
    let stored = h.engine.store().load_claims().expect("claims");
    assert_eq!(stored.len(), 1);
    assert_eq!((stored[0].owner, stored[0].lower.y), (bob, 25));
}

#[tokio::test]
async fn grant_bit_added_right_after_trust_lands_on_new_tier() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    h.engine.on_login(bob, "bob");
    let key = claim_for(&mut h, alice, at(0, 0), at(9, 9));

    h.engine.set_permission(key, bob, PermissionLevel::Build).expect("trust");
    h.engine.add_grant(key, bob).expect("grant");
    h.engine.settle().await;

    assert_eq!(
        h.engine.permission(key, bob).map(|p| p.level),
        Some(PermissionLevel::BuildGrant)
    );
    let stored = h.engine.store().load_permissions().expect("permissions");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].level, PermissionLevel::BuildGrant);
}

#[tokio::test]
async fn removed_trust_stays_removed_after_reopen() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    h.engine.on_login(bob, "bob");
    let key = claim_for(&mut h, alice, at(0, 0), at(9, 9));

    h.engine.set_permission(key, bob, PermissionLevel::Access).expect("trust");
    h.engine.set_permission(key, bob, PermissionLevel::Build).expect("retrust");
    h.engine.settle().await;
    assert_eq!(h.engine.store().load_permissions().expect("permissions").len(), 1);

    assert!(h.engine.remove_player_permission(key, bob));
    let store = h.engine.store().clone();
    h.engine.shutdown().await.expect("shutdown");
    assert!(store.load_permissions().expect("permissions").is_empty());

    let engine = ClaimEngine::open(test_settings(), store, Collaborators::default()).expect("reopen");
    assert!(!engine.allows(key, bob, PermissionLevel::Access));
    assert!(engine.permission(key, bob).is_none());
}

#[tokio::test]
async fn duplicate_permission_records_are_dropped_on_open() {
    let store = Arc::new(MemoryClaimStore::new());
    let claim = ClaimKey(1);
    let bob = Uuid::new_v4();
    for (key, level) in [(2, PermissionLevel::Access), (3, PermissionLevel::Container)] {
        let mut record = ClaimPermission::new(claim, bob, level);
        record.key = Some(PermissionKey(key));
        store.put_permission(&record).expect("put");
    }

    let engine = ClaimEngine::open(
        test_settings(),
        store.clone() as Arc<dyn ClaimStore>,
        Collaborators::default(),
    )
    .expect("engine");
    assert_eq!(
        engine.permission(claim, bob).map(|p| p.level),
        Some(PermissionLevel::Container)
    );
    let stored = store.load_permissions().expect("permissions");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].level, PermissionLevel::Container);
}

#[tokio::test]
async fn pending_writes_drain_on_settle() {
    let mut h = harness();
    let alice = Uuid::new_v4();
    h.engine.on_login(alice, "alice");
    claim_for(&mut h, alice, at(0, 0), at(9, 9));
    assert!(h.engine.pending_writes() > 0);
    h.engine.settle().await;
    assert_eq!(h.engine.pending_writes(), 0);
}
