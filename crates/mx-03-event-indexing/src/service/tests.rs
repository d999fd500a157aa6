use serde_json::json;
use shared_types::{event_types, EventField, EventIndexState};

use crate::domain::appendix::{Appendix, Index, RefMask, RefType};
use crate::domain::columns::Column;
use crate::domain::errors::{KvError, StorageError};
use crate::domain::keys::event_horizon_key;
use crate::domain::txn::WriteTxn;
use crate::domain::write_opts::{Op, WriteOpts};
use crate::ports::outbound::KvEngine;
use crate::test_utils::*;

// =============================================================================
// Write contract
// =============================================================================

#[test]
fn test_write_without_index_is_rejected() {
    let ctx = store();
    let mut txn = WriteTxn::new();
    let err = ctx
        .write(&mut txn, &message("$m", 2, &[]), &WriteOpts::default())
        .unwrap_err();
    assert_eq!(
        err,
        StorageError::MissingIndex {
            event_id: "$m".into()
        }
    );
    assert!(txn.is_empty());
}

#[test]
fn test_blacklist_is_distinct_from_unknown() {
    let ctx = store();
    let mut txn = WriteTxn::new();
    let staged = ctx
        .write(&mut txn, &message("$bad", 2, &[]), &WriteOpts::blacklist())
        .unwrap();
    assert_eq!(staged, 1);
    ctx.commit(txn).unwrap();

    assert_eq!(ctx.find_event_idx("$bad").unwrap(), EventIndexState::Blacklisted);
    assert_eq!(ctx.find_event_idx("$never").unwrap(), EventIndexState::Unindexed);
    assert!(ctx.exists("$bad").unwrap());
    assert!(!ctx.good("$bad").unwrap());
    assert!(ctx.fetch_by_id("$bad").unwrap().is_none());
}

#[test]
fn test_failed_write_leaves_txn_untouched() {
    let ctx = store();
    let mut txn = WriteTxn::new();
    ctx.write(&mut txn, &create("$create"), &WriteOpts::indexed(1))
        .unwrap();
    let before = txn.len();

    let mut broken = state("$topic", "m.room.topic", "", 2, &["$create"], json!({}));
    broken.depth = None;
    let err = ctx
        .write(&mut txn, &broken, &WriteOpts::indexed(2))
        .unwrap_err();
    assert!(matches!(err, StorageError::MissingField { field: "depth", .. }));
    assert_eq!(txn.len(), before);
}

#[test]
fn test_nul_in_key_component_is_refused() {
    let ctx = store();
    let mut txn = WriteTxn::new();
    let nested = state("$nested", "m.room.topic", "a\0b", 2, &[], json!({}));
    let err = ctx
        .write(&mut txn, &nested, &WriteOpts::indexed(2))
        .unwrap_err();
    assert_eq!(
        err,
        StorageError::NulInKey {
            event_id: "$nested".into(),
            field: "state_key"
        }
    );
    assert!(txn.is_empty());

    let dangling = message("$m", 3, &["$a\0b"]);
    let err = ctx
        .write(&mut txn, &dangling, &WriteOpts::indexed(3))
        .unwrap_err();
    assert!(matches!(err, StorageError::NulInKey { field: "prev_events", .. }));

    commit(&ctx, &state("$plain", "m.room.topic", "a", 4, &[], json!({})), 4);
    assert_eq!(ctx.room(ROOM).state().history("m.room.topic", "a").unwrap().len(), 1);
}

#[test]
fn test_commit_failure_propagates_and_applies_nothing() {
    let ctx = store();
    ctx.engine().set_fail_commits(true);

    let mut txn = WriteTxn::new();
    ctx.write(&mut txn, &create("$create"), &WriteOpts::indexed(1))
        .unwrap();
    let err = ctx.commit(txn).unwrap_err();
    assert!(matches!(err, StorageError::Kv(KvError::Backend { .. })));
    assert!(ctx.engine().is_empty());
}

// =============================================================================
// Reads
// =============================================================================

#[test]
fn test_write_then_read_back() {
    let ctx = store();
    let event = message("$m", 2, &["$create"]);
    commit(&ctx, &event, 7);

    assert_eq!(ctx.find_event_idx("$m").unwrap().idx(), Some(7));
    let fetched = ctx.fetch(7).unwrap().unwrap();
    assert_eq!(fetched, event);
    assert_eq!(
        ctx.get(7, EventField::Sender).unwrap(),
        Some(json!(ALICE))
    );
    assert_eq!(ctx.events_by_sender(ALICE).unwrap(), vec![7]);
    assert_eq!(ctx.events_by_type("m.room.message").unwrap(), vec![7]);
    assert!(ctx.events_by_type("m.room.topic").unwrap().is_empty());
    assert_eq!(ctx.prev_ids(7).unwrap(), vec!["$create".to_string()]);
    assert_eq!(ctx.last_event_idx().unwrap(), 7);
}

#[test]
fn test_fetch_from_columns_without_json() {
    let ctx = store();
    let event = message("$m", 2, &[]);
    let opts = WriteOpts::indexed(3).with_appendix(Appendix::ALL.without(Index::EventJson));
    commit_with(&ctx, &event, &opts);

    assert!(ctx.engine().get(Column::EventJson, &3u64.to_be_bytes()).unwrap().is_none());
    let fetched = ctx.fetch(3).unwrap().unwrap();
    assert_eq!(fetched.id(), Some("$m"));
    assert_eq!(fetched.content_str("body"), Some("hello"));
    assert_eq!(ctx.last_event_idx().unwrap(), 3);
}

#[test]
fn test_appendix_limits_touched_columns() {
    let ctx = store();
    let opts = WriteOpts::indexed(5)
        .with_appendix(Appendix::of(&[Index::EventId, Index::RoomEvents]));
    commit_with(&ctx, &message("$m", 4, &[]), &opts);

    let snapshot = ctx.engine().snapshot();
    let columns: Vec<_> = snapshot.keys().copied().collect();
    assert_eq!(
        columns,
        vec![Column::EventIdx, Column::EventIdxMax, Column::RoomEvents]
    );
}

#[test]
fn test_last_event_idx_survives_deleting_newest() {
    let ctx = store();
    commit(&ctx, &create("$create"), 1);
    let newest = message("$m", 2, &["$create"]);
    commit(&ctx, &newest, 5);
    commit(&ctx, &message("$older", 2, &["$create"]), 3);
    assert_eq!(ctx.last_event_idx().unwrap(), 5);

    commit_with(&ctx, &newest, &WriteOpts::indexed(5).with_op(Op::Delete));
    assert_eq!(ctx.find_event_idx("$m").unwrap(), EventIndexState::Unindexed);
    assert!(ctx.fetch(5).unwrap().is_none());
    assert_eq!(ctx.last_event_idx().unwrap(), 5);
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_rewrite_with_same_idx_is_idempotent() {
    let ctx = store();
    commit(&ctx, &create("$create"), 1);
    let topic = state(
        "$topic",
        "m.room.topic",
        "",
        2,
        &["$create"],
        json!({"topic": "rust"}),
    );
    commit(&ctx, &topic, 2);
    let first = ctx.engine().snapshot();

    commit(&ctx, &topic, 2);
    assert_eq!(ctx.engine().snapshot(), first);
}

// =============================================================================
// Depth ordering
// =============================================================================

#[test]
fn test_depth_governs_room_event_order() {
    let ctx = store();
    commit(&ctx, &message("$deep", 5, &[]), 42);
    commit(&ctx, &message("$shallow", 3, &[]), 43);

    let room = ctx.room(ROOM);
    let mut ascending = Vec::new();
    room.events()
        .for_each(.., |_, idx| {
            ascending.push(idx);
            true
        })
        .unwrap();
    assert_eq!(ascending, vec![43, 42]);

    let mut descending = Vec::new();
    room.events()
        .rfor_each(.., |depth, idx| {
            descending.push((depth, idx));
            true
        })
        .unwrap();
    assert_eq!(descending, vec![(5, 42), (3, 43)]);
    assert_eq!(room.events().top().unwrap(), Some((5, 42)));
    assert_eq!(room.events().count(4..).unwrap(), 1);
}

// =============================================================================
// Horizon
// =============================================================================

#[test]
fn test_horizon_resolves_when_reference_arrives() {
    let ctx = store();
    commit(&ctx, &message("$x", 3, &["$y"]), 2);

    let room = ctx.room(ROOM);
    let mut missing = Vec::new();
    room.missing()
        .for_each(.., |id, _, referrer| {
            missing.push((id.to_string(), referrer));
            true
        })
        .unwrap();
    assert_eq!(missing, vec![("$y".to_string(), 2)]);
    assert_eq!(room.horizon().count().unwrap(), 1);

    commit(&ctx, &message("$y", 2, &[]), 3);
    assert_eq!(room.missing().count(..).unwrap(), 0);
    assert_eq!(room.horizon().count().unwrap(), 0);
    assert_eq!(
        ctx.event_refs(3, RefMask::ALL).unwrap(),
        vec![(RefType::Next, 2)]
    );
}

#[test]
fn test_delete_returns_referrers_to_horizon() {
    let ctx = store();
    let y = message("$y", 2, &[]);
    commit(&ctx, &y, 1);
    commit(&ctx, &message("$x", 3, &["$y"]), 2);
    assert_eq!(ctx.room(ROOM).horizon().count().unwrap(), 0);

    commit_with(&ctx, &y, &WriteOpts::indexed(1).with_op(Op::Delete));
    assert_eq!(ctx.find_event_idx("$y").unwrap(), EventIndexState::Unindexed);
    assert_eq!(ctx.room(ROOM).horizon().count().unwrap(), 1);
    assert_eq!(ctx.room(ROOM).missing().count(..).unwrap(), 1);
}

#[test]
fn test_child_before_parent_in_one_txn() {
    let ctx = store();
    let mut builder = ctx.txn();
    builder.append(&message("$b", 3, &["$a"]), 2).unwrap();
    builder.append(&message("$a", 2, &[]), 3).unwrap();
    builder.commit().unwrap();

    let room = ctx.room(ROOM);
    assert_eq!(room.horizon().count().unwrap(), 0);
    assert_eq!(room.missing().count(..).unwrap(), 0);
    assert_eq!(
        ctx.event_refs(3, RefMask::ALL).unwrap(),
        vec![(RefType::Next, 2)]
    );
    assert_eq!(room.head().ids().unwrap(), vec!["$b".to_string()]);
}

#[test]
fn test_one_txn_matches_separate_commits() {
    let events = [
        (message("$b", 3, &["$a"]), 2),
        (message("$a", 2, &[]), 3),
    ];

    let batched = store();
    let mut builder = batched.txn();
    for (event, idx) in &events {
        builder.append(event, *idx).unwrap();
    }
    builder.commit().unwrap();

    let separate = store();
    for (event, idx) in &events {
        commit(&separate, event, *idx);
    }

    assert_eq!(batched.engine().snapshot(), separate.engine().snapshot());
}

#[test]
fn test_horizon_entry_records_referrer_room() {
    let ctx = store();
    commit(&ctx, &message("$x", 3, &["$y"]), 2);
    let mut elsewhere = message("$o", 3, &["$w"]);
    elsewhere.room_id = Some("!other:example.org".into());
    commit(&ctx, &elsewhere, 3);

    assert_eq!(
        ctx.engine()
            .get(Column::EventHorizon, &event_horizon_key("$y", 2))
            .unwrap(),
        Some(ROOM.as_bytes().to_vec())
    );

    let mut entries = Vec::new();
    ctx.room(ROOM)
        .horizon()
        .for_each(|id, referrer| {
            entries.push((id.to_string(), referrer));
            true
        })
        .unwrap();
    assert_eq!(entries, vec![("$y".to_string(), 2)]);
    assert_eq!(ctx.room("!other:example.org").horizon().count().unwrap(), 1);
}

#[test]
fn test_rebuild_is_idempotent() {
    let ctx = store();
    let opts = WriteOpts::indexed(2).with_appendix(Appendix::ALL.without(Index::EventHorizon));
    commit_with(&ctx, &message("$x", 3, &["$y", "$z"]), &opts);
    commit(&ctx, &message("$z", 2, &[]), 3);

    let horizon = ctx.room(ROOM).horizon();
    assert_eq!(horizon.count().unwrap(), 0);
    assert_eq!(horizon.rebuild().unwrap(), 1);
    assert_eq!(horizon.count().unwrap(), 1);
    assert_eq!(horizon.rebuild().unwrap(), 1);
    assert_eq!(horizon.count().unwrap(), 1);
}

// =============================================================================
// Room head
// =============================================================================

#[test]
fn test_head_tracks_unreferenced_events() {
    let ctx = store();
    commit(&ctx, &create("$create"), 1);
    commit(&ctx, &message("$a", 2, &["$create"]), 2);
    assert_eq!(ctx.room(ROOM).head().ids().unwrap(), vec!["$a".to_string()]);
}

#[test]
fn test_head_out_of_order() {
    let ctx = store();
    commit(&ctx, &message("$a", 2, &["$create"]), 1);
    commit(&ctx, &create("$create"), 2);

    let head = ctx.room(ROOM).head();
    assert!(head.has("$a").unwrap());
    assert!(!head.has("$create").unwrap());
    assert_eq!(head.count().unwrap(), 1);
}

// =============================================================================
// State and redaction
// =============================================================================

#[test]
fn test_room_state_last_writer_wins() {
    let ctx = store();
    commit(&ctx, &create("$create"), 1);
    commit(
        &ctx,
        &state("$t1", "m.room.topic", "", 2, &["$create"], json!({"topic": "a"})),
        2,
    );
    commit(
        &ctx,
        &state("$t2", "m.room.topic", "", 3, &["$t1"], json!({"topic": "b"})),
        3,
    );

    let state_view = ctx.room(ROOM).state();
    assert_eq!(state_view.get("m.room.topic", "").unwrap(), Some(3));
    assert_eq!(state_view.history("m.room.topic", "").unwrap(), vec![(2, 2), (3, 3)]);
    assert_eq!(state_view.count(None).unwrap(), 2);
    assert_eq!(state_view.count(Some("m.room.topic")).unwrap(), 1);
    assert_eq!(
        state_view.content("m.room.topic", "").unwrap().unwrap()["topic"],
        json!("b")
    );
}

#[test]
fn test_redaction_removes_known_state() {
    let ctx = store();
    commit(&ctx, &create("$create"), 1);
    commit(
        &ctx,
        &state("$topic", "m.room.topic", "", 2, &["$create"], json!({"topic": "a"})),
        2,
    );
    commit(&ctx, &redaction("$r", "$topic", 3, &["$topic"]), 3);

    assert!(!ctx.room(ROOM).state().has("m.room.topic", "").unwrap());
    assert!(ctx.is_redacted("$topic").unwrap());
    assert!(ctx.room(ROOM).state().has(event_types::CREATE, "").unwrap());
}

#[test]
fn test_redaction_of_message_leaves_state() {
    let ctx = store();
    commit(&ctx, &create("$create"), 1);
    commit(&ctx, &message("$m", 2, &["$create"]), 2);
    commit(&ctx, &redaction("$r", "$m", 3, &["$m"]), 3);

    assert_eq!(ctx.room(ROOM).state().count(None).unwrap(), 1);
    assert!(ctx.is_redacted("$m").unwrap());
}

#[test]
fn test_redaction_in_same_txn() {
    let ctx = store();
    let mut builder = ctx.txn();
    builder.append(&create("$create"), 1).unwrap();
    builder
        .append(
            &state("$topic", "m.room.topic", "", 2, &["$create"], json!({})),
            2,
        )
        .unwrap();
    builder.append(&redaction("$r", "$topic", 3, &["$topic"]), 3).unwrap();
    builder.commit().unwrap();

    assert!(!ctx.room(ROOM).state().has("m.room.topic", "").unwrap());
}

#[test]
fn test_deferred_redaction_applies_when_target_arrives() {
    let ctx = store();
    commit(&ctx, &create("$create"), 1);
    commit(&ctx, &redaction("$r", "$topic", 4, &["$create"]), 2);
    assert_eq!(ctx.room(ROOM).horizon().count().unwrap(), 1);

    commit(
        &ctx,
        &state("$topic", "m.room.topic", "", 2, &["$create"], json!({"topic": "a"})),
        3,
    );

    let room = ctx.room(ROOM);
    assert_eq!(room.horizon().count().unwrap(), 0);
    assert!(!room.state().has("m.room.topic", "").unwrap());
    assert!(ctx.is_redacted("$topic").unwrap());
    assert_eq!(room.state().history("m.room.topic", "").unwrap(), vec![(2, 3)]);
}

#[test]
fn test_redaction_before_target_in_one_txn() {
    let ctx = store();
    commit(&ctx, &create("$create"), 1);

    let mut builder = ctx.txn();
    builder
        .append(&redaction("$r", "$topic", 4, &["$create"]), 2)
        .unwrap();
    builder
        .append(
            &state("$topic", "m.room.topic", "", 3, &["$create"], json!({"topic": "a"})),
            3,
        )
        .unwrap();
    builder.commit().unwrap();

    let room = ctx.room(ROOM);
    assert_eq!(room.horizon().count().unwrap(), 0);
    assert!(!room.state().has("m.room.topic", "").unwrap());
    assert!(ctx.is_redacted("$topic").unwrap());
    assert_eq!(
        ctx.event_refs(3, RefMask::of(&[RefType::Redaction])).unwrap(),
        vec![(RefType::Redaction, 2)]
    );
}

#[test]
fn test_joined_members() {
    let ctx = store();
    commit(&ctx, &create("$create"), 1);
    commit(&ctx, &member("$j1", ALICE, "join", 2, &["$create"]), 2);
    commit(&ctx, &member("$j2", BOB, "join", 3, &["$j1"]), 3);

    let joined = ctx.room(ROOM).joined();
    assert_eq!(joined.count(None).unwrap(), 2);
    assert_eq!(
        joined.servers().unwrap(),
        vec!["example.org".to_string(), "other.org".to_string()]
    );

    commit(&ctx, &member("$l2", BOB, "leave", 4, &["$j2"]), 4);
    assert!(!joined.has(BOB).unwrap());
    assert!(joined.has(ALICE).unwrap());
    assert_eq!(joined.count(Some("other.org")).unwrap(), 0);
}

// =============================================================================
// Power levels
// =============================================================================

#[test]
fn test_power_levels_from_room_state() {
    let ctx = store();
    commit(&ctx, &create("$create"), 1);

    let power = ctx.room(ROOM).power().unwrap();
    assert_eq!(power.level_user(ALICE), 100);
    assert_eq!(power.level_user(BOB), 0);

    commit(
        &ctx,
        &state(
            "$pl",
            event_types::POWER_LEVELS,
            "",
            2,
            &["$create"],
            json!({"users": {ALICE: 100}, "users_default": 10}),
        ),
        2,
    );
    let power = ctx.room(ROOM).power().unwrap();
    assert_eq!(power.level_user(BOB), 10);
    assert_eq!(power.level_user(ALICE), 100);
}

#[test]
fn test_empty_power_levels_still_replaces_creator_fallback() {
    let ctx = store();
    commit(&ctx, &create("$create"), 1);
    commit(
        &ctx,
        &state("$pl", event_types::POWER_LEVELS, "", 2, &["$create"], json!({})),
        2,
    );

    let power = ctx.room(ROOM).power().unwrap();
    assert!(power.has_power_levels());
    assert_eq!(power.level_user(ALICE), 0);
}
