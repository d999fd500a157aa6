//! # Store Properties
//!
//! Checks that hold for any event or delivery order, exercised over a
//! small room DAG and randomized orders:
//!
//! - Rewriting an event changes nothing
//! - Room events sort by depth whatever order indices were assigned in
//! - Any delivery order converges to the in-order store
//! - Conformity reports are pure
//! - Blacklisted ids stay distinct from unseen ones

#[cfg(test)]
mod tests {
    use mx_03_event_indexing::{Column, StorageContext, WriteOpts, WriteTxn};
    use mx_04_event_conformity::{conforms, Report, NUM_CODES};
    use mx_06_room_power::{compose_content, RoomPower};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use serde_json::{json, Value};
    use shared_types::{Event, EventIdx, EventIndexState};

    use crate::fixtures::*;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// A forked and merged room history with state, members and
    /// redactions, each event paired with its index.
    fn room_dag() -> Vec<(Event, EventIdx)> {
        vec![
            (create("create"), 1),
            (join("alice", ALICE, 2, &["create"]), 2),
            (join("bob", BOB, 3, &["alice"]), 3),
            (topic("topic", "first", 4, &["bob"]), 4),
            (message("left", 5, &["topic"]), 5),
            (message("right", 5, &["topic"]), 6),
            (message("merge", 6, &["left", "right"]), 7),
            (redaction("redact-topic", "topic", 7, &["merge"]), 8),
            (redaction("redact-left", "left", 7, &["merge"]), 9),
        ]
    }

    fn deliver(events: &[(Event, EventIdx)]) -> MemoryStore {
        let store = StorageContext::in_memory();
        for (event, idx) in events {
            commit(&store, event, *idx);
        }
        store
    }

    // =============================================================================
    // INDEXING
    // =============================================================================

    #[test]
    fn test_rewrite_is_idempotent() {
        let store = deliver(&room_dag());
        let before = store.engine().snapshot();

        for (event, idx) in room_dag() {
            commit(&store, &event, idx);
        }
        assert_eq!(store.engine().snapshot(), before);
    }

    #[test]
    fn test_depth_order_independent_of_index_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut depths: Vec<i64> = (-3..12).collect();
        depths.shuffle(&mut rng);

        let store = StorageContext::in_memory();
        for (i, depth) in depths.iter().enumerate() {
            commit(&store, &message(&format!("m{i}"), *depth, &[]), i as EventIdx + 1);
        }

        let mut seen = Vec::new();
        store
            .room(ROOM)
            .events()
            .for_each(.., |depth, _| {
                seen.push(depth);
                true
            })
            .unwrap();

        let mut sorted = depths.clone();
        sorted.sort_unstable();
        assert_eq!(seen, sorted);
    }

    #[test]
    fn test_any_delivery_order_converges() {
        let dag = room_dag();
        let expected = deliver(&dag).engine().snapshot();
        assert!(!expected.contains_key(&Column::EventHorizon));

        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut order = dag.clone();
            order[1..].shuffle(&mut rng);

            let store = deliver(&order);
            assert_eq!(
                store.engine().snapshot(),
                expected,
                "delivery order {:?} diverged",
                order.iter().map(|(_, idx)| *idx).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_converged_views() {
        let store = deliver(&room_dag());
        let room = store.room(ROOM);

        let mut heads = room.head().ids().unwrap();
        heads.sort();
        assert_eq!(heads, vec![event_id("redact-left"), event_id("redact-topic")]);

        assert!(!room.state().has("m.room.topic", "").unwrap());
        assert_eq!(room.state().history("m.room.topic", "").unwrap().len(), 1);
        assert_eq!(room.joined().count(None).unwrap(), 2);
        assert!(store.is_redacted(&event_id("left")).unwrap());
        assert!(!store.is_redacted(&event_id("right")).unwrap());
        assert_eq!(room.missing().count(..).unwrap(), 0);
    }

    // =============================================================================
    // CONFORMITY
    // =============================================================================

    #[test]
    fn test_conformity_is_pure() {
        let mut rng = StdRng::seed_from_u64(30);
        for (event, _) in room_dag() {
            let full = conforms(&event, Report::CLEAN);
            assert_eq!(conforms(&event, Report::CLEAN), full);

            for _ in 0..8 {
                let skip = Report::from_bits(rng.gen::<u64>());
                assert_eq!(conforms(&event, skip), full.without(skip));
            }
            assert!(conforms(&event, Report::ALL).clean());
        }
        assert_eq!(Report::ALL.count(), NUM_CODES);
    }

    #[test]
    fn test_fixture_events_conform() {
        for (event, _) in room_dag() {
            let report = conforms(&event, Report::CLEAN);
            assert!(report.clean(), "{:?}: {}", event.id(), report);
        }
    }

    // =============================================================================
    // BLACKLIST
    // =============================================================================

    #[test]
    fn test_blacklist_distinct_from_unseen() {
        let store = StorageContext::in_memory();
        let bad = message("bad", 2, &[]);

        let mut builder = store.txn();
        builder.blacklist(&bad).unwrap();
        builder.commit().unwrap();

        let id = event_id("bad");
        assert_eq!(store.find_event_idx(&id).unwrap(), EventIndexState::Blacklisted);
        assert!(store.exists(&id).unwrap());
        assert!(!store.good(&id).unwrap());
        assert_eq!(
            store.find_event_idx(&event_id("never")).unwrap(),
            EventIndexState::Unindexed
        );
        assert_eq!(store.last_event_idx().unwrap(), 0);
    }

    #[test]
    fn test_write_without_index_or_blacklist_is_refused() {
        let store = StorageContext::in_memory();
        let mut txn = WriteTxn::new();
        let result = store.write(&mut txn, &message("m", 1, &[]), &WriteOpts::default());
        assert!(result.is_err());
        assert!(txn.is_empty());
    }

    // =============================================================================
    // POWER LEVELS
    // =============================================================================

    #[test]
    fn test_composed_power_levels_round_trip_through_store() {
        let overrides = json!({"users_default": 10, "users": {"@bob:example.org": 50}});
        let Value::Object(overrides) = overrides else {
            unreachable!()
        };
        let content = compose_content(ALICE, &overrides);

        let store = StorageContext::in_memory();
        commit(&store, &create("create"), 1);
        commit(
            &store,
            &power_levels("power", 2, &["create"], Value::Object(content.clone())),
            2,
        );

        let loaded = store.room(ROOM).power().unwrap();
        assert_eq!(loaded, RoomPower::from_content(content));
        assert_eq!(loaded.level_user(ALICE), 100);
        assert_eq!(loaded.level_user(BOB), 50);
        assert_eq!(loaded.level_user("@carol:other.org"), 10);
    }
}
