//! # End-to-End Scenarios
//!
//! 1. **Power fallback**: creator and strangers before and after a
//!    `m.room.power_levels` event
//! 2. **Depth order**: room events iterate by depth, not by index
//! 3. **Deferred redaction**: a redaction that arrives before its target

#[cfg(test)]
mod tests {
    use mx_03_event_indexing::StorageContext;
    use serde_json::json;

    use crate::fixtures::*;

    // =============================================================================
    // SCENARIO A: POWER FALLBACK
    // =============================================================================

    #[test]
    fn test_creator_and_stranger_without_power_levels() {
        let store = StorageContext::in_memory();
        commit(&store, &create("create"), 1);

        let power = store.room(ROOM).power().unwrap();
        assert!(!power.has_power_levels());
        assert_eq!(power.level_user(ALICE), 100);
        assert_eq!(power.level_user(BOB), 0);
        assert_eq!(power.level_user("@carol:other.org"), 0);
    }

    #[test]
    fn test_users_default_applies_once_power_levels_arrive() {
        let store = StorageContext::in_memory();
        commit(&store, &create("create"), 1);
        commit(&store, &join("alice", ALICE, 2, &["create"]), 2);
        commit(
            &store,
            &power_levels(
                "power",
                3,
                &["alice"],
                json!({"users": {"@alice:example.org": 100}, "users_default": 10}),
            ),
            3,
        );

        let power = store.room(ROOM).power().unwrap();
        assert!(power.has_power_levels());
        assert_eq!(power.level_user(ALICE), 100);
        assert_eq!(power.level_user(BOB), 10);
    }

    // =============================================================================
    // SCENARIO B: DEPTH ORDER
    // =============================================================================

    #[test]
    fn test_depth_governs_order_not_commit_order() {
        let store = StorageContext::in_memory();
        commit(&store, &message("deep", 5, &[]), 42);
        commit(&store, &message("shallow", 3, &[]), 43);

        let events = store.room(ROOM).events();

        let mut ascending = Vec::new();
        events
            .for_each(.., |_, idx| {
                ascending.push(idx);
                true
            })
            .unwrap();
        assert_eq!(ascending, vec![43, 42]);

        let mut descending = Vec::new();
        events
            .rfor_each(.., |depth, idx| {
                descending.push((depth, idx));
                true
            })
            .unwrap();
        assert_eq!(descending, vec![(5, 42), (3, 43)]);

        assert_eq!(events.top().unwrap(), Some((5, 42)));
        assert_eq!(events.count(4..).unwrap(), 1);
    }

    // =============================================================================
    // SCENARIO C: DEFERRED REDACTION
    // =============================================================================

    #[test]
    fn test_redaction_before_target_matches_in_order_delivery() {
        let create = create("create");
        let topic = topic("topic", "secret", 2, &["create"]);
        let redact = redaction("redact", "topic", 3, &["topic"]);

        let in_order = StorageContext::in_memory();
        commit(&in_order, &create, 1);
        commit(&in_order, &topic, 2);
        commit(&in_order, &redact, 3);

        let deferred = StorageContext::in_memory();
        commit(&deferred, &create, 1);
        commit(&deferred, &redact, 3);

        let horizon = deferred.room(ROOM).horizon();
        let mut pending = Vec::new();
        horizon
            .for_each(|id, referrer| {
                pending.push((id.to_string(), referrer));
                true
            })
            .unwrap();
        assert_eq!(pending, vec![(event_id("topic"), 3)]);

        commit(&deferred, &topic, 2);

        assert_eq!(horizon.count().unwrap(), 0);
        for store in [&in_order, &deferred] {
            let state = store.room(ROOM).state();
            assert_eq!(state.get("m.room.topic", "").unwrap(), None);
            assert!(state.has("m.room.create", "").unwrap());
            assert!(store.is_redacted(&event_id("topic")).unwrap());
            assert_eq!(
                store.room(ROOM).head().ids().unwrap(),
                vec![event_id("redact")]
            );
        }
        assert_eq!(
            in_order.engine().snapshot(),
            deferred.engine().snapshot()
        );
    }

    #[test]
    fn test_missing_reports_clear_after_target_arrives() {
        let store = StorageContext::in_memory();
        commit(&store, &create("create"), 1);
        commit(&store, &message("child", 3, &["parent"]), 2);

        let missing = store.room(ROOM).missing();
        let mut ids = Vec::new();
        missing
            .for_each(.., |id, depth, referrer| {
                ids.push((id.to_string(), depth, referrer));
                true
            })
            .unwrap();
        assert_eq!(ids, vec![(event_id("parent"), 3, 2)]);

        commit(&store, &message("parent", 2, &["create"]), 3);
        assert_eq!(missing.count(..).unwrap(), 0);
        assert_eq!(store.room(ROOM).horizon().count().unwrap(), 0);
    }
}
