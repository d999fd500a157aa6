//! # Evaluation Pipeline
//!
//! The node runtime's evaluator driving conformity and indexing together.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use mx_03_event_indexing::{InMemoryKvEngine, StorageContext};
    use mx_04_event_conformity::{Code, ConformOpts, ConformityConfig, ConformityService};
    use node_runtime::{EvalError, EvalOpts, EvalOutcome, Evaluator, NodeConfig, Sequencer};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use serde_json::json;
    use shared_types::Event;

    use crate::fixtures::*;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn evaluator() -> Arc<Evaluator<InMemoryKvEngine>> {
        let config = NodeConfig::default().with_server_name("example.org");
        Arc::new(Evaluator::from_config(Arc::new(StorageContext::in_memory()), &config).unwrap())
    }

    /// Server-assigned ids, as the fixtures use.
    fn opts() -> EvalOpts {
        EvalOpts::default().with_room_version("1")
    }

    /// Sent by `other.org`, altered after it was hashed.
    fn tampered(name: &str) -> Event {
        let mut event = message(name, 2, &["create"]);
        event.sender = Some("@bob:other.org".to_string());
        event.origin = Some("other.org".to_string());
        let signatures = json!({"other.org": {"ed25519:1": "c2lnbmF0dXJl"}});
        event.signatures = signatures.as_object().cloned();
        event
    }

    // =============================================================================
    // PIPELINE TESTS
    // =============================================================================

    #[test]
    fn test_room_built_through_pipeline() {
        let eval = evaluator();
        let events = [
            create("create"),
            join("alice", ALICE, 2, &["create"]),
            topic("topic", "hello", 3, &["alice"]),
            message("msg", 4, &["topic"]),
        ];
        for (i, event) in events.iter().enumerate() {
            let outcome = eval.evaluate(event.clone(), &opts()).unwrap();
            assert_eq!(outcome.idx(), i as u64 + 1);
        }

        let store = eval.store();
        let room = store.room(ROOM);
        assert_eq!(room.head().ids().unwrap(), vec![event_id("msg")]);
        assert_eq!(room.state().get("m.room.topic", "").unwrap(), Some(3));
        assert!(room.joined().has(ALICE).unwrap());
        assert_eq!(room.power().unwrap().level_user(ALICE), 100);
    }

    #[test]
    fn test_redelivery_is_duplicate() {
        let eval = evaluator();
        let mut rng = StdRng::seed_from_u64(3);
        let mut events = vec![
            create("create"),
            message("a", 2, &["create"]),
            message("b", 3, &["a"]),
        ];
        for event in &events {
            eval.evaluate(event.clone(), &opts()).unwrap();
        }

        events.shuffle(&mut rng);
        for event in events {
            let outcome = eval.evaluate(event, &opts()).unwrap();
            assert!(matches!(outcome, EvalOutcome::Duplicate(_)));
        }
        assert_eq!(eval.sequencer().current(), 3);
    }

    #[test]
    fn test_rejection_names_violated_rules() {
        let eval = evaluator();
        eval.evaluate(create("create"), &opts()).unwrap();

        let err = eval.evaluate(tampered("remote"), &opts()).unwrap_err();
        let violation = match err {
            EvalError::Rejected(violation) => violation,
            other => panic!("expected rejection, got {other:?}"),
        };
        assert_eq!(violation.reflect(), vec!["MISMATCH_HASHES"]);

        assert!(eval
            .store()
            .find_event_idx(&event_id("remote"))
            .unwrap()
            .is_blacklisted());
    }

    #[test]
    fn test_hash_mismatch_tolerated_when_served_by_origin() {
        let eval = evaluator();
        eval.evaluate(create("create"), &opts()).unwrap();

        let served = opts().with_conform(ConformOpts::strict().with_node_id("other.org"));
        match eval.evaluate(tampered("remote"), &served).unwrap() {
            EvalOutcome::Accepted { report, .. } => {
                assert!(report.has(Code::MismatchHashes));
                assert_eq!(report.count(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_issuing_requires_local_origin() {
        let eval = evaluator();
        let issuing = opts().with_issuing(true).with_blacklist(false);
        let err = eval.evaluate(tampered("remote"), &issuing).unwrap_err();
        assert!(matches!(err, EvalError::Rejected(_)));
        assert!(!eval.store().exists(&event_id("remote")).unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_evaluation_allocates_unique_indices() {
        let store = Arc::new(StorageContext::in_memory());
        let conformity = ConformityService::new(ConformityConfig::default(), "example.org");
        let eval = Arc::new(Evaluator::new(store, conformity, Sequencer::default()));
        eval.evaluate(create("create"), &opts()).unwrap();

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let eval = Arc::clone(&eval);
                let event = message(&format!("m{i}"), 2, &["create"]);
                tokio::spawn(async move { eval.evaluate_async(event, opts()).await })
            })
            .collect();

        let mut indices = BTreeSet::new();
        for task in tasks {
            let outcome = task.await.unwrap().unwrap();
            assert!(indices.insert(outcome.idx()));
        }

        assert_eq!(indices, (2..=33).collect::<BTreeSet<u64>>());
        assert_eq!(eval.store().last_event_idx().unwrap(), 33);
        assert_eq!(eval.store().room(ROOM).head().count().unwrap(), 32);
    }
}
