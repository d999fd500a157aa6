//! Events for a single room on `example.org`.
//!
//! Ids are server-assigned (`$name:example.org`) so tests can name them.
//! Every event carries its own content hash and an origin signature, so
//! the builders also satisfy the conformity checker.

use mx_03_event_indexing::{InMemoryKvEngine, StorageContext, WriteTxn, WriteOpts};
use serde_json::{json, Value};
use shared_types::{event_types, make_hashes, Event, EventIdx};

pub const ROOM: &str = "!room:example.org";
pub const ALICE: &str = "@alice:example.org";
pub const BOB: &str = "@bob:example.org";

pub fn event_id(name: &str) -> String {
    format!("${name}:example.org")
}

/// One event, before it is sealed.
pub struct EventSpec {
    value: Value,
}

impl EventSpec {
    /// Every event but the create event is authorized by the create event.
    pub fn new(name: &str, kind: &str, depth: i64) -> Self {
        let auth: Vec<String> = if kind == event_types::CREATE {
            Vec::new()
        } else {
            vec![event_id("create")]
        };
        Self {
            value: json!({
                "event_id": event_id(name),
                "room_id": ROOM,
                "sender": ALICE,
                "type": kind,
                "origin": "example.org",
                "origin_server_ts": 1_700_000_000_000_i64 + depth,
                "depth": depth,
                "content": {},
                "prev_events": [],
                "auth_events": auth,
                "signatures": {"example.org": {"ed25519:1": "c2lnbmF0dXJl"}},
            }),
        }
    }

    pub fn prev(mut self, names: &[&str]) -> Self {
        self.value["prev_events"] = json!(names.iter().map(|n| event_id(n)).collect::<Vec<_>>());
        self
    }

    pub fn sender(mut self, user_id: &str) -> Self {
        self.value["sender"] = json!(user_id);
        self
    }

    pub fn state_key(mut self, state_key: &str) -> Self {
        self.value["state_key"] = json!(state_key);
        self
    }

    pub fn content(mut self, content: Value) -> Self {
        self.value["content"] = content;
        self
    }

    pub fn redacts(mut self, name: &str) -> Self {
        self.value["redacts"] = json!(event_id(name));
        self
    }

    /// Build the event and attach its content hash.
    pub fn seal(self) -> Event {
        let mut event = Event::from_value(self.value).unwrap();
        event.hashes = Some(make_hashes(&event).unwrap());
        event
    }
}

pub fn create(name: &str) -> Event {
    EventSpec::new(name, event_types::CREATE, 1)
        .state_key("")
        .content(json!({"creator": ALICE}))
        .seal()
}

pub fn join(name: &str, user_id: &str, depth: i64, prev: &[&str]) -> Event {
    EventSpec::new(name, event_types::MEMBER, depth)
        .sender(user_id)
        .state_key(user_id)
        .content(json!({"membership": "join"}))
        .prev(prev)
        .seal()
}

pub fn power_levels(name: &str, depth: i64, prev: &[&str], content: Value) -> Event {
    EventSpec::new(name, event_types::POWER_LEVELS, depth)
        .state_key("")
        .content(content)
        .prev(prev)
        .seal()
}

pub fn topic(name: &str, topic: &str, depth: i64, prev: &[&str]) -> Event {
    EventSpec::new(name, "m.room.topic", depth)
        .state_key("")
        .content(json!({"topic": topic}))
        .prev(prev)
        .seal()
}

pub fn message(name: &str, depth: i64, prev: &[&str]) -> Event {
    EventSpec::new(name, "m.room.message", depth)
        .content(json!({"msgtype": "m.text", "body": name}))
        .prev(prev)
        .seal()
}

pub fn redaction(name: &str, target: &str, depth: i64, prev: &[&str]) -> Event {
    EventSpec::new(name, event_types::REDACTION, depth)
        .redacts(target)
        .prev(prev)
        .seal()
}

pub type MemoryStore = StorageContext<InMemoryKvEngine>;

/// Index and commit `event` under `idx` with every index enabled.
pub fn commit(store: &MemoryStore, event: &Event, idx: EventIdx) {
    let mut txn = WriteTxn::new();
    store
        .write(&mut txn, event, &WriteOpts::indexed(idx))
        .unwrap();
    store.commit(txn).unwrap();
}
