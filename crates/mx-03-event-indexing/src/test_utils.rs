//! Event fixtures shared by the unit tests.

use serde_json::{json, Value};
use shared_types::{event_types, Event};

use crate::adapters::memory::InMemoryKvEngine;
use crate::domain::write_opts::WriteOpts;
use crate::service::StorageContext;

pub const ROOM: &str = "!room:example.org";
pub const ALICE: &str = "@alice:example.org";
pub const BOB: &str = "@bob:other.org";

fn build(mut value: Value, prev: &[&str]) -> Event {
    value["prev_events"] = json!(prev);
    value["auth_events"] = json!([]);
    value["origin"] = json!("example.org");
    value["origin_server_ts"] = json!(1_700_000_000_000_i64);
    Event::from_value(value).unwrap()
}

pub fn message(event_id: &str, depth: i64, prev: &[&str]) -> Event {
    build(
        json!({
            "event_id": event_id,
            "room_id": ROOM,
            "sender": ALICE,
            "type": "m.room.message",
            "depth": depth,
            "content": {"body": "hello"},
        }),
        prev,
    )
}

pub fn state(
    event_id: &str,
    kind: &str,
    state_key: &str,
    depth: i64,
    prev: &[&str],
    content: Value,
) -> Event {
    build(
        json!({
            "event_id": event_id,
            "room_id": ROOM,
            "sender": ALICE,
            "type": kind,
            "state_key": state_key,
            "depth": depth,
            "content": content,
        }),
        prev,
    )
}

pub fn create(event_id: &str) -> Event {
    state(event_id, event_types::CREATE, "", 1, &[], json!({"creator": ALICE}))
}

pub fn member(event_id: &str, user_id: &str, membership: &str, depth: i64, prev: &[&str]) -> Event {
    let mut event = state(
        event_id,
        event_types::MEMBER,
        user_id,
        depth,
        prev,
        json!({"membership": membership}),
    );
    event.sender = Some(user_id.to_string());
    event
}

pub fn redaction(event_id: &str, target: &str, depth: i64, prev: &[&str]) -> Event {
    build(
        json!({
            "event_id": event_id,
            "room_id": ROOM,
            "sender": ALICE,
            "type": event_types::REDACTION,
            "redacts": target,
            "depth": depth,
            "content": {},
        }),
        prev,
    )
}

pub fn store() -> StorageContext<InMemoryKvEngine> {
    StorageContext::in_memory()
}

/// Write and commit one event under `idx`.
pub fn commit(ctx: &StorageContext<InMemoryKvEngine>, event: &Event, idx: u64) {
    commit_with(ctx, event, &WriteOpts::indexed(idx));
}

pub fn commit_with(ctx: &StorageContext<InMemoryKvEngine>, event: &Event, opts: &WriteOpts) {
    let mut txn = crate::domain::txn::WriteTxn::new();
    ctx.write(&mut txn, event, opts).unwrap();
    ctx.commit(txn).unwrap();
}
