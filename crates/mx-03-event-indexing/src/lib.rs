//! # Event Indexing Subsystem (mx-03)
//!
//! Turns one event into the complete set of key-value mutations that index
//! it, and answers reads against those indices.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ StorageContext                                           │
//! │   write(txn, event, opts)  ──►  WriteTxn (staged deltas) │
//! │   find_event_idx / fetch / get / event_refs ...          │
//! │   room(id) ──► events · missing · horizon · state · head │
//! └──────────────────────────────┬───────────────────────────┘
//!                                │ KvEngine
//!               ┌────────────────┴────────────────┐
//!        InMemoryKvEngine                 RocksDbEngine (node-runtime)
//! ```
//!
//! ## Invariants
//!
//! - Every mutation for one event is staged into one [`WriteTxn`]; the
//!   caller commits it atomically or drops it.
//! - A write without an index and without the blacklist flag fails with
//!   [`StorageError::MissingIndex`].
//! - A blacklisted id maps to the stored index 0, read back as
//!   [`EventIndexState::Blacklisted`](shared_types::EventIndexState), never
//!   confused with an unknown id.
//! - `_room_events` keys order by `(room, depth, idx)`, so depth decides scan
//!   order regardless of commit order.
//! - Unresolved references are parked in the horizon and revisited when the
//!   referenced event is written, including deferred redactions.
//! - Rewriting an event under the same index is idempotent.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod room;
pub mod service;

#[cfg(test)]
mod test_utils;

pub use adapters::memory::InMemoryKvEngine;
pub use domain::appendix::{Appendix, Index, RefMask, RefType};
pub use domain::columns::Column;
pub use domain::config::StorageConfig;
pub use domain::errors::{KvError, StorageError};
pub use domain::keys::KeyRange;
pub use domain::txn::{Delta, WriteTxn};
pub use domain::write_opts::{Op, WriteOpts};
pub use ports::outbound::{Direction, KvEngine, KvPair};
pub use room::{Horizon, Missing, Room, RoomEvents, RoomHead, RoomJoined, RoomState};
pub use service::{StorageContext, WriteTxnBuilder};
