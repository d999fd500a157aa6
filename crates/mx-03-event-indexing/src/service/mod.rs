//! # Event Storage Service
//!
//! [`StorageContext`] owns the key-value engine and configuration. It is
//! built once at startup and shared by reference; there is no process-wide
//! state.
//!
//! ## Write Path
//!
//! `write()` stages mutations into a caller-owned [`WriteTxn`] in a fixed
//! order:
//!
//! 1. event id → idx
//! 2. per-field columns
//! 3. full JSON
//! 4. sender, type, state, refs
//! 5. horizon resolution for this event's own id
//! 6. room events, type, head, head resolution
//! 7. room state, state space, joined members (state events)
//! 8. redaction of the target's room state
//!
//! Nothing reaches the engine until the caller commits the transaction.

mod builder;
mod event;
mod horizon;
mod query;
mod redact;
mod refs;
mod room;
#[cfg(test)]
mod tests;
mod write;

pub use builder::WriteTxnBuilder;

use crate::adapters::memory::InMemoryKvEngine;
use crate::domain::config::StorageConfig;
use crate::domain::errors::StorageError;
use crate::domain::txn::WriteTxn;
use crate::ports::outbound::KvEngine;
use crate::room::Room;

pub struct StorageContext<K: KvEngine> {
    pub(crate) engine: K,
    pub(crate) config: StorageConfig,
}

impl<K: KvEngine> StorageContext<K> {
    pub fn new(engine: K, config: StorageConfig) -> Self {
        Self { engine, config }
    }

    pub fn engine(&self) -> &K {
        &self.engine
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Apply a built transaction. Engine failures are returned unchanged.
    pub fn commit(&self, txn: WriteTxn) -> Result<(), StorageError> {
        self.engine.commit(txn)?;
        Ok(())
    }

    pub fn txn(&self) -> WriteTxnBuilder<'_, K> {
        WriteTxnBuilder::new(self)
    }

    pub fn room<'a>(&'a self, room_id: &'a str) -> Room<'a, K> {
        Room::new(self, room_id)
    }
}

impl StorageContext<InMemoryKvEngine> {
    pub fn in_memory() -> Self {
        Self::new(InMemoryKvEngine::new(), StorageConfig::default())
    }
}
