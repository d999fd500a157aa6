//! The event_idx allocator.

use std::sync::atomic::{AtomicU64, Ordering};

use mx_03_event_indexing::{KvEngine, StorageContext, StorageError};
use shared_types::EventIdx;

/// Hands out strictly increasing, never reused event indices.
#[derive(Debug, Default)]
pub struct Sequencer {
    last: AtomicU64,
}

impl Sequencer {
    /// Continue after `last`; the first index handed out is `last + 1`.
    pub fn new(last: EventIdx) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Continue after the highest index already in the store.
    pub fn resume<K: KvEngine>(store: &StorageContext<K>) -> Result<Self, StorageError> {
        Ok(Self::new(store.last_event_idx()?))
    }

    pub fn next(&self) -> EventIdx {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The most recently allocated index.
    pub fn current(&self) -> EventIdx {
        self.last.load(Ordering::SeqCst)
    }
}
