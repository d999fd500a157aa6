//! The store as the conformity policy's redaction oracle.

use mx_03_event_indexing::{KvEngine, StorageContext};
use mx_04_event_conformity::RedactionOracle;
use tracing::warn;

pub struct StoreRedactionOracle<'a, K: KvEngine> {
    store: &'a StorageContext<K>,
}

impl<'a, K: KvEngine> StoreRedactionOracle<'a, K> {
    pub fn new(store: &'a StorageContext<K>) -> Self {
        Self { store }
    }
}

impl<K: KvEngine> RedactionOracle for StoreRedactionOracle<'_, K> {
    /// A failed lookup counts as not redacted, so no exemption is granted.
    fn is_redacted(&self, event_id: &str) -> bool {
        self.store.is_redacted(event_id).unwrap_or_else(|e| {
            warn!("[node] Redaction lookup for {} failed: {}", event_id, e);
            false
        })
    }
}
