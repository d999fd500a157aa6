//! Indexing configuration.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Referrers fetched per step while resolving a horizon.
    pub horizon_batch_size: usize,
    /// Lookups made while building a transaction consult the mutations
    /// already staged in it before committed state.
    pub read_your_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            horizon_batch_size: 32,
            read_your_writes: true,
        }
    }
}

impl StorageConfig {
    /// Zero is kept as given so configuration validation can reject it;
    /// the resolver itself never steps by less than one.
    pub fn with_horizon_batch_size(mut self, size: usize) -> Self {
        self.horizon_batch_size = size;
        self
    }

    pub fn with_read_your_writes(mut self, enabled: bool) -> Self {
        self.read_your_writes = enabled;
        self
    }
}
