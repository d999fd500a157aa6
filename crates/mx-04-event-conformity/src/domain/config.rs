//! Conformity configuration.

use shared_types::EVENT_MAX_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformityConfig {
    /// Largest accepted canonical serialization in bytes.
    pub max_event_size: usize,
    /// Reject non-conforming events instead of attaching the report.
    pub strict: bool,
}

impl Default for ConformityConfig {
    fn default() -> Self {
        Self {
            max_event_size: EVENT_MAX_SIZE,
            strict: true,
        }
    }
}

impl ConformityConfig {
    pub fn with_max_event_size(mut self, max_event_size: usize) -> Self {
        self.max_event_size = max_event_size;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
