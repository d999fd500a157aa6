//! # Error Types
//!
//! Errors raised while building or reading the event indices.

use shared_types::SerializationError;
use thiserror::Error;

/// Failure reported by a key-value backend. Propagated unchanged; retry is
/// the caller's decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvError {
    #[error("Storage backend error: {message}")]
    Backend { message: String },

    #[error("Unknown column family: {0}")]
    UnknownColumn(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// An event was written with neither an index nor the blacklist flag.
    /// This is a contract violation by the caller.
    #[error("Cannot write {event_id} to database: no index specified")]
    MissingIndex { event_id: String },

    #[error("Event {event_id} is missing `{field}` required for indexing")]
    MissingField {
        event_id: String,
        field: &'static str,
    },

    /// Key components are NUL-separated, so a NUL inside one would let its
    /// prefix match another value's entries.
    #[error("Event {event_id} has a NUL byte in `{field}`")]
    NulInKey {
        event_id: String,
        field: &'static str,
    },

    #[error("Corrupt value in column {column}: {reason}")]
    Corrupt {
        column: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Kv(#[from] KvError),
}

impl StorageError {
    pub(crate) fn corrupt(column: &'static str, reason: impl Into<String>) -> Self {
        StorageError::Corrupt {
            column,
            reason: reason.into(),
        }
    }
}
