//! # Error Types

use mx_03_event_indexing::StorageError;
use mx_04_event_conformity::ConformityViolation;
use shared_types::SerializationError;
use thiserror::Error;

/// Invalid or unreadable configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid server name: {0:?}")]
    InvalidServerName(String),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("Storage path must not be empty")]
    EmptyPath,
}

/// Why the evaluation pipeline did not accept an event.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Rejected: {0}")]
    Rejected(#[from] ConformityViolation),

    #[error("Event {event_id} is blacklisted")]
    Blacklisted { event_id: String },

    #[error("Event has no id and id assignment is disabled")]
    MissingEventId,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error("Evaluation task failed: {0}")]
    Join(String),
}

/// Startup failures.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Logging already initialized: {0}")]
    Logging(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
