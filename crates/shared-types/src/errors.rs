//! # Error Types
//!
//! Errors raised while decoding or encoding events.

use thiserror::Error;

/// Malformed event encoding. Fatal to the single operation, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializationError {
    /// The input is not a JSON object matching the event schema.
    #[error("Malformed event JSON: {0}")]
    Malformed(String),

    /// A field required by the operation is absent.
    #[error("Event field `{field}` is required")]
    MissingField { field: &'static str },

    /// Hash or identifier material could not be decoded.
    #[error("Invalid encoding in `{field}`: {reason}")]
    Encoding { field: &'static str, reason: String },
}

impl From<serde_json::Error> for SerializationError {
    fn from(e: serde_json::Error) -> Self {
        SerializationError::Malformed(e.to_string())
    }
}
