//! # Error Types
//!
//! Rejections raised by the acceptance policy and the pre-index checks.

use shared_types::SerializationError;
use thiserror::Error;

use super::report::Report;

/// An event failed structural conformity (`fault::INVALID`). Never retried
/// by the storage core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConformityViolation {
    /// Rules still violated after every exemption.
    #[error("Non-conforming event {event_id}: {report}")]
    NonConforming { event_id: String, report: Report },

    /// The id is not in the format the room version requires.
    #[error("Event id {event_id} is not valid for room version {room_version}")]
    EventIdFormat {
        event_id: String,
        room_version: String,
    },

    /// A locally issued event names another server as its origin.
    #[error("Issuing event for origin {origin}, this server is {server_name}")]
    ForeignOrigin { origin: String, server_name: String },

    #[error("Event is {size} bytes; maximum is {max}")]
    TooLarge { size: usize, max: usize },

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl ConformityViolation {
    pub fn report(&self) -> Option<Report> {
        match self {
            ConformityViolation::NonConforming { report, .. } => Some(*report),
            _ => None,
        }
    }

    /// Violated rule names, for structured rejections.
    pub fn reflect(&self) -> Vec<&'static str> {
        self.report().map(Report::names).unwrap_or_default()
    }
}
