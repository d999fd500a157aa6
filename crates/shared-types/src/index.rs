//! # Event Index
//!
//! The dense, strictly increasing sequence number assigned to an event at
//! commit time. Zero is never a valid index: on disk it marks a blacklisted
//! event id, in memory that meaning is carried by [`EventIndexState`].

use std::num::NonZeroU64;

/// Raw event index as stored in keys and values.
pub type EventIdx = u64;

/// What the id→idx map knows about an event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventIndexState {
    /// No record for this event id.
    Unindexed,
    /// Known-bad: rejected before it was ever assigned an index.
    Blacklisted,
    /// Committed under this index.
    Indexed(NonZeroU64),
}

impl EventIndexState {
    /// Interpret a value read from the id→idx column.
    pub fn from_stored(value: EventIdx) -> Self {
        match NonZeroU64::new(value) {
            Some(idx) => EventIndexState::Indexed(idx),
            None => EventIndexState::Blacklisted,
        }
    }

    pub fn idx(&self) -> Option<EventIdx> {
        match self {
            EventIndexState::Indexed(idx) => Some(idx.get()),
            _ => None,
        }
    }

    /// A record exists, blacklisted or not.
    pub fn is_known(&self) -> bool {
        !matches!(self, EventIndexState::Unindexed)
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, EventIndexState::Indexed(_))
    }

    pub fn is_blacklisted(&self) -> bool {
        matches!(self, EventIndexState::Blacklisted)
    }
}
