//! # Shared Types Crate
//!
//! The Matrix event model used by every storage subsystem.
//!
//! ## Contents
//!
//! - `ids` - identifier grammar for event, room, user ids and server names
//! - `event` - the typed [`Event`] with three-state field accessors
//! - `hashing` - canonical JSON, content hashes, reference hashes, event ids
//! - `index` - [`EventIdx`] and the discriminated [`EventIndexState`]
//! - `errors` - [`SerializationError`]
//!
//! ## Field States
//!
//! Several validation rules need to know whether a top-level key was absent,
//! present but empty, or present with a value. Every fixed field is therefore
//! kept as an `Option` and exposed through [`Event::field_state`].

pub mod errors;
pub mod event;
pub mod hashing;
pub mod ids;
pub mod index;

pub use errors::SerializationError;
pub use event::{Event, EventField, EventRef, FieldState};
pub use hashing::{
    canonical_json, check_id, content_hash, essential, make_hashes, make_id, reference_hash,
    verify_hash,
};
pub use ids::{IdKind, IdVersion};
pub use index::{EventIdx, EventIndexState};

/// Maximum size of an event's canonical serialization in bytes.
pub const EVENT_MAX_SIZE: usize = 65_507;

/// Maximum length of the `type` field.
pub const TYPE_MAX_SIZE: usize = 256;

/// Maximum length of the `state_key` field.
pub const STATE_KEY_MAX_SIZE: usize = 256;

/// Maximum length of the `origin` field.
pub const ORIGIN_MAX_SIZE: usize = 256;

/// Well-known event types the storage core treats specially.
pub mod event_types {
    pub const CREATE: &str = "m.room.create";
    pub const MEMBER: &str = "m.room.member";
    pub const POWER_LEVELS: &str = "m.room.power_levels";
    pub const REDACTION: &str = "m.room.redaction";
    pub const ALIASES: &str = "m.room.aliases";
    pub const JOIN_RULES: &str = "m.room.join_rules";
    pub const HISTORY_VISIBILITY: &str = "m.room.history_visibility";
}
