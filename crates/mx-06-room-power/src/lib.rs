//! # Room Power Levels (mx-06)
//!
//! Resolves the effective power level of users and the level required for
//! events and named actions from a room's current `m.room.power_levels`
//! content, falling back to the compiled-in defaults and the room creator.
//!
//! This is a decision helper. Authorization layers call [`RoomPower::allows`]
//! and enforce the answer themselves.
//!
//! ## Fallback Chain
//!
//! | Query | Lookup order |
//! |-------|--------------|
//! | user | `users[user]` → `users_default` → 0 |
//! | user, no power_levels | creator → 100, anyone else → 0 |
//! | message event | `events[type]` → `events_default` → 0 |
//! | state event | `events[type]` → `state_default` → 50 |
//! | named action | `content[prop]` → 50 |
//!
//! A value counts as a level only if it reads as an integer; anything else
//! is treated as absent.

pub mod domain;
pub mod ports;

pub use domain::compose::{compose_content, default_content, grant, revoke};
pub use domain::levels::{
    as_level, is_level, CREATOR_LEVEL, DEFAULT_EVENT_LEVEL, DEFAULT_POWER_LEVEL,
    DEFAULT_USER_LEVEL,
};
pub use domain::power::RoomPower;
pub use ports::PowerLevelsSource;
