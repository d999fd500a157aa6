//! Level constants and numeric interpretation.

use serde_json::Value;

/// Level of the room creator while no power_levels event exists.
pub const CREATOR_LEVEL: i64 = 100;

/// Level required for named actions and state events by default.
pub const DEFAULT_POWER_LEVEL: i64 = 50;

/// Level required for message events by default.
pub const DEFAULT_EVENT_LEVEL: i64 = 0;

/// Level of an ordinary user by default.
pub const DEFAULT_USER_LEVEL: i64 = 0;

/// The level a JSON value denotes: an integer, or a string holding one.
pub fn as_level(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub fn is_level(value: &Value) -> bool {
    as_level(value).is_some()
}
