//! # Outbound Ports

use serde_json::{Map, Value};

/// Room state the power view is computed from.
///
/// Production: the event indexing store (`mx-03-event-indexing`)
pub trait PowerLevelsSource {
    type Error;

    /// Content of the current `m.room.power_levels` state event, if any.
    fn power_levels(&self, room_id: &str) -> Result<Option<Map<String, Value>>, Self::Error>;

    /// The room creator, from `m.room.create`.
    fn creator(&self, room_id: &str) -> Result<Option<String>, Self::Error>;
}
