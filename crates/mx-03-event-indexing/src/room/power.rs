//! The store as the source of a room's power levels.

use mx_06_room_power::PowerLevelsSource;
use serde_json::{Map, Value};
use shared_types::event_types;

use crate::domain::errors::StorageError;
use crate::ports::outbound::KvEngine;
use crate::service::StorageContext;

impl<K: KvEngine> PowerLevelsSource for StorageContext<K> {
    type Error = StorageError;

    /// Present whenever the event is, with empty content standing in for
    /// none.
    fn power_levels(&self, room_id: &str) -> Result<Option<Map<String, Value>>, StorageError> {
        Ok(self
            .room(room_id)
            .state()
            .fetch(event_types::POWER_LEVELS, "")?
            .map(|event| event.content.unwrap_or_default()))
    }

    /// `content.creator` of `m.room.create`, else its sender.
    fn creator(&self, room_id: &str) -> Result<Option<String>, StorageError> {
        let Some(create) = self.room(room_id).state().fetch(event_types::CREATE, "")? else {
            return Ok(None);
        };
        Ok(create
            .content_str("creator")
            .or_else(|| create.sender())
            .map(str::to_owned))
    }
}
