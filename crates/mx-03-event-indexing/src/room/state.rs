//! Current state, forward extremities and joined members.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use shared_types::{Event, EventIdx};

use crate::domain::columns::Column;
use crate::domain::errors::StorageError;
use crate::domain::keys::{
    decode_idx, parse_depth_idx_suffix, parse_room_head_key, parse_room_joined_key,
    parse_room_state_key, room_head_key, room_joined_key, room_joined_prefix, room_prefix,
    room_state_key, room_state_prefix, room_state_space_prefix,
};
use crate::ports::outbound::KvEngine;

use super::Room;

fn value_idx(column: &'static str, value: &[u8]) -> Result<EventIdx, StorageError> {
    decode_idx(value).ok_or_else(|| StorageError::corrupt(column, "value is not an index"))
}

/// The `(type, state_key) → idx` projection.
pub struct RoomState<'a, K: KvEngine> {
    room: Room<'a, K>,
}

impl<'a, K: KvEngine> RoomState<'a, K> {
    pub(super) fn new(room: Room<'a, K>) -> Self {
        Self { room }
    }

    pub fn get(&self, kind: &str, state_key: &str) -> Result<Option<EventIdx>, StorageError> {
        let key = room_state_key(self.room.room_id, kind, state_key);
        match self.room.ctx.engine.get(Column::RoomState, &key)? {
            Some(value) => Ok(Some(value_idx("_room_state", &value)?)),
            None => Ok(None),
        }
    }

    pub fn has(&self, kind: &str, state_key: &str) -> Result<bool, StorageError> {
        Ok(self.get(kind, state_key)?.is_some())
    }

    pub fn fetch(&self, kind: &str, state_key: &str) -> Result<Option<Event>, StorageError> {
        match self.get(kind, state_key)? {
            Some(idx) => self.room.ctx.fetch(idx),
            None => Ok(None),
        }
    }

    pub fn content(
        &self,
        kind: &str,
        state_key: &str,
    ) -> Result<Option<Map<String, Value>>, StorageError> {
        Ok(self
            .fetch(kind, state_key)?
            .and_then(|event| event.content))
    }

    /// `(type, state_key, idx)` in key order, optionally for one type.
    pub fn for_each(
        &self,
        kind: Option<&str>,
        mut f: impl FnMut(&str, &str, EventIdx) -> bool,
    ) -> Result<bool, StorageError> {
        let room_id = self.room.room_id;
        let prefix = room_state_prefix(room_id, kind);
        for (key, value) in self.room.ctx.engine.prefix_scan(Column::RoomState, &prefix)? {
            let (kind, state_key) = parse_room_state_key(room_id, &key)
                .ok_or_else(|| StorageError::corrupt("_room_state", "malformed key"))?;
            if !f(kind, state_key, value_idx("_room_state", &value)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn count(&self, kind: Option<&str>) -> Result<usize, StorageError> {
        let mut count = 0;
        self.for_each(kind, |_, _, _| {
            count += 1;
            true
        })?;
        Ok(count)
    }

    /// Every version of one state cell, `(depth, idx)` ascending.
    pub fn history(
        &self,
        kind: &str,
        state_key: &str,
    ) -> Result<Vec<(i64, EventIdx)>, StorageError> {
        let prefix = room_state_space_prefix(self.room.room_id, kind, state_key);
        self.room
            .ctx
            .engine
            .prefix_scan(Column::RoomStateSpace, &prefix)?
            .iter()
            .map(|(key, _)| {
                parse_depth_idx_suffix(key)
                    .ok_or_else(|| StorageError::corrupt("_room_state_space", "malformed key"))
            })
            .collect()
    }
}

/// Events nothing references yet.
pub struct RoomHead<'a, K: KvEngine> {
    room: Room<'a, K>,
}

impl<'a, K: KvEngine> RoomHead<'a, K> {
    pub(super) fn new(room: Room<'a, K>) -> Self {
        Self { room }
    }

    pub fn for_each(
        &self,
        mut f: impl FnMut(&str, EventIdx) -> bool,
    ) -> Result<bool, StorageError> {
        let room_id = self.room.room_id;
        let prefix = room_prefix(room_id);
        for (key, value) in self.room.ctx.engine.prefix_scan(Column::RoomHead, &prefix)? {
            let event_id = parse_room_head_key(room_id, &key)
                .ok_or_else(|| StorageError::corrupt("_room_head", "malformed key"))?;
            if !f(event_id, value_idx("_room_head", &value)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn has(&self, event_id: &str) -> Result<bool, StorageError> {
        let key = room_head_key(self.room.room_id, event_id);
        Ok(self.room.ctx.engine.exists(Column::RoomHead, &key)?)
    }

    pub fn ids(&self) -> Result<Vec<String>, StorageError> {
        let mut ids = Vec::new();
        self.for_each(|event_id, _| {
            ids.push(event_id.to_string());
            true
        })?;
        Ok(ids)
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        Ok(self.ids()?.len())
    }
}

/// Currently joined members, grouped by server.
pub struct RoomJoined<'a, K: KvEngine> {
    room: Room<'a, K>,
}

impl<'a, K: KvEngine> RoomJoined<'a, K> {
    pub(super) fn new(room: Room<'a, K>) -> Self {
        Self { room }
    }

    /// `(user_id, origin)`, optionally for one server.
    pub fn for_each(
        &self,
        origin: Option<&str>,
        mut f: impl FnMut(&str, &str) -> bool,
    ) -> Result<bool, StorageError> {
        let room_id = self.room.room_id;
        let prefix = room_joined_prefix(room_id, origin);
        for (key, _) in self.room.ctx.engine.prefix_scan(Column::RoomJoined, &prefix)? {
            let (origin, user_id) = parse_room_joined_key(room_id, &key)
                .ok_or_else(|| StorageError::corrupt("_room_joined", "malformed key"))?;
            if !f(user_id, origin) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn has(&self, user_id: &str) -> Result<bool, StorageError> {
        let Some(origin) = shared_types::ids::host(user_id) else {
            return Ok(false);
        };
        let key = room_joined_key(self.room.room_id, origin, user_id);
        Ok(self.room.ctx.engine.exists(Column::RoomJoined, &key)?)
    }

    pub fn count(&self, origin: Option<&str>) -> Result<usize, StorageError> {
        let mut count = 0;
        self.for_each(origin, |_, _| {
            count += 1;
            true
        })?;
        Ok(count)
    }

    /// Servers with at least one joined member.
    pub fn servers(&self) -> Result<Vec<String>, StorageError> {
        let mut servers = BTreeSet::new();
        self.for_each(None, |_, origin| {
            servers.insert(origin.to_string());
            true
        })?;
        Ok(servers.into_iter().collect())
    }
}
