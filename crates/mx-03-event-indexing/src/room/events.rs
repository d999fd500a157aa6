//! Depth-ordered views: room events, missing references and the horizon.

use std::collections::HashSet;
use std::ops::RangeBounds;

use shared_types::{EventField, EventIdx};
use tracing::info;

use crate::domain::columns::Column;
use crate::domain::errors::StorageError;
use crate::domain::keys::{
    event_horizon_key, parse_event_horizon_key, parse_depth_idx_suffix, parse_room_events_key,
    room_events_range, room_type_prefix, KeyRange,
};
use crate::domain::txn::WriteTxn;
use crate::ports::outbound::{Direction, KvEngine};

use super::Room;

fn events_malformed() -> StorageError {
    StorageError::corrupt("_room_events", "malformed key")
}

/// A room's events ordered by `(depth, idx)`.
pub struct RoomEvents<'a, K: KvEngine> {
    room: Room<'a, K>,
}

impl<'a, K: KvEngine> RoomEvents<'a, K> {
    pub(super) fn new(room: Room<'a, K>) -> Self {
        Self { room }
    }

    fn scan(
        &self,
        depths: impl RangeBounds<i64>,
        direction: Direction,
        mut f: impl FnMut(i64, EventIdx) -> bool,
    ) -> Result<bool, StorageError> {
        let range = room_events_range(self.room.room_id, depths);
        let pairs = self.room.ctx.engine.scan(Column::RoomEvents, &range, direction)?;
        for (key, _) in pairs {
            let (depth, idx) = parse_room_events_key(&key).ok_or_else(events_malformed)?;
            if !f(depth, idx) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Ascending depth. Returns false if `f` stopped the iteration.
    pub fn for_each(
        &self,
        depths: impl RangeBounds<i64>,
        f: impl FnMut(i64, EventIdx) -> bool,
    ) -> Result<bool, StorageError> {
        self.scan(depths, Direction::Forward, f)
    }

    /// Descending depth, starting from the head of the room.
    pub fn rfor_each(
        &self,
        depths: impl RangeBounds<i64>,
        f: impl FnMut(i64, EventIdx) -> bool,
    ) -> Result<bool, StorageError> {
        self.scan(depths, Direction::Reverse, f)
    }

    pub fn count(&self, depths: impl RangeBounds<i64>) -> Result<usize, StorageError> {
        let mut count = 0;
        self.for_each(depths, |_, _| {
            count += 1;
            true
        })?;
        Ok(count)
    }

    /// The deepest event.
    pub fn top(&self) -> Result<Option<(i64, EventIdx)>, StorageError> {
        let range = room_events_range(self.room.room_id, ..);
        match self.room.ctx.engine.seek_last(Column::RoomEvents, &range)? {
            Some((key, _)) => Ok(Some(parse_room_events_key(&key).ok_or_else(events_malformed)?)),
            None => Ok(None),
        }
    }

    /// Events of one type, ascending depth.
    pub fn by_type(
        &self,
        kind: &str,
        mut f: impl FnMut(i64, EventIdx) -> bool,
    ) -> Result<bool, StorageError> {
        let prefix = room_type_prefix(self.room.room_id, kind);
        for (key, _) in self.room.ctx.engine.prefix_scan(Column::RoomType, &prefix)? {
            let (depth, idx) = parse_depth_idx_suffix(&key)
                .ok_or_else(|| StorageError::corrupt("_room_type", "malformed key"))?;
            if !f(depth, idx) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Ids referenced as `prev_events` by a room's events but not indexed.
pub struct Missing<'a, K: KvEngine> {
    room: Room<'a, K>,
}

impl<'a, K: KvEngine> Missing<'a, K> {
    pub(super) fn new(room: Room<'a, K>) -> Self {
        Self { room }
    }

    fn scan(
        &self,
        depths: impl RangeBounds<i64>,
        direction: Direction,
        mut f: impl FnMut(&str, i64, EventIdx) -> bool,
    ) -> Result<bool, StorageError> {
        let ctx = self.room.ctx;
        let range = room_events_range(self.room.room_id, depths);
        let mut seen = HashSet::new();
        for (key, _) in ctx.engine.scan(Column::RoomEvents, &range, direction)? {
            let (depth, idx) = parse_room_events_key(&key).ok_or_else(events_malformed)?;
            for prev_id in ctx.prev_ids(idx)? {
                if seen.contains(&prev_id) || ctx.exists(&prev_id)? {
                    continue;
                }
                if !f(&prev_id, depth, idx) {
                    return Ok(false);
                }
                seen.insert(prev_id);
            }
        }
        Ok(true)
    }

    /// Each missing id once, with the depth and idx of the first event
    /// found referencing it, ascending depth.
    pub fn for_each(
        &self,
        depths: impl RangeBounds<i64>,
        f: impl FnMut(&str, i64, EventIdx) -> bool,
    ) -> Result<bool, StorageError> {
        self.scan(depths, Direction::Forward, f)
    }

    pub fn rfor_each(
        &self,
        depths: impl RangeBounds<i64>,
        f: impl FnMut(&str, i64, EventIdx) -> bool,
    ) -> Result<bool, StorageError> {
        self.scan(depths, Direction::Reverse, f)
    }

    pub fn count(&self, depths: impl RangeBounds<i64>) -> Result<usize, StorageError> {
        let mut count = 0;
        self.for_each(depths, |_, _, _| {
            count += 1;
            true
        })?;
        Ok(count)
    }
}

/// Horizon entries whose referrer belongs to this room.
pub struct Horizon<'a, K: KvEngine> {
    room: Room<'a, K>,
}

impl<'a, K: KvEngine> Horizon<'a, K> {
    pub(super) fn new(room: Room<'a, K>) -> Self {
        Self { room }
    }

    /// `(unresolved_id, referrer_idx)` in key order.
    pub fn for_each(
        &self,
        mut f: impl FnMut(&str, EventIdx) -> bool,
    ) -> Result<bool, StorageError> {
        let ctx = self.room.ctx;
        let room_id = self.room.room_id;
        let entries = ctx
            .engine
            .scan(Column::EventHorizon, &KeyRange::all(), Direction::Forward)?;
        for (key, value) in entries {
            let (unresolved, referrer) = parse_event_horizon_key(&key)
                .ok_or_else(|| StorageError::corrupt("_event_horizon", "malformed key"))?;
            let in_room = if value.is_empty() {
                let referrer_room = ctx.get(referrer, EventField::RoomId)?;
                referrer_room.as_ref().and_then(|v| v.as_str()) == Some(room_id)
            } else {
                value == room_id.as_bytes()
            };
            if !in_room {
                continue;
            }
            if !f(unresolved, referrer) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        let mut count = 0;
        self.for_each(|_, _| {
            count += 1;
            true
        })?;
        Ok(count)
    }

    /// Re-register every unsatisfied `prev_events` reference of the room,
    /// walking from the deepest event down. Safe to repeat: entries that
    /// already exist are rewritten under the same key.
    pub fn rebuild(&self) -> Result<usize, StorageError> {
        let ctx = self.room.ctx;
        let range = room_events_range(self.room.room_id, ..);
        let mut txn = WriteTxn::new();
        for (key, _) in ctx.engine.scan(Column::RoomEvents, &range, Direction::Reverse)? {
            let (_, idx) = parse_room_events_key(&key).ok_or_else(events_malformed)?;
            for prev_id in ctx.prev_ids(idx)? {
                if !ctx.exists(&prev_id)? {
                    txn.put(
                        Column::EventHorizon,
                        event_horizon_key(&prev_id, idx),
                        self.room.room_id.as_bytes(),
                    );
                }
            }
        }

        let count = txn.len();
        ctx.commit(txn)?;
        info!(
            "[mx-03] Horizon rebuild for {} wrote {} entries",
            self.room.room_id, count
        );
        Ok(count)
    }
}
