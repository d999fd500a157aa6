//! Room-scoped indices.

use shared_types::{event_types, ids, Event, EventIdx};
use tracing::{debug, warn};

use crate::domain::appendix::{Index, RefType};
use crate::domain::columns::Column;
use crate::domain::errors::StorageError;
use crate::domain::keys::{
    encode_idx, event_refs_type_prefix, room_events_key, room_head_key, room_joined_key,
    room_state_key, room_state_space_key, room_type_key,
};
use crate::domain::txn::WriteTxn;
use crate::domain::write_opts::{Op, WriteOpts};
use crate::ports::outbound::KvEngine;

use super::write::{require, require_id};
use super::StorageContext;

impl<K: KvEngine> StorageContext<K> {
    pub(super) fn index_room(
        &self,
        txn: &mut WriteTxn,
        event: &Event,
        opts: &WriteOpts,
        idx: EventIdx,
    ) -> Result<(), StorageError> {
        let appendix = opts.appendix;
        let room_id = require(event, event.room_id(), "room_id")?;

        if appendix.has(Index::RoomEvents) {
            let depth = require(event, event.depth, "depth")?;
            txn.append(
                Column::RoomEvents,
                opts.op,
                room_events_key(room_id, depth, idx),
                encode_idx(idx),
            );
        }

        if appendix.has(Index::RoomType) {
            let kind = require(event, event.kind(), "type")?;
            let depth = require(event, event.depth, "depth")?;
            txn.append(
                Column::RoomType,
                opts.op,
                room_type_key(room_id, kind, depth, idx),
                Vec::new(),
            );
        }

        if appendix.has(Index::RoomHead) {
            self.index_room_head(txn, event, opts, room_id, idx)?;
        }

        if appendix.has(Index::RoomHeadResolve) && opts.op == Op::Put {
            for prev_id in event.prev_ids() {
                txn.delete(Column::RoomHead, room_head_key(room_id, prev_id));
            }
        }

        if let Some(state_key) = event.state_key() {
            let kind = require(event, event.kind(), "type")?;

            if appendix.has(Index::RoomState) {
                self.index_room_state(txn, opts, room_id, kind, state_key, idx)?;
            }

            if appendix.has(Index::RoomStateSpace) {
                let depth = require(event, event.depth, "depth")?;
                txn.append(
                    Column::RoomStateSpace,
                    opts.op,
                    room_state_space_key(room_id, kind, state_key, depth, idx),
                    encode_idx(idx),
                );
            }

            if appendix.has(Index::RoomJoined) && kind == event_types::MEMBER {
                self.index_room_joined(txn, event, opts, room_id, state_key, idx);
            }
        }

        if appendix.has(Index::RoomRedact) && event.is_redaction() {
            self.index_room_redact(txn, event, opts, idx)?;
        }

        Ok(())
    }

    /// An event stays out of the head once anything references it.
    fn index_room_head(
        &self,
        txn: &mut WriteTxn,
        event: &Event,
        opts: &WriteOpts,
        room_id: &str,
        idx: EventIdx,
    ) -> Result<(), StorageError> {
        let key = room_head_key(room_id, require_id(event)?);
        if opts.op == Op::Put {
            let referenced = txn.has(Op::Delete, Column::RoomHead, &key)
                || !self
                    .engine
                    .prefix_scan(Column::EventRefs, &event_refs_type_prefix(idx, RefType::Next))?
                    .is_empty();
            if referenced {
                debug!("[mx-03] {} already referenced; not a head", idx);
                return Ok(());
            }
        }
        txn.append(Column::RoomHead, opts.op, key, encode_idx(idx));
        Ok(())
    }

    fn index_room_state(
        &self,
        txn: &mut WriteTxn,
        opts: &WriteOpts,
        room_id: &str,
        kind: &str,
        state_key: &str,
        idx: EventIdx,
    ) -> Result<(), StorageError> {
        if opts.op == Op::Put && self.redacted_idx(txn, idx)? {
            debug!(
                "[mx-03] Skipping room state ({}, {}) for redacted {}",
                kind, state_key, idx
            );
            return Ok(());
        }
        txn.append(
            Column::RoomState,
            opts.op,
            room_state_key(room_id, kind, state_key),
            encode_idx(idx),
        );
        Ok(())
    }

    fn index_room_joined(
        &self,
        txn: &mut WriteTxn,
        event: &Event,
        opts: &WriteOpts,
        room_id: &str,
        state_key: &str,
        idx: EventIdx,
    ) {
        let Some(origin) = ids::host(state_key) else {
            warn!(
                "[mx-03] Member event {} state_key {:?} has no server",
                idx, state_key
            );
            return;
        };
        let key = room_joined_key(room_id, origin, state_key);
        let joined = event.content_str("membership") == Some("join");
        match opts.op {
            Op::Put if joined => txn.put(Column::RoomJoined, key, encode_idx(idx)),
            _ => txn.delete(Column::RoomJoined, key),
        }
    }

    /// Redacted within this transaction or by an already committed redaction.
    fn redacted_idx(&self, txn: &WriteTxn, idx: EventIdx) -> Result<bool, StorageError> {
        if txn.is_redacted(idx) {
            return Ok(true);
        }
        let prefix = event_refs_type_prefix(idx, RefType::Redaction);
        Ok(!self.engine.prefix_scan(Column::EventRefs, &prefix)?.is_empty())
    }
}
