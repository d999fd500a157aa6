//! Event-scoped indices: id, columns, JSON, sender, type and state.

use shared_types::{canonical_json, Event, EventField, EventIdx, SerializationError};

use crate::domain::appendix::Index;
use crate::domain::columns::Column;
use crate::domain::errors::StorageError;
use crate::domain::keys::{
    decode_idx, encode_idx, event_state_key, text_idx_key, EVENT_IDX_MAX_KEY,
};
use crate::domain::txn::WriteTxn;
use crate::domain::write_opts::{Op, WriteOpts};
use crate::ports::outbound::KvEngine;

use super::write::{require, require_id};
use super::StorageContext;

impl<K: KvEngine> StorageContext<K> {
    pub(super) fn index_event(
        &self,
        txn: &mut WriteTxn,
        event: &Event,
        opts: &WriteOpts,
        idx: EventIdx,
    ) -> Result<(), StorageError> {
        let appendix = opts.appendix;

        if appendix.has(Index::EventId) {
            let event_id = require_id(event)?;
            txn.append(Column::EventIdx, opts.op, event_id.as_bytes(), encode_idx(idx));
            if opts.op == Op::Put {
                self.raise_idx_max(txn, idx)?;
            }
        }

        if appendix.has(Index::EventCols) {
            self.index_event_cols(txn, event, opts, idx)?;
        }

        if appendix.has(Index::EventJson) {
            txn.append(Column::EventJson, opts.op, encode_idx(idx), canonical_json(event)?);
        }

        if appendix.has(Index::EventSender) {
            if let Some(sender) = event.sender() {
                txn.append(Column::EventSender, opts.op, text_idx_key(sender, idx), Vec::new());
            }
        }

        if appendix.has(Index::EventType) {
            if let Some(kind) = event.kind() {
                txn.append(Column::EventType, opts.op, text_idx_key(kind, idx), Vec::new());
            }
        }

        if appendix.has(Index::EventState) {
            if let Some(state_key) = event.state_key() {
                let kind = require(event, event.kind(), "type")?;
                let room_id = require(event, event.room_id(), "room_id")?;
                let depth = require(event, event.depth, "depth")?;
                txn.append(
                    Column::EventState,
                    opts.op,
                    event_state_key(state_key, kind, room_id, depth, idx),
                    Vec::new(),
                );
            }
        }

        if appendix.has(Index::EventRefs) && opts.event_refs.any() {
            self.index_event_refs(txn, event, opts, idx)?;
        }

        if appendix.has(Index::EventHorizonResolve) && opts.horizon_resolve.any() {
            self.index_event_horizon_resolve(txn, event, opts, idx)?;
        }

        Ok(())
    }

    /// Deleting the newest event must not let its idx be handed out again.
    fn raise_idx_max(&self, txn: &mut WriteTxn, idx: EventIdx) -> Result<(), StorageError> {
        let current = match txn.val(Column::EventIdxMax, EVENT_IDX_MAX_KEY) {
            Some(staged) => decode_idx(staged),
            None => self
                .engine
                .get(Column::EventIdxMax, EVENT_IDX_MAX_KEY)?
                .as_deref()
                .and_then(decode_idx),
        };
        if current.map_or(true, |current| idx > current) {
            txn.put(Column::EventIdxMax, EVENT_IDX_MAX_KEY, encode_idx(idx));
        }
        Ok(())
    }

    fn index_event_cols(
        &self,
        txn: &mut WriteTxn,
        event: &Event,
        opts: &WriteOpts,
        idx: EventIdx,
    ) -> Result<(), StorageError> {
        let key = encode_idx(idx);
        for field in EventField::ALL {
            if let Some(value) = event.get(field)? {
                let bytes = serde_json::to_vec(&value).map_err(SerializationError::from)?;
                txn.append(Column::Field(field), opts.op, key, bytes);
            }
        }
        Ok(())
    }
}
