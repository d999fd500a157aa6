//! Redaction of a target's room state.

use serde_json::Value;
use shared_types::{Event, EventField, EventIdx, SerializationError};
use tracing::{debug, warn};

use crate::domain::appendix::Index;
use crate::domain::columns::Column;
use crate::domain::errors::StorageError;
use crate::domain::keys::{encode_idx, event_horizon_key, room_state_key};
use crate::domain::txn::WriteTxn;
use crate::domain::write_opts::{Op, WriteOpts};
use crate::ports::outbound::KvEngine;

use super::write::require;
use super::StorageContext;

impl<K: KvEngine> StorageContext<K> {
    /// Remove the redaction target's entry from the room state projection.
    ///
    /// An unknown target is parked in the horizon under this redaction; when
    /// the target arrives horizon resolution runs this again.
    pub(super) fn index_room_redact(
        &self,
        txn: &mut WriteTxn,
        event: &Event,
        opts: &WriteOpts,
        idx: EventIdx,
    ) -> Result<(), StorageError> {
        let Some(target_id) = event.redacts() else {
            warn!(
                "[mx-03] Redaction {} names no target",
                event.id().unwrap_or("<unknown>")
            );
            return Ok(());
        };

        let Some(target_idx) = self.find_event_idx_staged(txn, opts, target_id)? else {
            warn!(
                "[mx-03] Redaction {} target {} is not yet indexed",
                event.id().unwrap_or("<unknown>"),
                target_id
            );
            let pending = event_horizon_key(target_id, idx);
            if opts.appendix.has(Index::EventHorizon)
                && !txn.has(opts.op, Column::EventHorizon, &pending)
            {
                self.index_event_horizon(txn, opts, target_id, idx, event.room_id());
            }
            return Ok(());
        };

        if opts.op != Op::Put {
            return Ok(());
        }

        let room_id = require(event, event.room_id(), "room_id")?;
        let Some(state_key) = self.read_text(txn, opts, target_idx, EventField::StateKey)? else {
            return Ok(());
        };
        let target_room = self.read_text(txn, opts, target_idx, EventField::RoomId)?;
        if target_room.as_deref() != Some(room_id) {
            debug!(
                "[mx-03] Redaction {} target {} is in another room",
                idx, target_id
            );
            return Ok(());
        }
        let Some(kind) = self.read_text(txn, opts, target_idx, EventField::Type)? else {
            return Err(StorageError::MissingField {
                event_id: target_id.to_string(),
                field: "type",
            });
        };

        txn.mark_redacted(target_idx);
        txn.delete(Column::RoomState, room_state_key(room_id, &kind, &state_key));
        debug!(
            "[mx-03] Redaction {} removed room state ({}, {})",
            idx, kind, state_key
        );
        Ok(())
    }

    fn read_text(
        &self,
        txn: &WriteTxn,
        opts: &WriteOpts,
        idx: EventIdx,
        field: EventField,
    ) -> Result<Option<String>, StorageError> {
        Ok(self
            .read_field(txn, opts, idx, field)?
            .and_then(|value| value.as_str().map(str::to_owned)))
    }

    /// A field of `idx`, seeing this transaction's staged writes first when
    /// read-your-writes is enabled.
    fn read_field(
        &self,
        txn: &WriteTxn,
        opts: &WriteOpts,
        idx: EventIdx,
        field: EventField,
    ) -> Result<Option<Value>, StorageError> {
        if opts.interpose && self.config.read_your_writes {
            let key = encode_idx(idx);
            if let Some(delta) = txn.staged(Column::Field(field), &key) {
                return match delta.op {
                    Op::Put => Ok(Some(
                        serde_json::from_slice(&delta.value).map_err(SerializationError::from)?,
                    )),
                    Op::Delete => Ok(None),
                };
            }
            if let Some(json) = txn.val(Column::EventJson, &key) {
                return Ok(Event::from_slice(json)?.get(field)?);
            }
        }
        self.get(idx, field)
    }
}
