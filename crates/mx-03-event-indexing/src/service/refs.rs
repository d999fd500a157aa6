//! Reference edges between events.

use shared_types::{Event, EventIdx};
use tracing::{debug, warn};

use crate::domain::appendix::{Index, RefType};
use crate::domain::columns::Column;
use crate::domain::errors::StorageError;
use crate::domain::keys::{
    decode_idx, event_horizon_key, event_refs_key, event_refs_prefix, parse_event_refs_key,
};
use crate::domain::txn::WriteTxn;
use crate::domain::write_opts::{Op, WriteOpts};
use crate::ports::outbound::KvEngine;

use super::write::require_id;
use super::StorageContext;

impl<K: KvEngine> StorageContext<K> {
    pub(super) fn index_event_refs(
        &self,
        txn: &mut WriteTxn,
        event: &Event,
        opts: &WriteOpts,
        idx: EventIdx,
    ) -> Result<(), StorageError> {
        if opts.op == Op::Delete && opts.appendix.has(Index::EventHorizon) {
            self.unresolve_referrers(txn, event, idx)?;
        }

        if opts.event_refs.has(RefType::Next) {
            for prev_id in event.prev_ids() {
                self.index_event_ref(txn, event, opts, idx, prev_id, RefType::Next)?;
            }
        }

        if opts.event_refs.has(RefType::NextAuth) {
            for auth_id in event.auth_ids() {
                self.index_event_ref(txn, event, opts, idx, auth_id, RefType::NextAuth)?;
            }
        }

        if opts.event_refs.has(RefType::Redaction) && event.is_redaction() {
            if let Some(target) = event.redacts() {
                self.index_event_ref(txn, event, opts, idx, target, RefType::Redaction)?;
            }
        }

        Ok(())
    }

    fn index_event_ref(
        &self,
        txn: &mut WriteTxn,
        event: &Event,
        opts: &WriteOpts,
        referrer: EventIdx,
        target_id: &str,
        ref_type: RefType,
    ) -> Result<(), StorageError> {
        match self.find_event_idx_staged(txn, opts, target_id)? {
            Some(target) => {
                txn.append(
                    Column::EventRefs,
                    opts.op,
                    event_refs_key(target, ref_type, referrer),
                    Vec::new(),
                );
            }
            None if opts.appendix.has(Index::EventHorizon) => {
                self.index_event_horizon(txn, opts, target_id, referrer, event.room_id());
            }
            None => {
                warn!(
                    "[mx-03] {} reference from {} to unknown {} not recorded",
                    ref_type.name(),
                    referrer,
                    target_id
                );
            }
        }
        Ok(())
    }

    /// Referrers of a deleted event go back to waiting for it.
    fn unresolve_referrers(
        &self,
        txn: &mut WriteTxn,
        event: &Event,
        idx: EventIdx,
    ) -> Result<(), StorageError> {
        let event_id = require_id(event)?;
        let room_id = event.room_id().unwrap_or_default();
        for (key, _) in self.engine.prefix_scan(Column::EventRefs, &event_refs_prefix(idx))? {
            let (_, _, referrer) = parse_event_refs_key(&key)
                .ok_or_else(|| StorageError::corrupt("_event_refs", "malformed key"))?;
            txn.put(
                Column::EventHorizon,
                event_horizon_key(event_id, referrer),
                room_id.as_bytes(),
            );
            txn.delete(Column::EventRefs, key);
        }
        debug!("[mx-03] Returned referrers of {} to the horizon", event_id);
        Ok(())
    }

    /// Resolve an id to its index, consulting `txn` first when the options
    /// and configuration allow it.
    pub(crate) fn find_event_idx_staged(
        &self,
        txn: &WriteTxn,
        opts: &WriteOpts,
        event_id: &str,
    ) -> Result<Option<EventIdx>, StorageError> {
        if opts.interpose && self.config.read_your_writes {
            if let Some(delta) = txn.staged(Column::EventIdx, event_id.as_bytes()) {
                return Ok(match delta.op {
                    Op::Put => decode_idx(&delta.value).filter(|idx| *idx != 0),
                    Op::Delete => None,
                });
            }
        }

        if !opts.allow_queries {
            return Ok(None);
        }

        Ok(self.find_event_idx(event_id)?.idx())
    }
}
