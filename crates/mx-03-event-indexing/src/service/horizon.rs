//! Horizon registration and resolution.
//!
//! An event referencing an id that is not yet indexed leaves an entry
//! `unresolved_id \0 referrer_idx` holding the referrer's room id. When the unresolved event is written
//! its entries are scanned, each referrer has its reference-dependent
//! indices rebuilt inside the same transaction, and the entries are
//! removed. Entries staged earlier in the same transaction count as
//! pending when read-your-writes is enabled.

use std::collections::BTreeMap;
use std::num::NonZeroU64;

use serde_json::Value;
use shared_types::{Event, EventField, EventIdx, SerializationError};
use tracing::{debug, warn};

use crate::domain::appendix::{Appendix, Index, RefMask};
use crate::domain::columns::Column;
use crate::domain::errors::StorageError;
use crate::domain::keys::{
    encode_idx, event_horizon_key, event_horizon_prefix, parse_event_horizon_key,
};
use crate::domain::txn::WriteTxn;
use crate::domain::write_opts::{Op, WriteOpts};
use crate::ports::outbound::{KvEngine, KvPair};

use super::StorageContext;

impl<K: KvEngine> StorageContext<K> {
    /// Park `referrer` under `unresolved_id`. The value is the referrer's
    /// room so room-scoped scans need no lookup.
    pub(crate) fn index_event_horizon(
        &self,
        txn: &mut WriteTxn,
        opts: &WriteOpts,
        unresolved_id: &str,
        referrer: EventIdx,
        room_id: Option<&str>,
    ) {
        txn.append(
            Column::EventHorizon,
            opts.op,
            event_horizon_key(unresolved_id, referrer),
            room_id.unwrap_or_default().as_bytes(),
        );
        debug!(
            "[mx-03] Horizon {:?} {} referenced by {}",
            opts.op, unresolved_id, referrer
        );
    }

    pub(super) fn index_event_horizon_resolve(
        &self,
        txn: &mut WriteTxn,
        event: &Event,
        opts: &WriteOpts,
        idx: EventIdx,
    ) -> Result<(), StorageError> {
        let Some(event_id) = event.id() else {
            return Ok(());
        };

        let pending = self.pending_horizon(txn, opts, event_id)?;
        if pending.is_empty() {
            return Ok(());
        }

        debug!(
            "[mx-03] Resolving {} horizon entries for {} idx:{}",
            pending.len(),
            event_id,
            idx
        );

        let batch_size = self.config.horizon_batch_size.max(1);
        for batch in pending.chunks(batch_size) {
            let mut referrers = Vec::with_capacity(batch.len());
            for (key, _) in batch {
                let (_, referrer) = parse_event_horizon_key(key)
                    .ok_or_else(|| StorageError::corrupt("_event_horizon", "malformed key"))?;
                referrers.push((key, referrer, self.fetch_staged(txn, opts, referrer)?));
            }

            for (key, referrer, fetched) in referrers {
                match fetched {
                    Some(referrer_event) => {
                        self.resolve_referrer(txn, opts, event_id, &referrer_event, referrer)?;
                    }
                    None => warn!(
                        "[mx-03] Horizon referrer {} of {} cannot be fetched",
                        referrer, event_id
                    ),
                }
                txn.append(Column::EventHorizon, opts.op.inverse(), key.clone(), Vec::new());
            }
        }

        Ok(())
    }

    /// Horizon entries waiting on `event_id`: committed ones overlaid with
    /// the latest mutation staged in `txn`.
    fn pending_horizon(
        &self,
        txn: &WriteTxn,
        opts: &WriteOpts,
        event_id: &str,
    ) -> Result<Vec<KvPair>, StorageError> {
        let prefix = event_horizon_prefix(event_id);
        let mut pending: BTreeMap<Vec<u8>, Vec<u8>> = self
            .engine
            .prefix_scan(Column::EventHorizon, &prefix)?
            .into_iter()
            .collect();

        if opts.op == Op::Put && opts.interpose && self.config.read_your_writes {
            for (key, delta) in txn.staged_prefix(Column::EventHorizon, &prefix) {
                match delta.op {
                    Op::Put => {
                        pending.insert(key.to_vec(), delta.value.clone());
                    }
                    Op::Delete => {
                        pending.remove(key);
                    }
                }
            }
        }

        Ok(pending.into_iter().collect())
    }

    /// A referrer staged earlier in `txn`, or else a committed one.
    fn fetch_staged(
        &self,
        txn: &WriteTxn,
        opts: &WriteOpts,
        idx: EventIdx,
    ) -> Result<Option<Event>, StorageError> {
        if opts.interpose && self.config.read_your_writes {
            let key = encode_idx(idx);
            if let Some(json) = txn.val(Column::EventJson, &key) {
                let mut event = Event::from_slice(json)?;
                if let Some(bytes) = txn.val(Column::Field(EventField::EventId), &key) {
                    let value: Value =
                        serde_json::from_slice(bytes).map_err(SerializationError::from)?;
                    if let Value::String(event_id) = value {
                        event.set_id(event_id);
                    }
                }
                return Ok(Some(event));
            }
        }
        self.fetch(idx)
    }

    fn resolve_referrer(
        &self,
        txn: &mut WriteTxn,
        opts: &WriteOpts,
        resolved_id: &str,
        referrer_event: &Event,
        referrer: EventIdx,
    ) -> Result<(), StorageError> {
        // Still-missing references of the referrer are re-registered, which
        // is idempotent.
        let mut appendix = opts
            .appendix
            .intersect(Appendix::HORIZON_RESOLVE.with(Index::EventHorizon));
        if referrer_event.redacts() != Some(resolved_id) {
            appendix = appendix.without(Index::RoomRedact);
        }

        let sub = WriteOpts {
            op: opts.op,
            event_idx: NonZeroU64::new(referrer),
            appendix,
            event_refs: opts.horizon_resolve,
            horizon_resolve: RefMask::NONE,
            blacklist: false,
            interpose: true,
            allow_queries: opts.allow_queries,
        };

        self.index(txn, referrer_event, &sub, referrer)
    }
}
