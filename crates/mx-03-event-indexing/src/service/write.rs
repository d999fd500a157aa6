//! Top-level write entry point.

use shared_types::{Event, EventIdx};
use tracing::{debug, error};

use crate::domain::columns::Column;
use crate::domain::errors::StorageError;
use crate::domain::keys::{encode_idx, SEP};
use crate::domain::txn::WriteTxn;
use crate::domain::write_opts::WriteOpts;
use crate::ports::outbound::KvEngine;

use super::StorageContext;

impl<K: KvEngine> StorageContext<K> {
    /// Stage every mutation `opts` selects for `event` into `txn` and return
    /// how many were staged.
    ///
    /// On error nothing staged by this call remains in `txn`.
    pub fn write(
        &self,
        txn: &mut WriteTxn,
        event: &Event,
        opts: &WriteOpts,
    ) -> Result<usize, StorageError> {
        let checkpoint = txn.checkpoint();
        match self.write_staged(txn, event, opts) {
            Ok(()) => Ok(txn.since(checkpoint)),
            Err(e) => {
                txn.rollback(checkpoint);
                error!(
                    "[mx-03] Event {} txn building error: {}",
                    event.id().unwrap_or("<unknown>"),
                    e
                );
                Err(e)
            }
        }
    }

    fn write_staged(
        &self,
        txn: &mut WriteTxn,
        event: &Event,
        opts: &WriteOpts,
    ) -> Result<(), StorageError> {
        match opts.event_idx {
            Some(idx) => self.index(txn, event, opts, idx.get()),
            None if opts.blacklist => self.blacklist(txn, event, opts),
            None => Err(StorageError::MissingIndex {
                event_id: event.id().unwrap_or("<unknown>").to_string(),
            }),
        }
    }

    fn blacklist(
        &self,
        txn: &mut WriteTxn,
        event: &Event,
        opts: &WriteOpts,
    ) -> Result<(), StorageError> {
        let event_id = require_id(event)?;
        check_key_components(event)?;
        txn.append(Column::EventIdx, opts.op, event_id.as_bytes(), encode_idx(0));
        debug!("[mx-03] Blacklisted {}", event_id);
        Ok(())
    }

    pub(crate) fn index(
        &self,
        txn: &mut WriteTxn,
        event: &Event,
        opts: &WriteOpts,
        idx: EventIdx,
    ) -> Result<(), StorageError> {
        check_key_components(event)?;
        self.index_event(txn, event, opts, idx)?;
        if event.room_id().is_some() {
            self.index_room(txn, event, opts, idx)?;
        }
        Ok(())
    }
}

pub(crate) fn require_id(event: &Event) -> Result<&str, StorageError> {
    event.id().ok_or_else(|| StorageError::MissingField {
        event_id: "<unknown>".into(),
        field: "event_id",
    })
}

/// A field the current index cannot be built without.
pub(crate) fn require<T>(
    event: &Event,
    value: Option<T>,
    field: &'static str,
) -> Result<T, StorageError> {
    value.ok_or_else(|| StorageError::MissingField {
        event_id: event.id().unwrap_or("<unknown>").to_string(),
        field,
    })
}

/// Refuse strings that would land in a NUL-separated key with a NUL inside.
fn check_key_components(event: &Event) -> Result<(), StorageError> {
    let fields = [
        ("event_id", event.id()),
        ("room_id", event.room_id()),
        ("sender", event.sender()),
        ("type", event.kind()),
        ("state_key", event.state_key()),
        ("redacts", event.redacts()),
    ];
    let refs = event
        .prev_ids()
        .map(|id| ("prev_events", Some(id)))
        .chain(event.auth_ids().map(|id| ("auth_events", Some(id))));

    for (field, value) in fields.into_iter().chain(refs) {
        if value.is_some_and(|v| v.as_bytes().contains(&SEP)) {
            return Err(StorageError::NulInKey {
                event_id: event.id().unwrap_or("<unknown>").to_string(),
                field,
            });
        }
    }
    Ok(())
}
