//! Fluent construction of one transaction over one or more events.

use std::num::NonZeroU64;

use shared_types::{Event, EventIdx};

use crate::domain::appendix::{Appendix, RefMask};
use crate::domain::errors::StorageError;
use crate::domain::txn::WriteTxn;
use crate::domain::write_opts::{Op, WriteOpts};
use crate::ports::outbound::KvEngine;

use super::StorageContext;

/// Collects writes into one [`WriteTxn`] under a shared set of options.
///
/// ```ignore
/// let mut builder = ctx.txn().appendix(Appendix::ALL);
/// builder.append(&create, 1)?;
/// builder.append(&member, 2)?;
/// builder.commit()?;
/// ```
pub struct WriteTxnBuilder<'a, K: KvEngine> {
    ctx: &'a StorageContext<K>,
    txn: WriteTxn,
    opts: WriteOpts,
}

impl<'a, K: KvEngine> WriteTxnBuilder<'a, K> {
    pub(super) fn new(ctx: &'a StorageContext<K>) -> Self {
        Self {
            ctx,
            txn: WriteTxn::new(),
            opts: WriteOpts::default(),
        }
    }

    pub fn opts(mut self, opts: WriteOpts) -> Self {
        self.opts = opts;
        self
    }

    pub fn op(mut self, op: Op) -> Self {
        self.opts.op = op;
        self
    }

    pub fn appendix(mut self, appendix: Appendix) -> Self {
        self.opts.appendix = appendix;
        self
    }

    pub fn event_refs(mut self, event_refs: RefMask) -> Self {
        self.opts.event_refs = event_refs;
        self
    }

    pub fn horizon_resolve(mut self, horizon_resolve: RefMask) -> Self {
        self.opts.horizon_resolve = horizon_resolve;
        self
    }

    pub fn interpose(mut self, interpose: bool) -> Self {
        self.opts.interpose = interpose;
        self
    }

    pub fn allow_queries(mut self, allow_queries: bool) -> Self {
        self.opts.allow_queries = allow_queries;
        self
    }

    /// Index `event` under `idx`.
    pub fn append(&mut self, event: &Event, idx: EventIdx) -> Result<usize, StorageError> {
        let Some(idx) = NonZeroU64::new(idx) else {
            return Err(StorageError::MissingIndex {
                event_id: event.id().unwrap_or("<unknown>").to_string(),
            });
        };
        let opts = WriteOpts {
            event_idx: Some(idx),
            blacklist: false,
            ..self.opts.clone()
        };
        self.ctx.write(&mut self.txn, event, &opts)
    }

    /// Mark the event's id as known-bad.
    pub fn blacklist(&mut self, event: &Event) -> Result<usize, StorageError> {
        let opts = WriteOpts {
            event_idx: None,
            blacklist: true,
            ..self.opts.clone()
        };
        self.ctx.write(&mut self.txn, event, &opts)
    }

    pub fn len(&self) -> usize {
        self.txn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txn.is_empty()
    }

    pub fn build(self) -> WriteTxn {
        self.txn
    }

    pub fn commit(self) -> Result<(), StorageError> {
        self.ctx.commit(self.txn)
    }
}
