//! Options controlling one `write()` call.

use std::num::NonZeroU64;

use shared_types::EventIdx;

use super::appendix::{Appendix, RefMask};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Put,
    Delete,
}

impl Op {
    pub const fn inverse(self) -> Op {
        match self {
            Op::Put => Op::Delete,
            Op::Delete => Op::Put,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOpts {
    /// Whether the selected indices are added or removed.
    pub op: Op,
    /// Index assigned to the event; `None` is only valid with `blacklist`.
    pub event_idx: Option<NonZeroU64>,
    /// Indices this write touches.
    pub appendix: Appendix,
    /// Reference kinds recorded in `_event_refs`.
    pub event_refs: RefMask,
    /// Reference kinds re-indexed for referrers when this event resolves
    /// their horizon.
    pub horizon_resolve: RefMask,
    /// Record the event id as known-bad instead of indexing it.
    pub blacklist: bool,
    /// Resolve event ids against mutations already staged in the txn.
    pub interpose: bool,
    /// Fall back to committed state for lookups the txn cannot answer.
    pub allow_queries: bool,
}

impl Default for WriteOpts {
    fn default() -> Self {
        Self {
            op: Op::Put,
            event_idx: None,
            appendix: Appendix::ALL,
            event_refs: RefMask::ALL,
            horizon_resolve: RefMask::ALL,
            blacklist: false,
            interpose: true,
            allow_queries: true,
        }
    }
}

impl WriteOpts {
    /// Index under `idx` with every index enabled. An `idx` of zero leaves
    /// the event unindexed and the write will be refused.
    pub fn indexed(idx: EventIdx) -> Self {
        Self {
            event_idx: NonZeroU64::new(idx),
            ..Self::default()
        }
    }

    /// Mark the event id as known-bad.
    pub fn blacklist() -> Self {
        Self {
            blacklist: true,
            ..Self::default()
        }
    }

    pub fn with_op(mut self, op: Op) -> Self {
        self.op = op;
        self
    }

    pub fn with_appendix(mut self, appendix: Appendix) -> Self {
        self.appendix = appendix;
        self
    }

    pub fn with_event_refs(mut self, event_refs: RefMask) -> Self {
        self.event_refs = event_refs;
        self
    }

    pub fn with_horizon_resolve(mut self, horizon_resolve: RefMask) -> Self {
        self.horizon_resolve = horizon_resolve;
        self
    }

    pub fn with_interpose(mut self, interpose: bool) -> Self {
        self.interpose = interpose;
        self
    }

    pub fn with_allow_queries(mut self, allow_queries: bool) -> Self {
        self.allow_queries = allow_queries;
        self
    }
}
