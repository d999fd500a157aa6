//! # Evaluation Pipeline
//!
//! Takes an event from arrival to a committed index:
//!
//! ```text
//! known? ──▶ conformity policy ──▶ assign id ──▶ id format
//!                  │                                │
//!                  └── reject (blacklist) ◀─────────┘
//!                                                   ▼
//!                    commit ◀── write() ◀── allocate idx ◀── duplicate?
//! ```
//!
//! Allocation, write and commit run under one lock so event indices are
//! committed in the order they are handed out.

use std::sync::Arc;

use mx_03_event_indexing::{Appendix, KvEngine, StorageContext, WriteOpts, WriteTxn};
use mx_04_event_conformity::{ConformOpts, ConformityService, ConformityViolation, Report};
use parking_lot::Mutex;
use shared_types::{make_id, Event, EventIdx, EventIndexState};
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::errors::EvalError;
use crate::oracle::StoreRedactionOracle;
use crate::sequencer::Sequencer;

/// Options for one evaluation.
#[derive(Debug, Clone)]
pub struct EvalOpts {
    pub room_version: String,
    pub conform: ConformOpts,
    /// The room never federates.
    pub room_internal: bool,
    /// The event is being issued by this server.
    pub issuing: bool,
    /// Derive the event id when the event arrives without one.
    pub assign_id: bool,
    /// Record rejected event ids as known-bad.
    pub blacklist: bool,
    pub appendix: Appendix,
}

impl Default for EvalOpts {
    fn default() -> Self {
        Self {
            room_version: "4".to_string(),
            conform: ConformOpts::strict(),
            room_internal: false,
            issuing: false,
            assign_id: true,
            blacklist: true,
            appendix: Appendix::ALL,
        }
    }
}

impl EvalOpts {
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            room_version: config.room_version.clone(),
            conform: if config.conformity.strict {
                ConformOpts::strict()
            } else {
                ConformOpts::default()
            },
            blacklist: config.blacklist_rejected,
            ..Self::default()
        }
    }

    pub fn with_room_version(mut self, room_version: impl Into<String>) -> Self {
        self.room_version = room_version.into();
        self
    }

    pub fn with_conform(mut self, conform: ConformOpts) -> Self {
        self.conform = conform;
        self
    }

    pub fn with_issuing(mut self, issuing: bool) -> Self {
        self.issuing = issuing;
        self
    }

    pub fn with_room_internal(mut self, room_internal: bool) -> Self {
        self.room_internal = room_internal;
        self
    }

    pub fn with_assign_id(mut self, assign_id: bool) -> Self {
        self.assign_id = assign_id;
        self
    }

    pub fn with_blacklist(mut self, blacklist: bool) -> Self {
        self.blacklist = blacklist;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutcome {
    /// Committed under `idx`; `report` holds the tolerated violations.
    Accepted {
        event_id: String,
        idx: EventIdx,
        report: Report,
    },
    /// Already indexed.
    Duplicate(EventIdx),
}

impl EvalOutcome {
    pub fn idx(&self) -> EventIdx {
        match self {
            EvalOutcome::Accepted { idx, .. } | EvalOutcome::Duplicate(idx) => *idx,
        }
    }
}

pub struct Evaluator<K: KvEngine> {
    store: Arc<StorageContext<K>>,
    conformity: ConformityService,
    sequencer: Sequencer,
    write_lock: Mutex<()>,
}

impl<K: KvEngine> Evaluator<K> {
    pub fn new(
        store: Arc<StorageContext<K>>,
        conformity: ConformityService,
        sequencer: Sequencer,
    ) -> Self {
        Self {
            store,
            conformity,
            sequencer,
            write_lock: Mutex::new(()),
        }
    }

    /// Build from node configuration, continuing after the highest index
    /// already stored.
    pub fn from_config(
        store: Arc<StorageContext<K>>,
        config: &NodeConfig,
    ) -> Result<Self, EvalError> {
        let sequencer = Sequencer::resume(&store)?;
        let conformity = ConformityService::new(config.conformity.clone(), &config.server_name);
        Ok(Self::new(store, conformity, sequencer))
    }

    pub fn store(&self) -> &Arc<StorageContext<K>> {
        &self.store
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn evaluate(&self, mut event: Event, opts: &EvalOpts) -> Result<EvalOutcome, EvalError> {
        if let Some(outcome) = self.known(&event)? {
            return Ok(outcome);
        }

        let oracle = StoreRedactionOracle::new(&self.store);
        let report = match self.conformity.check(
            &event,
            &opts.conform,
            opts.room_internal,
            opts.issuing,
            &oracle,
        ) {
            Ok(report) => report,
            Err(violation) => return Err(self.reject(&event, opts, violation)),
        };

        if event.id().is_none() {
            if !opts.assign_id {
                return Err(EvalError::MissingEventId);
            }
            let event_id = make_id(&event, &opts.room_version)?;
            debug!("[node] Assigned event id {}", event_id);
            event.set_id(event_id);
        }
        if let Err(violation) = self.conformity.check_event_id(&event, &opts.room_version) {
            return Err(self.reject(&event, opts, violation));
        }

        let _guard = self.write_lock.lock();
        if let Some(outcome) = self.known(&event)? {
            return Ok(outcome);
        }

        let idx = self.sequencer.next();
        let mut txn = WriteTxn::new();
        let staged = self.store.write(
            &mut txn,
            &event,
            &WriteOpts::indexed(idx).with_appendix(opts.appendix),
        )?;
        self.store.commit(txn)?;

        let event_id = event.id().unwrap_or_default().to_string();
        info!(
            idx,
            staged,
            "[node] Accepted {}{}",
            event_id,
            if report.clean() { "" } else { " (non-conforming)" }
        );
        Ok(EvalOutcome::Accepted {
            event_id,
            idx,
            report,
        })
    }

    /// Run [`evaluate`](Self::evaluate) on a blocking worker.
    pub async fn evaluate_async(
        self: &Arc<Self>,
        event: Event,
        opts: EvalOpts,
    ) -> Result<EvalOutcome, EvalError>
    where
        K: 'static,
    {
        let this = Arc::clone(self);
        tokio::task::spawn_blocking(move || this.evaluate(event, &opts))
            .await
            .map_err(|e| EvalError::Join(e.to_string()))?
    }

    fn known(&self, event: &Event) -> Result<Option<EvalOutcome>, EvalError> {
        let Some(event_id) = event.id() else {
            return Ok(None);
        };
        match self.store.find_event_idx(event_id)? {
            EventIndexState::Unindexed => Ok(None),
            EventIndexState::Indexed(idx) => {
                debug!("[node] {} already indexed at {}", event_id, idx);
                Ok(Some(EvalOutcome::Duplicate(idx.get())))
            }
            EventIndexState::Blacklisted => Err(EvalError::Blacklisted {
                event_id: event_id.to_string(),
            }),
        }
    }

    fn reject(&self, event: &Event, opts: &EvalOpts, violation: ConformityViolation) -> EvalError {
        let event_id = event.id().unwrap_or("<unassigned>");
        warn!(
            rules = ?violation.reflect(),
            "[node] Rejected {}: {}",
            event_id,
            violation
        );
        if opts.blacklist && event.id().is_some() {
            if let Err(e) = self.blacklist(event) {
                return e;
            }
        }
        EvalError::Rejected(violation)
    }

    /// Record the event id as known-bad unless it is already indexed.
    fn blacklist(&self, event: &Event) -> Result<(), EvalError> {
        let _guard = self.write_lock.lock();
        let Some(event_id) = event.id() else {
            return Ok(());
        };
        if self.store.find_event_idx(event_id)?.is_known() {
            return Ok(());
        }
        let mut txn = WriteTxn::new();
        self.store.write(&mut txn, event, &WriteOpts::blacklist())?;
        self.store.commit(txn)?;
        debug!("[node] Blacklisted {}", event_id);
        Ok(())
    }
}
