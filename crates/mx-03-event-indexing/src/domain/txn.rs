//! The staged write transaction.
//!
//! `write()` only appends to a [`WriteTxn`]; nothing reaches the engine
//! until the caller commits it. Lookups made while building can consult
//! what is already staged.

use std::collections::{BTreeMap, BTreeSet};

use shared_types::EventIdx;

use super::columns::Column;
use super::write_opts::Op;

/// One staged mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub column: Column,
    pub op: Op,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    deltas: usize,
    redacted: usize,
}

/// Mutations to be committed atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteTxn {
    deltas: Vec<Delta>,
    /// Events redacted by redactions staged in this txn, in staging order.
    redacted: Vec<EventIdx>,
}

impl WriteTxn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        column: Column,
        op: Op,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) {
        self.deltas.push(Delta {
            column,
            op,
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn put(&mut self, column: Column, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.append(column, Op::Put, key, value);
    }

    pub fn delete(&mut self, column: Column, key: impl Into<Vec<u8>>) {
        self.append(column, Op::Delete, key, Vec::new());
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    pub fn into_deltas(self) -> Vec<Delta> {
        self.deltas
    }

    /// The most recent staged mutation of `key` in `column`.
    pub fn staged(&self, column: Column, key: &[u8]) -> Option<&Delta> {
        self.deltas
            .iter()
            .rev()
            .find(|d| d.column == column && d.key == key)
    }

    /// Whether the most recent staged mutation of `key` is `op`.
    pub fn has(&self, op: Op, column: Column, key: &[u8]) -> bool {
        self.staged(column, key).is_some_and(|d| d.op == op)
    }

    /// The staged value of `key`, if its most recent mutation is a put.
    pub fn val(&self, column: Column, key: &[u8]) -> Option<&[u8]> {
        self.staged(column, key)
            .filter(|d| d.op == Op::Put)
            .map(|d| d.value.as_slice())
    }

    /// The most recent staged mutation of every key in `column` that begins
    /// with `prefix`, in key order.
    pub fn staged_prefix(&self, column: Column, prefix: &[u8]) -> BTreeMap<&[u8], &Delta> {
        let mut latest = BTreeMap::new();
        for delta in &self.deltas {
            if delta.column == column && delta.key.starts_with(prefix) {
                latest.insert(delta.key.as_slice(), delta);
            }
        }
        latest
    }

    pub fn mark_redacted(&mut self, idx: EventIdx) {
        self.redacted.push(idx);
    }

    pub fn is_redacted(&self, idx: EventIdx) -> bool {
        self.redacted.contains(&idx)
    }

    /// Distinct events redacted within this txn.
    pub fn redacted(&self) -> BTreeSet<EventIdx> {
        self.redacted.iter().copied().collect()
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            deltas: self.deltas.len(),
            redacted: self.redacted.len(),
        }
    }

    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        self.deltas.truncate(checkpoint.deltas);
        self.redacted.truncate(checkpoint.redacted);
    }

    pub(crate) fn since(&self, checkpoint: Checkpoint) -> usize {
        self.deltas.len() - checkpoint.deltas
    }
}
