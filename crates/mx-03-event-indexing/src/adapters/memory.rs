//! In-memory key-value engine.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::domain::columns::Column;
use crate::domain::errors::KvError;
use crate::domain::txn::WriteTxn;
use crate::domain::write_opts::Op;
use crate::ports::outbound::{Direction, KeyRange, KvEngine, KvPair};

pub type Keyspace = BTreeMap<Vec<u8>, Vec<u8>>;

/// `BTreeMap` per column behind one lock, so a commit is atomic with
/// respect to every reader.
#[derive(Debug, Default)]
pub struct InMemoryKvEngine {
    columns: RwLock<HashMap<Column, Keyspace>>,
    fail_commits: AtomicBool,
    commits: AtomicUsize,
}

impl InMemoryKvEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail without applying anything.
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn len(&self, column: Column) -> usize {
        self.columns.read().get(&column).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.read().values().all(BTreeMap::is_empty)
    }

    /// Copy of every non-empty column, ordered by column.
    pub fn snapshot(&self) -> BTreeMap<Column, Keyspace> {
        self.columns
            .read()
            .iter()
            .filter(|(_, keyspace)| !keyspace.is_empty())
            .map(|(column, keyspace)| (*column, keyspace.clone()))
            .collect()
    }
}

impl KvEngine for InMemoryKvEngine {
    fn get(&self, column: Column, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self
            .columns
            .read()
            .get(&column)
            .and_then(|keyspace| keyspace.get(key))
            .cloned())
    }

    fn scan(
        &self,
        column: Column,
        range: &KeyRange,
        direction: Direction,
    ) -> Result<Vec<KvPair>, KvError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let columns = self.columns.read();
        let Some(keyspace) = columns.get(&column) else {
            return Ok(Vec::new());
        };

        let bounds = (
            Bound::Included(range.start.clone()),
            range.end.clone().map_or(Bound::Unbounded, Bound::Excluded),
        );
        let iter = keyspace
            .range::<Vec<u8>, _>(bounds)
            .map(|(k, v)| (k.clone(), v.clone()));
        Ok(match direction {
            Direction::Forward => iter.collect(),
            Direction::Reverse => iter.rev().collect(),
        })
    }

    fn commit(&self, txn: WriteTxn) -> Result<(), KvError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(KvError::Backend {
                message: "commit rejected".into(),
            });
        }

        let mut columns = self.columns.write();
        for delta in txn.into_deltas() {
            let keyspace = columns.entry(delta.column).or_default();
            match delta.op {
                Op::Put => {
                    keyspace.insert(delta.key, delta.value);
                }
                Op::Delete => {
                    keyspace.remove(&delta.key);
                }
            }
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
