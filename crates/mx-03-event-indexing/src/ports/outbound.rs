//! # Outbound Ports (Driven Ports)
//!
//! The ordered key-value engine the indexing core writes to.

use std::sync::Arc;

use crate::domain::columns::Column;
use crate::domain::errors::KvError;
use crate::domain::txn::WriteTxn;

pub use crate::domain::keys::KeyRange;

/// A key and its value.
pub type KvPair = (Vec<u8>, Vec<u8>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// An ordered byte-string store with one keyspace per [`Column`].
///
/// Production: `RocksDbEngine` (node-runtime/src/adapters/rocksdb_adapter.rs)
/// Testing: `InMemoryKvEngine` (adapters/memory.rs)
///
/// Scans return a consistent snapshot. A commit applies every staged
/// mutation or none, and readers never observe part of one.
pub trait KvEngine: Send + Sync {
    fn get(&self, column: Column, key: &[u8]) -> Result<Option<Vec<u8>>, KvError>;

    fn exists(&self, column: Column, key: &[u8]) -> Result<bool, KvError> {
        Ok(self.get(column, key)?.is_some())
    }

    /// Pairs within `range`, in key order or reverse key order.
    fn scan(
        &self,
        column: Column,
        range: &KeyRange,
        direction: Direction,
    ) -> Result<Vec<KvPair>, KvError>;

    fn prefix_scan(&self, column: Column, prefix: &[u8]) -> Result<Vec<KvPair>, KvError> {
        self.scan(column, &KeyRange::prefix(prefix), Direction::Forward)
    }

    /// The greatest pair within `range`.
    fn seek_last(&self, column: Column, range: &KeyRange) -> Result<Option<KvPair>, KvError> {
        Ok(self.scan(column, range, Direction::Reverse)?.into_iter().next())
    }

    /// Apply every mutation in `txn` atomically.
    fn commit(&self, txn: WriteTxn) -> Result<(), KvError>;
}

impl<K: KvEngine + ?Sized> KvEngine for Arc<K> {
    fn get(&self, column: Column, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        (**self).get(column, key)
    }

    fn exists(&self, column: Column, key: &[u8]) -> Result<bool, KvError> {
        (**self).exists(column, key)
    }

    fn scan(
        &self,
        column: Column,
        range: &KeyRange,
        direction: Direction,
    ) -> Result<Vec<KvPair>, KvError> {
        (**self).scan(column, range, direction)
    }

    fn seek_last(&self, column: Column, range: &KeyRange) -> Result<Option<KvPair>, KvError> {
        (**self).seek_last(column, range)
    }

    fn commit(&self, txn: WriteTxn) -> Result<(), KvError> {
        (**self).commit(txn)
    }
}
