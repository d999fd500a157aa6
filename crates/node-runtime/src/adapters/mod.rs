//! # Adapters
//!
//! Production implementations of the indexing core's outbound ports.
//!
//! - `RocksDbEngine` - [`KvEngine`](mx_03_event_indexing::KvEngine) over
//!   RocksDB, one column family per index column (feature `rocksdb`)

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::RocksDbEngine;
