//! # RocksDB Key-Value Engine
//!
//! Production [`KvEngine`] backed by RocksDB.
//!
//! ## Features
//!
//! - One column family per [`Column`]
//! - Atomic commits through a single `WriteBatch`
//! - Range scans read from a snapshot
//! - Snappy compression and bloom filters

use std::sync::Arc;

use mx_03_event_indexing::{Column, Direction, KeyRange, KvEngine, KvError, KvPair, Op, WriteTxn};
use parking_lot::RwLock;
use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamily, ColumnFamilyDescriptor, DBCompressionType,
    IteratorMode, Options, WriteBatch, WriteOptions, DB,
};
use tracing::info;

use crate::config::RocksDbConfig;

fn backend(context: &str, e: rocksdb::Error) -> KvError {
    KvError::Backend {
        message: format!("RocksDB {} failed: {}", context, e),
    }
}

pub struct RocksDbEngine {
    db: Arc<RwLock<DB>>,
    config: RocksDbConfig,
}

impl RocksDbEngine {
    /// Open or create the database with every index column family.
    pub fn open(config: &RocksDbConfig) -> Result<Self, KvError> {
        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.create_missing_column_families(true);

        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.set_compression_type(DBCompressionType::Snappy);

        // Bloom filter for point lookups by event id
        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = Column::all()
            .map(|column| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(DBCompressionType::Snappy);
                ColumnFamilyDescriptor::new(column.name(), cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors)
            .map_err(|e| backend("open", e))?;

        info!("[node] Opened RocksDB at {}", config.path);
        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &RocksDbConfig {
        &self.config
    }
}

fn cf(db: &DB, column: Column) -> Result<&ColumnFamily, KvError> {
    db.cf_handle(column.name())
        .ok_or_else(|| KvError::UnknownColumn(column.name().to_string()))
}

impl KvEngine for RocksDbEngine {
    fn get(&self, column: Column, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        let db = self.db.read();
        db.get_cf(cf(&db, column)?, key)
            .map_err(|e| backend("get", e))
    }

    fn exists(&self, column: Column, key: &[u8]) -> Result<bool, KvError> {
        let db = self.db.read();
        db.get_pinned_cf(cf(&db, column)?, key)
            .map(|v| v.is_some())
            .map_err(|e| backend("exists", e))
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
        let db = self.db.read();
        let handle = cf(&db, column)?;
        let snapshot = db.snapshot();

        let mode = match (direction, range.end.as_deref()) {
            (Direction::Forward, _) => {
                IteratorMode::From(range.start.as_slice(), rocksdb::Direction::Forward)
            }
            (Direction::Reverse, Some(end)) => IteratorMode::From(end, rocksdb::Direction::Reverse),
            (Direction::Reverse, None) => IteratorMode::End,
        };

        let mut results = Vec::new();
        for item in snapshot.iterator_cf(handle, mode) {
            let (key, value) = item.map_err(|e| backend("scan", e))?;
            match direction {
                Direction::Forward => {
                    if range.end.as_deref().is_some_and(|end| &*key >= end) {
                        break;
                    }
                }
                Direction::Reverse => {
                    if &*key < range.start.as_slice() {
                        break;
                    }
                    // The reverse seek lands on the exclusive end itself
                    if !range.contains(&key) {
                        continue;
                    }
                }
            }
            results.push((key.to_vec(), value.to_vec()));
        }
        Ok(results)
    }

    fn commit(&self, txn: WriteTxn) -> Result<(), KvError> {
        let db = self.db.write();
        let mut batch = WriteBatch::default();

        for delta in txn.into_deltas() {
            let handle = cf(&db, delta.column)?;
            match delta.op {
                Op::Put => batch.put_cf(handle, &delta.key, &delta.value),
                Op::Delete => batch.delete_cf(handle, &delta.key),
            }
        }

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);

        db.write_opt(batch, &write_opts)
            .map_err(|e| backend("batch write", e))
    }
}
