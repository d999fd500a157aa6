//! # Node Configuration
//!
//! Unified configuration for the event store and runtime parameters.
//!
//! ## Environment
//!
//! | Variable | Field |
//! |----------|-------|
//! | `MX_SERVER_NAME` | `server_name` |
//! | `MX_ROOM_VERSION` | `room_version` |
//! | `MX_DATA_DIR` | `rocksdb.path` |
//! | `MX_SYNC_WRITES` | `rocksdb.sync_writes` |
//! | `MX_MAX_EVENT_SIZE` | `conformity.max_event_size` |
//! | `MX_STRICT_CONFORMITY` | `conformity.strict` |
//! | `MX_HORIZON_BATCH_SIZE` | `storage.horizon_batch_size` |
//! | `MX_READ_YOUR_WRITES` | `storage.read_your_writes` |
//! | `MX_BLACKLIST_REJECTED` | `blacklist_rejected` |
//! | `MX_LOG_LEVEL` | `logging.level` |
//! | `MX_LOG_JSON` | `logging.json` |

use std::str::FromStr;

use mx_03_event_indexing::StorageConfig;
use mx_04_event_conformity::ConformityConfig;
use shared_types::ids;

use crate::errors::ConfigError;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// This homeserver's name; the origin of locally issued events.
    pub server_name: String,
    /// Room version used to derive ids for events that arrive without one.
    pub room_version: String,
    /// Blacklist the ids of events rejected by the conformity policy.
    pub blacklist_rejected: bool,
    pub storage: StorageConfig,
    pub conformity: ConformityConfig,
    pub rocksdb: RocksDbConfig,
    pub logging: LoggingConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            server_name: "localhost".to_string(),
            room_version: "4".to_string(),
            blacklist_rejected: true,
            storage: StorageConfig::default(),
            conformity: ConformityConfig::default(),
            rocksdb: RocksDbConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = server_name.into();
        self
    }

    pub fn with_room_version(mut self, room_version: impl Into<String>) -> Self {
        self.room_version = room_version.into();
        self
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_conformity(mut self, conformity: ConformityConfig) -> Self {
        self.conformity = conformity;
        self
    }

    pub fn with_rocksdb(mut self, rocksdb: RocksDbConfig) -> Self {
        self.rocksdb = rocksdb;
        self
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Load from `MX_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any variable source over the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("MX_SERVER_NAME") {
            config.server_name = name;
        }
        if let Some(version) = lookup("MX_ROOM_VERSION") {
            config.room_version = version;
        }
        if let Some(path) = lookup("MX_DATA_DIR") {
            config.rocksdb.path = path;
        }
        if let Some(sync) = parse(&lookup, "MX_SYNC_WRITES")? {
            config.rocksdb.sync_writes = sync;
        }
        if let Some(size) = parse(&lookup, "MX_MAX_EVENT_SIZE")? {
            config.conformity.max_event_size = size;
        }
        if let Some(strict) = parse(&lookup, "MX_STRICT_CONFORMITY")? {
            config.conformity.strict = strict;
        }
        if let Some(size) = parse(&lookup, "MX_HORIZON_BATCH_SIZE")? {
            config.storage.horizon_batch_size = size;
        }
        if let Some(enabled) = parse(&lookup, "MX_READ_YOUR_WRITES")? {
            config.storage.read_your_writes = enabled;
        }
        if let Some(enabled) = parse(&lookup, "MX_BLACKLIST_REJECTED")? {
            config.blacklist_rejected = enabled;
        }
        if let Some(level) = lookup("MX_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(json) = parse(&lookup, "MX_LOG_JSON")? {
            config.logging.json = json;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !ids::valid_remote(&self.server_name) {
            return Err(ConfigError::InvalidServerName(self.server_name.clone()));
        }
        if self.storage.horizon_batch_size == 0 {
            return Err(ConfigError::Zero("horizon_batch_size"));
        }
        if self.conformity.max_event_size == 0 {
            return Err(ConfigError::Zero("max_event_size"));
        }
        if self.rocksdb.path.is_empty() {
            return Err(ConfigError::EmptyPath);
        }
        Ok(())
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    let normalized = match value.to_ascii_lowercase().as_str() {
        "1" | "yes" | "on" => "true".to_string(),
        "0" | "no" | "off" => "false".to_string(),
        other => other.to_string(),
    };
    normalized
        .parse()
        .or_else(|_| value.parse())
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

/// RocksDB configuration for production use.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Block cache size in bytes (default: 256MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 64MB)
    pub write_buffer_size: usize,
    /// Maximum number of write buffers (default: 3)
    pub max_write_buffer_number: i32,
    /// Enable fsync after each commit (default: true for durability)
    pub sync_writes: bool,
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/events".to_string(),
            block_cache_size: 256 * 1024 * 1024, // 256MB
            write_buffer_size: 64 * 1024 * 1024, // 64MB
            max_write_buffer_number: 3,
            sync_writes: true,
            create_if_missing: true,
        }
    }
}

impl RocksDbConfig {
    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,  // 8MB
            write_buffer_size: 4 * 1024 * 1024, // 4MB
            max_write_buffer_number: 2,
            sync_writes: false,
            create_if_missing: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            with_target: true,
            with_thread_ids: true,
        }
    }
}
