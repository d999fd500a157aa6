//! # Node Runtime Library
//!
//! Wires the event store crates into a running node. The binary in
//! `main.rs` is a thin shell over these modules.
//!
//! ## Modules
//!
//! - `config` - [`NodeConfig`] aggregated from every subsystem, `MX_*` env vars
//! - `telemetry` - `tracing` subscriber bootstrap
//! - `sequencer` - the strictly increasing event_idx allocator
//! - `evaluator` - conformity, id assignment, indexing and commit
//! - `oracle` - the store answering "is this event redacted?"
//! - `adapters` - RocksDB key-value engine (feature `rocksdb`)

pub mod adapters;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod oracle;
pub mod sequencer;
pub mod telemetry;

pub use config::{LoggingConfig, NodeConfig, RocksDbConfig};
pub use errors::{ConfigError, EvalError, NodeError};
pub use evaluator::{EvalOpts, EvalOutcome, Evaluator};
pub use oracle::StoreRedactionOracle;
pub use sequencer::Sequencer;
pub use telemetry::init_logging;
