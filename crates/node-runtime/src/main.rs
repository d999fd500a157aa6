//! # Event Store Node
//!
//! Reads newline-delimited JSON events from stdin and runs each through
//! the evaluation pipeline.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from `MX_*` environment variables
//! 2. Validate it
//! 3. Initialize logging
//! 4. Open the store (RocksDB with `--features rocksdb`, otherwise in memory)
//! 5. Resume the event_idx sequencer from the highest stored index
//! 6. Evaluate events until stdin closes or Ctrl+C

use std::sync::Arc;

use anyhow::{Context, Result};
use mx_03_event_indexing::{KvEngine, StorageContext};
use node_runtime::{init_logging, EvalError, EvalOpts, EvalOutcome, Evaluator, NodeConfig};
use shared_types::Event;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[cfg(feature = "rocksdb")]
fn open_store(config: &NodeConfig) -> Result<StorageContext<node_runtime::adapters::RocksDbEngine>> {
    let engine = node_runtime::adapters::RocksDbEngine::open(&config.rocksdb)
        .with_context(|| format!("opening RocksDB at {}", config.rocksdb.path))?;
    Ok(StorageContext::new(engine, config.storage.clone()))
}

#[cfg(not(feature = "rocksdb"))]
fn open_store(config: &NodeConfig) -> Result<StorageContext<mx_03_event_indexing::InMemoryKvEngine>> {
    warn!("[node] Built without RocksDB; events are kept in memory only");
    Ok(StorageContext::new(
        mx_03_event_indexing::InMemoryKvEngine::new(),
        config.storage.clone(),
    ))
}

async fn run<K: KvEngine + 'static>(evaluator: Arc<Evaluator<K>>, opts: EvalOpts) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let (mut accepted, mut rejected) = (0usize, 0usize);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("reading stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("[node] Interrupted");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let event = match Event::from_json(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!("[node] Skipping malformed event: {}", e);
                rejected += 1;
                continue;
            }
        };

        match evaluator.evaluate_async(event, opts.clone()).await {
            Ok(EvalOutcome::Accepted { .. }) => accepted += 1,
            Ok(EvalOutcome::Duplicate(_)) => {}
            Err(EvalError::Rejected(_) | EvalError::Blacklisted { .. }) => rejected += 1,
            Err(e) => {
                error!("[node] Evaluation failed: {}", e);
                return Err(e.into());
            }
        }
    }

    info!(
        accepted,
        rejected,
        last_idx = evaluator.sequencer().current(),
        "[node] Shutting down"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env().context("loading configuration")?;
    config.validate().context("validating configuration")?;
    init_logging(&config.logging)?;

    info!(
        server_name = %config.server_name,
        room_version = %config.room_version,
        "[node] Starting event store node"
    );

    let store = Arc::new(open_store(&config)?);
    let evaluator = Arc::new(Evaluator::from_config(store, &config)?);
    info!(
        "[node] Resuming after event_idx {}",
        evaluator.sequencer().current()
    );

    run(evaluator, EvalOpts::from_config(&config)).await
}
