//! # Adapters
//!
//! - `memory` - in-memory [`KvEngine`](crate::ports::outbound::KvEngine)
//!   for tests and ephemeral stores

pub mod memory;
