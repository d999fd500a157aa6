//! # Event Store Test Suite
//!
//! Scenarios that span more than one crate.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Event builders for one room
//! └── integration/
//!     ├── scenarios.rs  # Power fallback, depth order, deferred redaction
//!     ├── properties.rs # Idempotence, convergence, purity, blacklist
//!     └── pipeline.rs   # Evaluator end to end
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mx-tests
//! cargo test -p mx-tests integration::properties::
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
