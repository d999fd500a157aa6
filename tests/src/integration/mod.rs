//! Cross-crate integration tests.

pub mod pipeline;
pub mod properties;
pub mod scenarios;
