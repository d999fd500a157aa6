//! Domain layer: rule codes, reports and the rules themselves.

pub mod code;
pub mod config;
pub mod errors;
pub mod report;
pub mod rules;
