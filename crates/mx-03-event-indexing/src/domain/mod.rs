//! Domain layer: columns, composite keys, appendix bitsets, write options
//! and the staged transaction.

pub mod appendix;
pub mod columns;
pub mod config;
pub mod errors;
pub mod keys;
pub mod txn;
pub mod write_opts;
