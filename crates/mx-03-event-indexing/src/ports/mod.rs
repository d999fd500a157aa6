//! # Ports
//!
//! - `outbound` - the key-value engine this crate drives

pub mod outbound;
