//! # Event Conformity (mx-04)
//!
//! A pure structural checker for Matrix room events and the acceptance
//! policy layered on top of it.
//!
//! ## Pieces
//!
//! - [`conforms`] evaluates 30 independent rules and returns a [`Report`],
//!   one bit per violated rule. The same event always yields the same report.
//! - [`conform_report`] applies the caller's tolerance mask and the built-in
//!   exemptions (hash mismatches on redacted, internal or locally
//!   originated events) and decides between attaching the report and
//!   rejecting the event.
//! - [`ConformityService`] adds the pre-index checks (size, id format per
//!   room version, origin of locally issued events).
//!
//! ## Usage
//!
//! ```ignore
//! use mx_04_event_conformity::{conforms, Code, Report};
//!
//! let report = conforms(&event, Report::CLEAN);
//! if report.has(Code::MismatchHashes) {
//!     println!("{report}");
//! }
//! ```

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::code::{reflect, Code, NUM_CODES, REFLECTS};
pub use domain::config::ConformityConfig;
pub use domain::errors::ConformityViolation;
pub use domain::report::Report;
pub use domain::rules::conforms;
pub use ports::{NoRedactions, RedactionOracle};
pub use service::{conform_report, ConformContext, ConformOpts, ConformityService};
