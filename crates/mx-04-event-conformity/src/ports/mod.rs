//! # Outbound Ports
//!
//! What the acceptance policy needs from the host application.

/// Whether a redaction for an event id is already known.
///
/// Production: the indexing store (`node_runtime::StoreRedactionOracle`)
/// Testing: [`NoRedactions`] or any `Fn(&str) -> bool`
pub trait RedactionOracle {
    fn is_redacted(&self, event_id: &str) -> bool;
}

/// An oracle that knows of no redactions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRedactions;

impl RedactionOracle for NoRedactions {
    fn is_redacted(&self, _event_id: &str) -> bool {
        false
    }
}

impl<F> RedactionOracle for F
where
    F: Fn(&str) -> bool,
{
    fn is_redacted(&self, event_id: &str) -> bool {
        self(event_id)
    }
}
