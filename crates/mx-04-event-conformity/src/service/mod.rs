//! # Conformity Service
//!
//! The acceptance policy around [`conforms`] and the checks that run before
//! an event is assigned an index.

use shared_types::ids::IdVersion;
use shared_types::{canonical_json, Event};
use tracing::{debug, warn};

use crate::domain::code::Code;
use crate::domain::config::ConformityConfig;
use crate::domain::errors::ConformityViolation;
use crate::domain::report::Report;
use crate::domain::rules::conforms;
use crate::ports::RedactionOracle;

/// Per-evaluation options for the acceptance policy.
#[derive(Debug, Clone, Default)]
pub struct ConformOpts {
    /// Reject a non-clean report instead of attaching it.
    pub conforming: bool,
    /// A report already computed earlier in this evaluation.
    pub conformed: Option<Report>,
    /// Rules the caller tolerates.
    pub non_conform: Report,
    /// The server the event was obtained from.
    pub node_id: Option<String>,
    /// Whether the fetch demanded unredacted content.
    pub require_content: bool,
}

impl ConformOpts {
    pub fn strict() -> Self {
        Self {
            conforming: true,
            ..Self::default()
        }
    }

    pub fn with_non_conform(mut self, non_conform: Report) -> Self {
        self.non_conform = non_conform;
        self
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }
}

/// Facts about the room and this server.
#[derive(Debug, Clone, Copy)]
pub struct ConformContext<'a> {
    /// This homeserver's name.
    pub server_name: &'a str,
    /// Local-only room that never federates.
    pub room_internal: bool,
}

/// Apply the caller's tolerances and the built-in exemptions to the
/// conformity report of `event`.
///
/// The event id is never checked here; ids are assigned later in the
/// pipeline. Returns the report to attach, or rejects when the caller asked
/// for strict conformance and violations remain.
pub fn conform_report<R>(
    event: &Event,
    opts: &ConformOpts,
    ctx: &ConformContext<'_>,
    oracle: &R,
) -> Result<Report, ConformityViolation>
where
    R: RedactionOracle + ?Sized,
{
    let mut skip = opts.non_conform | Code::InvalidOrMissingEventId;
    if ctx.room_internal {
        skip.set(Code::MismatchOriginSender);
    }

    let report = opts
        .conformed
        .unwrap_or_else(|| conforms(event, Report::CLEAN))
        .without(skip);

    if !opts.conforming {
        return Ok(report);
    }

    let mut remaining = report;
    if remaining.has(Code::MismatchHashes) {
        if let Some(reason) = hash_mismatch_exemption(event, opts, ctx, oracle) {
            debug!(
                "[mx-04] {} hash mismatch allowed: {}",
                event.id().unwrap_or("<unassigned>"),
                reason
            );
            remaining.del(Code::MismatchHashes);
        }
    }

    if remaining.clean() {
        return Ok(report);
    }

    let event_id = event.id().unwrap_or("<unassigned>").to_string();
    warn!("[mx-04] Non-conforming event {}: {}", event_id, remaining);
    Err(ConformityViolation::NonConforming {
        event_id,
        report: remaining,
    })
}

fn hash_mismatch_exemption<R>(
    event: &Event,
    opts: &ConformOpts,
    ctx: &ConformContext<'_>,
    oracle: &R,
) -> Option<&'static str>
where
    R: RedactionOracle + ?Sized,
{
    let origin = event.origin.as_deref();
    if ctx.room_internal {
        return Some("internal room");
    }
    if origin == Some(ctx.server_name) {
        return Some("originated here");
    }
    if !opts.require_content && origin.is_some() && opts.node_id.as_deref() == origin {
        return Some("served by origin");
    }
    if event.id().is_some_and(|id| oracle.is_redacted(id)) {
        return Some("event is redacted");
    }
    None
}

/// Runs the pre-index checks and the acceptance policy with one config.
#[derive(Debug, Clone)]
pub struct ConformityService {
    config: ConformityConfig,
    server_name: String,
}

impl ConformityService {
    pub fn new(config: ConformityConfig, server_name: impl Into<String>) -> Self {
        Self {
            config,
            server_name: server_name.into(),
        }
    }

    pub fn config(&self) -> &ConformityConfig {
        &self.config
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Canonical size must not exceed the configured maximum.
    pub fn check_size(&self, event: &Event) -> Result<usize, ConformityViolation> {
        let size = canonical_json(event)?.len();
        if size > self.config.max_event_size {
            return Err(ConformityViolation::TooLarge {
                size,
                max: self.config.max_event_size,
            });
        }
        Ok(size)
    }

    /// Hash-derived ids must use the format of the room version. Rooms with
    /// server-assigned ids are not checked.
    pub fn check_event_id(
        &self,
        event: &Event,
        room_version: &str,
    ) -> Result<(), ConformityViolation> {
        let Some(event_id) = event.id() else {
            return Ok(());
        };
        let required = IdVersion::for_room_version(room_version);
        if required == IdVersion::V1 || required.matches(event_id) {
            return Ok(());
        }
        Err(ConformityViolation::EventIdFormat {
            event_id: event_id.to_string(),
            room_version: room_version.to_string(),
        })
    }

    /// Events issued by this server must name it as their origin.
    pub fn check_origin(&self, event: &Event, issuing: bool) -> Result<(), ConformityViolation> {
        let origin = event.origin.as_deref().unwrap_or_default();
        if !issuing || origin == self.server_name {
            return Ok(());
        }
        Err(ConformityViolation::ForeignOrigin {
            origin: origin.to_string(),
            server_name: self.server_name.clone(),
        })
    }

    /// Size and origin checks followed by [`conform_report`].
    pub fn check<R>(
        &self,
        event: &Event,
        opts: &ConformOpts,
        room_internal: bool,
        issuing: bool,
        oracle: &R,
    ) -> Result<Report, ConformityViolation>
    where
        R: RedactionOracle + ?Sized,
    {
        self.check_size(event)?;
        self.check_origin(event, issuing)?;
        let ctx = ConformContext {
            server_name: &self.server_name,
            room_internal,
        };
        conform_report(event, opts, &ctx, oracle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NoRedactions;
    use serde_json::json;
    use shared_types::make_hashes;

    const HERE: ConformContext<'static> = ConformContext {
        server_name: "here",
        room_internal: false,
    };

    /// Conforming except that its content no longer matches its hashes.
    fn tampered() -> Event {
        let mut event = Event::from_value(json!({
            "event_id": "$m:remote",
            "type": "m.room.message",
            "room_id": "!r:remote",
            "sender": "@bob:remote",
            "origin": "remote",
            "depth": 5,
            "content": {"body": "hello"},
            "prev_events": ["$p:remote"],
            "auth_events": ["$c:remote"],
            "signatures": {"remote": {"ed25519:a": "sig"}},
        }))
        .unwrap();
        event.hashes = Some(make_hashes(&event).unwrap());
        event.content = Some(Default::default());
        event
    }

    #[test]
    fn test_lenient_attaches_report() {
        let report = conform_report(&tampered(), &ConformOpts::default(), &HERE, &NoRedactions).unwrap();
        assert!(report.has(Code::MismatchHashes));
    }

    #[test]
    fn test_strict_rejects_with_names() {
        let err = conform_report(&tampered(), &ConformOpts::strict(), &HERE, &NoRedactions).unwrap_err();
        assert_eq!(err.reflect(), vec!["MISMATCH_HASHES"]);
        assert!(err.to_string().contains("MISMATCH_HASHES"));
    }

    #[test]
    fn test_redacted_event_tolerates_hash_mismatch() {
        let oracle = |id: &str| id == "$m:remote";
        let report = conform_report(&tampered(), &ConformOpts::strict(), &HERE, &oracle).unwrap();
        assert!(report.has(Code::MismatchHashes));
    }

    #[test]
    fn test_origin_server_tolerates_hash_mismatch() {
        let opts = ConformOpts::strict().with_node_id("remote");
        assert!(conform_report(&tampered(), &opts, &HERE, &NoRedactions).is_ok());

        let opts = ConformOpts {
            require_content: true,
            ..opts
        };
        assert!(conform_report(&tampered(), &opts, &HERE, &NoRedactions).is_err());
    }

    #[test]
    fn test_internal_room_tolerates_hash_and_sender_mismatch() {
        let mut event = tampered();
        event.sender = Some("@bob:elsewhere".into());
        let internal = ConformContext {
            server_name: "here",
            room_internal: true,
        };
        let report = conform_report(&event, &ConformOpts::strict(), &internal, &NoRedactions).unwrap();
        assert!(!report.has(Code::MismatchOriginSender));
    }

    #[test]
    fn test_event_id_is_never_checked() {
        let mut event = tampered();
        event.event_id = None;
        let opts = ConformOpts::strict().with_non_conform(Report::from(Code::MismatchHashes));
        assert!(conform_report(&event, &opts, &HERE, &NoRedactions).is_ok());
    }

    #[test]
    fn test_conformed_report_is_reused() {
        let opts = ConformOpts {
            conformed: Some(Report::from(Code::DepthZero)),
            ..ConformOpts::strict()
        };
        let err = conform_report(&tampered(), &opts, &HERE, &NoRedactions).unwrap_err();
        assert_eq!(err.report(), Some(Report::from(Code::DepthZero)));
    }

    #[test]
    fn test_pre_index_checks() {
        let service = ConformityService::new(ConformityConfig::default().with_max_event_size(64), "here");
        assert!(matches!(
            service.check_size(&tampered()),
            Err(ConformityViolation::TooLarge { max: 64, .. })
        ));
        assert!(matches!(
            service.check_origin(&tampered(), true),
            Err(ConformityViolation::ForeignOrigin { .. })
        ));
        assert!(service.check_origin(&tampered(), false).is_ok());

        assert!(service.check_event_id(&tampered(), "1").is_ok());
        assert!(matches!(
            service.check_event_id(&tampered(), "5"),
            Err(ConformityViolation::EventIdFormat { .. })
        ));
    }
}
