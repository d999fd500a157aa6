//! The structural rules.
//!
//! Every rule is evaluated on every call. The only ordering dependency is
//! that id and hash recomputation are skipped when the id itself is
//! malformed or the hashes are missing, since there is nothing meaningful
//! to compare against.

use std::borrow::Cow;
use std::collections::BTreeSet;

use serde_json::Value;
use shared_types::event_types::{ALIASES, CREATE, MEMBER, REDACTION};
use shared_types::ids::{self, IdKind};
use shared_types::{
    hashing, Event, EventField, ORIGIN_MAX_SIZE, STATE_KEY_MAX_SIZE, TYPE_MAX_SIZE,
};

use super::code::Code;
use super::report::Report;

/// Evaluate every rule against `event`, then clear the rules in `skip`.
pub fn conforms(event: &Event, skip: Report) -> Report {
    evaluate(event).without(skip)
}

fn evaluate(e: &Event) -> Report {
    let mut report = Report::CLEAN;
    let kind = e.kind().unwrap_or_default();
    let is_create = kind == CREATE;
    let origin = e.origin.as_deref().unwrap_or_default();
    let sender_host = e.sender().and_then(ids::host);

    if !e.id().is_some_and(|id| ids::valid(IdKind::Event, id)) {
        report.set(Code::InvalidOrMissingEventId);
    }
    if e.event_id.as_deref().is_some_and(|id| !ids::valid(IdKind::Event, id)) {
        report.set(Code::InvalidOrMissingEventId);
    }
    if !report.has(Code::InvalidOrMissingEventId) && !hashing::check_id(e) {
        report.set(Code::MismatchEventId);
    }

    if e.field_state(EventField::Hashes).is_empty() {
        report.set(Code::MissingHashes);
    } else if !report.has(Code::InvalidOrMissingEventId) && !hashing::verify_hash(e) {
        report.set(Code::MismatchHashes);
    }

    if !e.room_id.as_deref().is_some_and(|id| ids::valid(IdKind::Room, id)) {
        report.set(Code::InvalidOrMissingRoomId);
    }
    if !e.sender().is_some_and(|id| ids::valid(IdKind::User, id)) {
        report.set(Code::InvalidOrMissingSenderId);
    }

    if e.field_state(EventField::Type).is_empty() {
        report.set(Code::MissingType);
    }
    if kind.len() > TYPE_MAX_SIZE {
        report.set(Code::InvalidType);
    }

    if e.field_state(EventField::Origin).is_empty() {
        report.set(Code::MissingOrigin);
    }
    if origin.len() > ORIGIN_MAX_SIZE || !ids::valid_remote(origin) {
        report.set(Code::InvalidOrigin);
    }

    if e.state_key().is_some_and(|key| key.len() > STATE_KEY_MAX_SIZE) {
        report.set(Code::InvalidStateKey);
    }

    if kind == REDACTION && !e.redacts().is_some_and(|id| ids::valid(IdKind::Event, id)) {
        report.set(Code::InvalidOrMissingRedactsId);
    }

    if kind == MEMBER {
        let membership = membership(e);
        if membership.is_empty() {
            report.set(Code::MissingContentMembership);
        }
        if !membership.chars().all(|c| c.is_ascii_lowercase()) {
            report.set(Code::InvalidContentMembership);
        }
        if e.field_state(EventField::StateKey).is_empty() {
            report.set(Code::MissingMemberStateKey);
        }
        if !e.state_key().is_some_and(|key| ids::valid(IdKind::User, key)) {
            report.set(Code::InvalidMemberStateKey);
        }
    }

    if !is_create && e.field_state(EventField::PrevEvents).is_empty() {
        report.set(Code::MissingPrevEvents);
    }
    if !is_create && e.field_state(EventField::AuthEvents).is_empty() {
        report.set(Code::MissingAuthEvents);
    }
    if e.depth.is_some_and(|depth| depth < 0) {
        report.set(Code::DepthNegative);
    }
    if !is_create && e.depth == Some(0) {
        report.set(Code::DepthZero);
    }

    if e.field_state(EventField::Signatures).is_empty() {
        report.set(Code::MissingSignatures);
    }
    let origin_signed = e
        .signatures
        .as_ref()
        .and_then(|sigs| sigs.get(origin))
        .and_then(Value::as_object)
        .is_some_and(|keys| !keys.is_empty());
    if !origin_signed {
        report.set(Code::MissingOriginSignature);
    }

    if !report.has(Code::InvalidOrMissingSenderId) && sender_host != Some(origin) {
        report.set(Code::MismatchOriginSender);
    }
    if is_create && e.room_id.as_deref().and_then(ids::host) != sender_host {
        report.set(Code::MismatchCreateSender);
    }
    if kind == ALIASES && sender_host != e.state_key() {
        report.set(Code::MismatchAliasesStateKey);
    }

    if let Some(id) = e.id() {
        if e.redacts() == Some(id) {
            report.set(Code::SelfRedacts);
        }
        if e.prev_ids().any(|prev| prev == id) {
            report.set(Code::SelfPrevEvent);
        }
        if e.auth_ids().any(|auth| auth == id) {
            report.set(Code::SelfAuthEvent);
        }
    }
    if has_duplicates(e.prev_ids()) {
        report.set(Code::DupPrevEvent);
    }
    if has_duplicates(e.auth_ids()) {
        report.set(Code::DupAuthEvent);
    }

    report
}

/// `content.membership` as text; non-string values use their JSON form.
fn membership(e: &Event) -> Cow<'_, str> {
    match e.content_get("membership") {
        None | Some(Value::Null) => Cow::Borrowed(""),
        Some(Value::String(s)) => Cow::Borrowed(s),
        Some(other) => Cow::Owned(other.to_string()),
    }
}

fn has_duplicates<'a>(ids: impl Iterator<Item = &'a str>) -> bool {
    let mut seen = BTreeSet::new();
    ids.into_iter().any(|id| !seen.insert(id))
}
