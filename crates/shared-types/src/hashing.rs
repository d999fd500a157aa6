//! # Event Hashing
//!
//! Canonical JSON, content hashes, reference hashes and event-id derivation.
//!
//! - The content hash covers the whole event minus its verification and
//!   transport material and is published as `hashes.sha256`.
//! - The reference hash covers the redacted event minus signatures and
//!   names the event in room versions 3 and later.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::errors::SerializationError;
use crate::event::Event;
use crate::event_types;
use crate::ids::IdVersion;

/// A SHA-256 digest.
pub type Digest256 = [u8; 32];

const CONTENT_HASH_EXCLUDED: [&str; 6] = [
    "signatures",
    "hashes",
    "unsigned",
    "age_ts",
    "outlier",
    "destinations",
];

const REFERENCE_HASH_EXCLUDED: [&str; 3] = ["signatures", "unsigned", "event_id"];

/// Compact serialization with lexicographically sorted object keys.
pub fn canonical_json(event: &Event) -> Result<Vec<u8>, SerializationError> {
    Ok(serde_json::to_vec(&event.to_value()?)?)
}

fn digest_without(event: &Event, excluded: &[&str]) -> Result<Digest256, SerializationError> {
    let mut value = event.to_value()?;
    if let Value::Object(map) = &mut value {
        for key in excluded {
            map.remove(*key);
        }
    }
    let bytes = serde_json::to_vec(&value)?;
    Ok(Sha256::digest(&bytes).into())
}

pub fn content_hash(event: &Event) -> Result<Digest256, SerializationError> {
    digest_without(event, &CONTENT_HASH_EXCLUDED)
}

/// The `hashes` object for an event: `{"sha256": <unpadded base64>}`.
pub fn make_hashes(event: &Event) -> Result<Map<String, Value>, SerializationError> {
    let mut hashes = Map::new();
    hashes.insert(
        "sha256".into(),
        Value::from(STANDARD_NO_PAD.encode(content_hash(event)?)),
    );
    Ok(hashes)
}

/// Whether `hashes.sha256` matches the recomputed content hash.
pub fn verify_hash(event: &Event) -> bool {
    let Some(claimed) = event
        .hashes
        .as_ref()
        .and_then(|h| h.get("sha256"))
        .and_then(Value::as_str)
    else {
        return false;
    };
    let Ok(claimed) = STANDARD_NO_PAD.decode(claimed.trim_end_matches('=')) else {
        return false;
    };
    content_hash(event).is_ok_and(|hash| hash.as_slice() == claimed.as_slice())
}

pub fn reference_hash(event: &Event) -> Result<Digest256, SerializationError> {
    digest_without(&essential(event), &REFERENCE_HASH_EXCLUDED)
}

/// Derive an event id in the format required by `room_version`.
pub fn make_id(event: &Event, room_version: &str) -> Result<String, SerializationError> {
    let hash = reference_hash(event)?;
    match IdVersion::for_room_version(room_version) {
        IdVersion::V1 => {
            let origin = event
                .origin
                .as_deref()
                .filter(|o| !o.is_empty())
                .ok_or(SerializationError::MissingField { field: "origin" })?;
            Ok(format!("${}:{}", URL_SAFE_NO_PAD.encode(hash), origin))
        }
        IdVersion::V3 => Ok(format!("${}", STANDARD_NO_PAD.encode(hash))),
        IdVersion::V4 => Ok(format!("${}", URL_SAFE_NO_PAD.encode(hash))),
    }
}

/// Whether the event's identity agrees with its content. Server-assigned
/// ids can only be compared against the `event_id` key.
pub fn check_id(event: &Event) -> bool {
    let Some(id) = event.id() else {
        return false;
    };
    match IdVersion::detect(id) {
        Some(IdVersion::V1) => event.event_id.as_deref().map_or(true, |field| field == id),
        Some(version) => {
            let Ok(hash) = reference_hash(event) else {
                return false;
            };
            let expect = match version {
                IdVersion::V3 => STANDARD_NO_PAD.encode(hash),
                _ => URL_SAFE_NO_PAD.encode(hash),
            };
            id[1..] == expect
        }
        None => false,
    }
}

/// The redaction algorithm: strip content to the keys each type needs for
/// authorization, drop unrecognized top-level keys.
pub fn essential(event: &Event) -> Event {
    let kept: &[&str] = match event.kind() {
        Some(event_types::ALIASES) => &["aliases"],
        Some(event_types::CREATE) => &["creator"],
        Some(event_types::HISTORY_VISIBILITY) => &["history_visibility"],
        Some(event_types::JOIN_RULES) => &["join_rule"],
        Some(event_types::MEMBER) => &["membership"],
        Some(event_types::POWER_LEVELS) => &[
            "ban",
            "events",
            "events_default",
            "kick",
            "redact",
            "state_default",
            "users",
            "users_default",
        ],
        _ => &[],
    };

    let mut out = event.clone();
    if let Some(content) = &mut out.content {
        content.retain(|key, _| kept.contains(&key.as_str()));
    }
    if event.is_redaction() {
        out.redacts = None;
    }
    out.unsigned = None;
    out.unrecognized.clear();
    out
}
