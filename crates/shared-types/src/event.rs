//! # Event
//!
//! The typed Matrix event. Fixed top-level fields are strongly typed,
//! `content` stays an opaque JSON object and any other top-level keys are
//! carried through untouched so the canonical serialization round-trips.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::SerializationError;
use crate::event_types;

/// A reference to another event from `prev_events` or `auth_events`.
///
/// Older room versions encode references as `[event_id, {hashes}]` pairs,
/// newer ones as bare event ids. Both shapes are accepted and preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EventRefRepr", into = "EventRefRepr")]
pub struct EventRef {
    pub event_id: String,
    pub hashes: Option<Map<String, Value>>,
}

impl EventRef {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            hashes: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum EventRefRepr {
    Id(String),
    Pair(String, Map<String, Value>),
}

impl From<EventRefRepr> for EventRef {
    fn from(repr: EventRefRepr) -> Self {
        match repr {
            EventRefRepr::Id(event_id) => EventRef {
                event_id,
                hashes: None,
            },
            EventRefRepr::Pair(event_id, hashes) => EventRef {
                event_id,
                hashes: Some(hashes),
            },
        }
    }
}

impl From<EventRef> for EventRefRepr {
    fn from(r: EventRef) -> Self {
        match r.hashes {
            Some(hashes) => EventRefRepr::Pair(r.event_id, hashes),
            None => EventRefRepr::Id(r.event_id),
        }
    }
}

/// The fixed top-level fields, one storage column each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventField {
    AuthEvents,
    Content,
    Depth,
    EventId,
    Hashes,
    Origin,
    OriginServerTs,
    PrevEvents,
    Redacts,
    RoomId,
    Sender,
    Signatures,
    StateKey,
    Type,
}

impl EventField {
    pub const ALL: [EventField; 14] = [
        EventField::AuthEvents,
        EventField::Content,
        EventField::Depth,
        EventField::EventId,
        EventField::Hashes,
        EventField::Origin,
        EventField::OriginServerTs,
        EventField::PrevEvents,
        EventField::Redacts,
        EventField::RoomId,
        EventField::Sender,
        EventField::Signatures,
        EventField::StateKey,
        EventField::Type,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            EventField::AuthEvents => "auth_events",
            EventField::Content => "content",
            EventField::Depth => "depth",
            EventField::EventId => "event_id",
            EventField::Hashes => "hashes",
            EventField::Origin => "origin",
            EventField::OriginServerTs => "origin_server_ts",
            EventField::PrevEvents => "prev_events",
            EventField::Redacts => "redacts",
            EventField::RoomId => "room_id",
            EventField::Sender => "sender",
            EventField::Signatures => "signatures",
            EventField::StateKey => "state_key",
            EventField::Type => "type",
        }
    }
}

/// Whether a top-level key is absent, present but empty, or present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    Absent,
    Empty,
    Present,
}

impl FieldState {
    pub fn is_defined(self) -> bool {
        self != FieldState::Absent
    }

    /// Absent or empty.
    pub fn is_empty(self) -> bool {
        self != FieldState::Present
    }
}

/// A Matrix room event (PDU).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_events: Option<Vec<EventRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
    /// The `event_id` key as it appears in the JSON. Absent for room
    /// versions whose ids are derived from the reference hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashes: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_server_ts: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_events: Option<Vec<EventRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redacts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signatures: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsigned: Option<Value>,
    /// Top-level keys outside the fixed schema.
    #[serde(flatten)]
    pub unrecognized: Map<String, Value>,
    /// Identity known out of band (computed or supplied by the caller).
    #[serde(skip)]
    identity: Option<String>,
}

impl Event {
    pub fn from_json(json: &str) -> Result<Self, SerializationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SerializationError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn from_value(value: Value) -> Result<Self, SerializationError> {
        if !value.is_object() {
            return Err(SerializationError::Malformed(
                "event must be a JSON object".into(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<Value, SerializationError> {
        Ok(serde_json::to_value(self)?)
    }

    /// The event's identity: the out-of-band id if one was attached,
    /// otherwise the `event_id` key.
    pub fn id(&self) -> Option<&str> {
        self.identity.as_deref().or(self.event_id.as_deref())
    }

    pub fn set_id(&mut self, event_id: impl Into<String>) {
        self.identity = Some(event_id.into());
    }

    pub fn with_id(mut self, event_id: impl Into<String>) -> Self {
        self.set_id(event_id);
        self
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref().filter(|r| !r.is_empty())
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn state_key(&self) -> Option<&str> {
        self.state_key.as_deref()
    }

    pub fn is_state(&self) -> bool {
        self.state_key.is_some()
    }

    pub fn content(&self) -> Option<&Map<String, Value>> {
        self.content.as_ref()
    }

    pub fn content_get(&self, key: &str) -> Option<&Value> {
        self.content.as_ref().and_then(|c| c.get(key))
    }

    pub fn content_str(&self, key: &str) -> Option<&str> {
        self.content_get(key).and_then(Value::as_str)
    }

    /// The redaction target: the top-level `redacts`, or `content.redacts`
    /// for room versions that moved it.
    pub fn redacts(&self) -> Option<&str> {
        self.redacts
            .as_deref()
            .filter(|r| !r.is_empty())
            .or_else(|| self.content_str("redacts"))
    }

    pub fn is_redaction(&self) -> bool {
        self.is_kind(event_types::REDACTION)
    }

    pub fn prev_ids(&self) -> impl Iterator<Item = &str> {
        self.prev_events
            .iter()
            .flatten()
            .map(|r| r.event_id.as_str())
    }

    pub fn auth_ids(&self) -> impl Iterator<Item = &str> {
        self.auth_events
            .iter()
            .flatten()
            .map(|r| r.event_id.as_str())
    }

    pub fn prev_count(&self) -> usize {
        self.prev_events.as_ref().map_or(0, Vec::len)
    }

    pub fn auth_count(&self) -> usize {
        self.auth_events.as_ref().map_or(0, Vec::len)
    }

    /// Distinguish absent, empty and present top-level keys.
    pub fn field_state(&self, field: EventField) -> FieldState {
        fn text(s: &Option<String>) -> FieldState {
            match s {
                None => FieldState::Absent,
                Some(s) if s.is_empty() => FieldState::Empty,
                Some(_) => FieldState::Present,
            }
        }
        fn object(m: &Option<Map<String, Value>>) -> FieldState {
            match m {
                None => FieldState::Absent,
                Some(m) if m.is_empty() => FieldState::Empty,
                Some(_) => FieldState::Present,
            }
        }
        fn refs(r: &Option<Vec<EventRef>>) -> FieldState {
            match r {
                None => FieldState::Absent,
                Some(r) if r.is_empty() => FieldState::Empty,
                Some(_) => FieldState::Present,
            }
        }
        fn number(n: Option<i64>) -> FieldState {
            if n.is_some() {
                FieldState::Present
            } else {
                FieldState::Absent
            }
        }

        match field {
            EventField::AuthEvents => refs(&self.auth_events),
            EventField::Content => object(&self.content),
            EventField::Depth => number(self.depth),
            EventField::EventId => text(&self.event_id),
            EventField::Hashes => object(&self.hashes),
            EventField::Origin => text(&self.origin),
            EventField::OriginServerTs => number(self.origin_server_ts),
            EventField::PrevEvents => refs(&self.prev_events),
            EventField::Redacts => text(&self.redacts),
            EventField::RoomId => text(&self.room_id),
            EventField::Sender => text(&self.sender),
            EventField::Signatures => object(&self.signatures),
            EventField::StateKey => text(&self.state_key),
            EventField::Type => text(&self.kind),
        }
    }

    /// The JSON value of a fixed field. `EventId` yields the identity.
    pub fn get(&self, field: EventField) -> Result<Option<Value>, SerializationError> {
        let value = match field {
            EventField::AuthEvents => self.auth_events.as_ref().map(serde_json::to_value).transpose()?,
            EventField::Content => self.content.clone().map(Value::Object),
            EventField::Depth => self.depth.map(Value::from),
            EventField::EventId => self.id().map(Value::from),
            EventField::Hashes => self.hashes.clone().map(Value::Object),
            EventField::Origin => self.origin.clone().map(Value::from),
            EventField::OriginServerTs => self.origin_server_ts.map(Value::from),
            EventField::PrevEvents => self.prev_events.as_ref().map(serde_json::to_value).transpose()?,
            EventField::Redacts => self.redacts.clone().map(Value::from),
            EventField::RoomId => self.room_id.clone().map(Value::from),
            EventField::Sender => self.sender.clone().map(Value::from),
            EventField::Signatures => self.signatures.clone().map(Value::Object),
            EventField::StateKey => self.state_key.clone().map(Value::from),
            EventField::Type => self.kind.clone().map(Value::from),
        };
        Ok(value)
    }

    /// Assign a fixed field from its JSON value. `EventId` sets the identity.
    pub fn set(&mut self, field: EventField, value: Value) -> Result<(), SerializationError> {
        match field {
            EventField::AuthEvents => self.auth_events = Some(serde_json::from_value(value)?),
            EventField::Content => self.content = Some(serde_json::from_value(value)?),
            EventField::Depth => self.depth = Some(serde_json::from_value(value)?),
            EventField::EventId => self.identity = Some(serde_json::from_value(value)?),
            EventField::Hashes => self.hashes = Some(serde_json::from_value(value)?),
            EventField::Origin => self.origin = Some(serde_json::from_value(value)?),
            EventField::OriginServerTs => self.origin_server_ts = Some(serde_json::from_value(value)?),
            EventField::PrevEvents => self.prev_events = Some(serde_json::from_value(value)?),
            EventField::Redacts => self.redacts = Some(serde_json::from_value(value)?),
            EventField::RoomId => self.room_id = Some(serde_json::from_value(value)?),
            EventField::Sender => self.sender = Some(serde_json::from_value(value)?),
            EventField::Signatures => self.signatures = Some(serde_json::from_value(value)?),
            EventField::StateKey => self.state_key = Some(serde_json::from_value(value)?),
            EventField::Type => self.kind = Some(serde_json::from_value(value)?),
        }
        Ok(())
    }
}
