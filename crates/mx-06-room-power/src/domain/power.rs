//! The power-level view of one room.

use serde_json::{Map, Value};
use tracing::debug;

use super::levels::{
    as_level, CREATOR_LEVEL, DEFAULT_EVENT_LEVEL, DEFAULT_POWER_LEVEL, DEFAULT_USER_LEVEL,
};
use crate::ports::PowerLevelsSource;

/// Snapshot of a room's power levels. Cheap to rebuild; holds no handle to
/// the store it was loaded from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomPower {
    content: Option<Map<String, Value>>,
    creator: Option<String>,
}

impl RoomPower {
    /// `content` is the power_levels content if that event exists; an event
    /// with empty content is still `Some`.
    pub fn new(content: Option<Map<String, Value>>, creator: Option<String>) -> Self {
        Self { content, creator }
    }

    pub fn from_content(content: Map<String, Value>) -> Self {
        Self::new(Some(content), None)
    }

    /// A room with no power_levels event and a known creator.
    pub fn with_creator(creator: impl Into<String>) -> Self {
        Self::new(None, Some(creator.into()))
    }

    /// Read the current power_levels content, and the creator when no
    /// power_levels event exists.
    pub fn load<S>(source: &S, room_id: &str) -> Result<Self, S::Error>
    where
        S: PowerLevelsSource + ?Sized,
    {
        let content = source.power_levels(room_id)?;
        let creator = match &content {
            Some(_) => None,
            None => source.creator(room_id)?,
        };
        debug!(
            "[mx-06] Power view for {}: power_levels={} creator={:?}",
            room_id,
            content.is_some(),
            creator
        );
        Ok(Self::new(content, creator))
    }

    pub fn content(&self) -> Option<&Map<String, Value>> {
        self.content.as_ref()
    }

    pub fn creator(&self) -> Option<&str> {
        self.creator.as_deref()
    }

    /// A power_levels event exists, whatever its content.
    pub fn has_power_levels(&self) -> bool {
        self.content.is_some()
    }

    pub fn is_creator(&self, user_id: &str) -> bool {
        self.creator.as_deref() == Some(user_id)
    }

    fn top(&self, prop: &str) -> Option<&Value> {
        self.content.as_ref().and_then(|c| c.get(prop))
    }

    fn collection(&self, prop: &str) -> Option<&Map<String, Value>> {
        self.top(prop).and_then(Value::as_object)
    }

    fn top_level(&self, prop: &str) -> Option<i64> {
        self.top(prop).and_then(as_level)
    }

    fn collection_level(&self, prop: &str, key: &str) -> Option<i64> {
        self.collection(prop)
            .and_then(|c| c.get(key))
            .and_then(as_level)
    }

    pub fn level_user(&self, user_id: &str) -> i64 {
        if !self.has_power_levels() {
            return if self.is_creator(user_id) {
                CREATOR_LEVEL
            } else {
                DEFAULT_USER_LEVEL
            };
        }
        self.collection_level("users", user_id)
            .or_else(|| self.top_level("users_default"))
            .unwrap_or(DEFAULT_USER_LEVEL)
    }

    /// Level required to send an event of `kind`; a `state_key` (even an
    /// empty one) makes it a state event lookup.
    pub fn level_event(&self, kind: &str, state_key: Option<&str>) -> i64 {
        let specific = self.collection_level("events", kind);
        match state_key {
            None => specific
                .or_else(|| self.top_level("events_default"))
                .unwrap_or(DEFAULT_EVENT_LEVEL),
            Some(_) => specific
                .or_else(|| self.top_level("state_default"))
                .unwrap_or(DEFAULT_POWER_LEVEL),
        }
    }

    /// Level required for a named action such as `ban` or `redact`.
    pub fn level(&self, prop: &str) -> i64 {
        self.top_level(prop).unwrap_or(DEFAULT_POWER_LEVEL)
    }

    /// Whether `user_id` meets the level for `prop`. An empty `prop` or
    /// `"events"` asks about sending an event of `kind`.
    pub fn allows(&self, user_id: &str, prop: &str, kind: &str, state_key: Option<&str>) -> bool {
        let required = if prop.is_empty() || prop == "events" {
            self.level_event(kind, state_key)
        } else {
            self.level(prop)
        };
        self.level_user(user_id) >= required
    }

    pub fn has_user(&self, user_id: &str) -> bool {
        self.collection_level("users", user_id).is_some()
    }

    pub fn has_event(&self, kind: &str) -> bool {
        self.collection_level("events", kind).is_some()
    }

    pub fn has_level(&self, prop: &str) -> bool {
        self.top_level(prop).is_some()
    }

    pub fn has_collection(&self, prop: &str) -> bool {
        self.collection(prop).is_some()
    }

    /// Top-level keys holding a level.
    pub fn count_levels(&self) -> usize {
        self.content
            .iter()
            .flatten()
            .filter(|(_, v)| as_level(v).is_some())
            .count()
    }

    /// Top-level keys holding an object.
    pub fn count_collections(&self) -> usize {
        self.content
            .iter()
            .flatten()
            .filter(|(_, v)| v.is_object())
            .count()
    }

    /// Entries of collection `prop` holding a level.
    pub fn count(&self, prop: &str) -> usize {
        self.collection(prop)
            .map_or(0, |c| c.values().filter(|v| as_level(v).is_some()).count())
    }

    /// Visit `(key, level)` pairs: the top-level levels when `prop` is
    /// empty, otherwise the entries of collection `prop`. Stops early when
    /// the closure returns `false`; returns whether it ran to the end.
    pub fn for_each<F>(&self, prop: &str, mut f: F) -> bool
    where
        F: FnMut(&str, i64) -> bool,
    {
        let map = if prop.is_empty() {
            self.content.as_ref()
        } else {
            self.collection(prop)
        };
        map.into_iter()
            .flatten()
            .filter_map(|(k, v)| as_level(v).map(|level| (k, level)))
            .all(|(k, level)| f(k.as_str(), level))
    }

    pub fn for_each_collection<F>(&self, mut f: F) -> bool
    where
        F: FnMut(&str, &Map<String, Value>) -> bool,
    {
        self.content
            .iter()
            .flatten()
            .filter_map(|(k, v)| v.as_object().map(|c| (k, c)))
            .all(|(k, c)| f(k.as_str(), c))
    }
}
