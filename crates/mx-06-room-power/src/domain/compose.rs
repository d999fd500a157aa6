//! Building and editing power_levels content.

use serde_json::{Map, Value};

use super::levels::{CREATOR_LEVEL, DEFAULT_EVENT_LEVEL, DEFAULT_POWER_LEVEL, DEFAULT_USER_LEVEL};

/// Content for the first power_levels event of a room created by `creator`.
pub fn default_content(creator: &str) -> Map<String, Value> {
    let mut events = Map::new();
    for kind in [
        "m.room.encryption",
        "m.room.history_visibility",
        "m.room.power_levels",
        "m.room.server_acl",
        "m.room.tombstone",
    ] {
        events.insert(kind.into(), CREATOR_LEVEL.into());
    }

    let mut notifications = Map::new();
    notifications.insert("room".into(), DEFAULT_POWER_LEVEL.into());

    let mut users = Map::new();
    users.insert(creator.into(), CREATOR_LEVEL.into());

    let mut content = Map::new();
    content.insert("ban".into(), DEFAULT_POWER_LEVEL.into());
    content.insert("events".into(), Value::Object(events));
    content.insert("events_default".into(), DEFAULT_EVENT_LEVEL.into());
    content.insert("invite".into(), DEFAULT_POWER_LEVEL.into());
    content.insert("kick".into(), DEFAULT_POWER_LEVEL.into());
    content.insert("notifications".into(), Value::Object(notifications));
    content.insert("redact".into(), DEFAULT_POWER_LEVEL.into());
    content.insert("state_default".into(), DEFAULT_POWER_LEVEL.into());
    content.insert("users".into(), Value::Object(users));
    content.insert("users_default".into(), DEFAULT_USER_LEVEL.into());
    content
}

/// [`default_content`] with `overrides` applied. Collections are merged
/// entry by entry; everything else is replaced.
pub fn compose_content(creator: &str, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut content = default_content(creator);
    for (key, value) in overrides {
        match (content.get_mut(key), value) {
            (Some(Value::Object(base)), Value::Object(extra)) => {
                for (k, v) in extra {
                    base.insert(k.clone(), v.clone());
                }
            }
            _ => {
                content.insert(key.clone(), value.clone());
            }
        }
    }
    content
}

/// Set `key` to `level`, at the top level when `prop` is empty or inside
/// collection `prop` otherwise. Returns whether the content changed.
pub fn grant(content: &mut Map<String, Value>, prop: &str, key: &str, level: i64) -> bool {
    let target = if prop.is_empty() {
        content
    } else {
        let slot = content
            .entry(prop.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot.as_object_mut() {
            Some(collection) => collection,
            None => return false,
        }
    };

    let level = Value::from(level);
    if target.get(key) == Some(&level) {
        return false;
    }
    target.insert(key.to_string(), level);
    true
}

/// Remove `key`, at the top level or from collection `prop`. Returns
/// whether anything was removed.
pub fn revoke(content: &mut Map<String, Value>, prop: &str, key: &str) -> bool {
    if prop.is_empty() {
        return content.remove(key).is_some();
    }
    content
        .get_mut(prop)
        .and_then(Value::as_object_mut)
        .is_some_and(|collection| collection.remove(key).is_some())
}
