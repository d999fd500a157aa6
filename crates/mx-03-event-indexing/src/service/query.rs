//! Point lookups against committed state.

use serde_json::Value;
use shared_types::{
    Event, EventField, EventIdx, EventIndexState, EventRef, IdVersion, SerializationError,
};

use crate::domain::appendix::{RefMask, RefType};
use crate::domain::columns::Column;
use crate::domain::errors::StorageError;
use crate::domain::keys::{
    decode_idx, encode_idx, event_refs_prefix, event_refs_type_prefix, parse_event_refs_key,
    parse_text_idx_key, text_idx_prefix, KeyRange, EVENT_IDX_MAX_KEY,
};
use crate::ports::outbound::KvEngine;

use super::StorageContext;

impl<K: KvEngine> StorageContext<K> {
    pub fn find_event_idx(&self, event_id: &str) -> Result<EventIndexState, StorageError> {
        match self.engine.get(Column::EventIdx, event_id.as_bytes())? {
            None => Ok(EventIndexState::Unindexed),
            Some(value) => decode_idx(&value)
                .map(EventIndexState::from_stored)
                .ok_or_else(|| StorageError::corrupt("_event_idx", "value is not an index")),
        }
    }

    /// Whether the id has any record, blacklisted included.
    pub fn exists(&self, event_id: &str) -> Result<bool, StorageError> {
        Ok(self.find_event_idx(event_id)?.is_known())
    }

    /// Whether the id is committed under an index.
    pub fn good(&self, event_id: &str) -> Result<bool, StorageError> {
        Ok(self.find_event_idx(event_id)?.is_indexed())
    }

    /// Reassemble an event from its JSON, or from its columns when the JSON
    /// index was not written.
    pub fn fetch(&self, idx: EventIdx) -> Result<Option<Event>, StorageError> {
        let key = encode_idx(idx);
        let mut event = match self.engine.get(Column::EventJson, &key)? {
            Some(json) => Event::from_slice(&json)?,
            None => match self.fetch_cols(idx)? {
                Some(event) => event,
                None => return Ok(None),
            },
        };

        if let Some(Value::String(event_id)) = self.get_col(idx, EventField::EventId)? {
            if event.id() != Some(event_id.as_str()) {
                event.set_id(event_id);
            }
        }
        Ok(Some(event))
    }

    pub fn fetch_by_id(&self, event_id: &str) -> Result<Option<Event>, StorageError> {
        let Some(idx) = self.find_event_idx(event_id)?.idx() else {
            return Ok(None);
        };
        Ok(self.fetch(idx)?.map(|event| event.with_id(event_id)))
    }

    fn fetch_cols(&self, idx: EventIdx) -> Result<Option<Event>, StorageError> {
        let mut event = Event::default();
        let mut found = false;
        for field in EventField::ALL {
            if let Some(value) = self.get_col(idx, field)? {
                if field == EventField::EventId {
                    if let Some(id) = value.as_str() {
                        if IdVersion::detect(id) == Some(IdVersion::V1) {
                            event.event_id = Some(id.to_string());
                        }
                    }
                }
                event.set(field, value)?;
                found = true;
            }
        }
        Ok(found.then_some(event))
    }

    /// One field of a committed event.
    pub fn get(&self, idx: EventIdx, field: EventField) -> Result<Option<Value>, StorageError> {
        if let Some(value) = self.get_col(idx, field)? {
            return Ok(Some(value));
        }
        match self.engine.get(Column::EventJson, &encode_idx(idx))? {
            Some(json) => Ok(Event::from_slice(&json)?.get(field)?),
            None => Ok(None),
        }
    }

    fn get_col(&self, idx: EventIdx, field: EventField) -> Result<Option<Value>, StorageError> {
        match self.engine.get(Column::Field(field), &encode_idx(idx))? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).map_err(SerializationError::from)?,
            )),
            None => Ok(None),
        }
    }

    /// Ids in `prev_events` of a committed event.
    pub fn prev_ids(&self, idx: EventIdx) -> Result<Vec<String>, StorageError> {
        let Some(value) = self.get(idx, EventField::PrevEvents)? else {
            return Ok(Vec::new());
        };
        let refs: Vec<EventRef> =
            serde_json::from_value(value).map_err(SerializationError::from)?;
        Ok(refs.into_iter().map(|r| r.event_id).collect())
    }

    /// Events referencing `idx` through any reference kind in `mask`.
    pub fn event_refs(
        &self,
        idx: EventIdx,
        mask: RefMask,
    ) -> Result<Vec<(RefType, EventIdx)>, StorageError> {
        let mut refs = Vec::new();
        for (key, _) in self.engine.prefix_scan(Column::EventRefs, &event_refs_prefix(idx))? {
            let (_, ref_type, referrer) = parse_event_refs_key(&key)
                .ok_or_else(|| StorageError::corrupt("_event_refs", "malformed key"))?;
            if mask.has(ref_type) {
                refs.push((ref_type, referrer));
            }
        }
        Ok(refs)
    }

    pub fn is_redacted(&self, event_id: &str) -> Result<bool, StorageError> {
        let Some(idx) = self.find_event_idx(event_id)?.idx() else {
            return Ok(false);
        };
        let prefix = event_refs_type_prefix(idx, RefType::Redaction);
        Ok(!self.engine.prefix_scan(Column::EventRefs, &prefix)?.is_empty())
    }

    pub fn events_by_sender(&self, sender: &str) -> Result<Vec<EventIdx>, StorageError> {
        self.text_idx_scan(Column::EventSender, "_event_sender", sender)
    }

    pub fn events_by_type(&self, kind: &str) -> Result<Vec<EventIdx>, StorageError> {
        self.text_idx_scan(Column::EventType, "_event_type", kind)
    }

    fn text_idx_scan(
        &self,
        column: Column,
        name: &'static str,
        text: &str,
    ) -> Result<Vec<EventIdx>, StorageError> {
        self.engine
            .prefix_scan(column, &text_idx_prefix(text))?
            .iter()
            .map(|(key, _)| {
                parse_text_idx_key(key)
                    .map(|(_, idx)| idx)
                    .ok_or_else(|| StorageError::corrupt(name, "malformed key"))
            })
            .collect()
    }

    /// The highest index written so far, 0 for an empty store. Deleted
    /// events still count.
    pub fn last_event_idx(&self) -> Result<EventIdx, StorageError> {
        let mut last = match self.engine.get(Column::EventIdxMax, EVENT_IDX_MAX_KEY)? {
            Some(value) => decode_idx(&value)
                .ok_or_else(|| StorageError::corrupt("_event_idx_max", "value is not an index"))?,
            None => 0,
        };
        for column in [Column::Field(EventField::EventId), Column::EventJson] {
            if let Some((key, _)) = self.engine.seek_last(column, &KeyRange::all())? {
                let idx = decode_idx(&key)
                    .ok_or_else(|| StorageError::corrupt(column.name(), "key is not an index"))?;
                last = last.max(idx);
            }
        }
        Ok(last)
    }
}
