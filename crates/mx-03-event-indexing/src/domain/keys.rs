//! Composite key layouts.
//!
//! Integers are big-endian so byte order matches numeric order. Depth is
//! stored with its sign bit flipped so negative depths sort before positive
//! ones. String components are separated by a NUL byte, so a prefix for one
//! room or sender never matches another whose name merely starts the same
//! way. That holds only while components are NUL-free; `write()` refuses
//! events whose ids, type or state_key contain one.

use std::ops::{Bound, RangeBounds};

use shared_types::EventIdx;

use super::appendix::RefType;

pub const SEP: u8 = 0;

const INT: usize = 8;

/// A half-open byte range `[start, end)`; `end == None` is unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub start: Vec<u8>,
    pub end: Option<Vec<u8>>,
}

impl KeyRange {
    pub fn new(start: Vec<u8>, end: Option<Vec<u8>>) -> Self {
        Self { start, end }
    }

    pub fn all() -> Self {
        Self::new(Vec::new(), None)
    }

    /// Every key beginning with `prefix`.
    pub fn prefix(prefix: impl Into<Vec<u8>>) -> Self {
        let start = prefix.into();
        let end = prefix_end(&start);
        Self { start, end }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && self.end.as_deref().map_or(true, |end| key < end)
    }

    pub fn is_empty(&self) -> bool {
        self.end.as_deref().is_some_and(|end| end <= self.start.as_slice())
    }
}

/// The smallest key greater than every key starting with `prefix`.
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

pub fn encode_idx(idx: EventIdx) -> [u8; INT] {
    idx.to_be_bytes()
}

pub fn decode_idx(bytes: &[u8]) -> Option<EventIdx> {
    let bytes: [u8; INT] = bytes.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

pub fn encode_depth(depth: i64) -> [u8; INT] {
    ((depth as u64) ^ (1 << 63)).to_be_bytes()
}

pub fn decode_depth(bytes: &[u8]) -> Option<i64> {
    let bytes: [u8; INT] = bytes.try_into().ok()?;
    Some((u64::from_be_bytes(bytes) ^ (1 << 63)) as i64)
}

fn joined(parts: &[&[u8]]) -> Vec<u8> {
    let len = parts.iter().map(|p| p.len() + 1).sum();
    let mut key = Vec::with_capacity(len);
    for part in parts {
        key.extend_from_slice(part);
        key.push(SEP);
    }
    key
}

fn with_depth_idx(mut key: Vec<u8>, depth: i64, idx: EventIdx) -> Vec<u8> {
    key.extend_from_slice(&encode_depth(depth));
    key.extend_from_slice(&encode_idx(idx));
    key
}

/// Split `key` into its string head and trailing `n` integers' bytes.
fn split_tail(key: &[u8], n: usize) -> Option<(&[u8], &[u8])> {
    let tail = n * INT;
    if key.len() < tail {
        return None;
    }
    Some(key.split_at(key.len() - tail))
}

fn text(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes).ok()
}

fn split_sep(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = bytes.iter().position(|b| *b == SEP)?;
    Some((&bytes[..pos], &bytes[pos + 1..]))
}

fn depth_idx(tail: &[u8]) -> Option<(i64, EventIdx)> {
    let (depth, idx) = tail.split_at(INT);
    Some((decode_depth(depth)?, decode_idx(idx)?))
}

// _event_idx_max: a single entry

pub const EVENT_IDX_MAX_KEY: &[u8] = b"last";

// _event_horizon: unresolved_id \0 referrer_idx

pub fn event_horizon_prefix(event_id: &str) -> Vec<u8> {
    joined(&[event_id.as_bytes()])
}

pub fn event_horizon_key(event_id: &str, referrer: EventIdx) -> Vec<u8> {
    let mut key = event_horizon_prefix(event_id);
    key.extend_from_slice(&encode_idx(referrer));
    key
}

pub fn parse_event_horizon_key(key: &[u8]) -> Option<(&str, EventIdx)> {
    let (head, tail) = split_tail(key, 1)?;
    let id = head.strip_suffix(&[SEP])?;
    Some((text(id)?, decode_idx(tail)?))
}

// _event_refs: target_idx ref_type referrer_idx

pub fn event_refs_prefix(target: EventIdx) -> Vec<u8> {
    encode_idx(target).to_vec()
}

pub fn event_refs_type_prefix(target: EventIdx, ref_type: RefType) -> Vec<u8> {
    let mut key = event_refs_prefix(target);
    key.push(ref_type as u8);
    key
}

pub fn event_refs_key(target: EventIdx, ref_type: RefType, referrer: EventIdx) -> Vec<u8> {
    let mut key = event_refs_type_prefix(target, ref_type);
    key.extend_from_slice(&encode_idx(referrer));
    key
}

/// `(target, type, referrer)`
pub fn parse_event_refs_key(key: &[u8]) -> Option<(EventIdx, RefType, EventIdx)> {
    if key.len() != 2 * INT + 1 {
        return None;
    }
    let target = decode_idx(&key[..INT])?;
    let ref_type = RefType::from_u8(key[INT])?;
    let referrer = decode_idx(&key[INT + 1..])?;
    Some((target, ref_type, referrer))
}

// _event_sender: sender \0 idx, _event_type: type \0 idx

pub fn text_idx_prefix(text: &str) -> Vec<u8> {
    joined(&[text.as_bytes()])
}

pub fn text_idx_key(text: &str, idx: EventIdx) -> Vec<u8> {
    let mut key = text_idx_prefix(text);
    key.extend_from_slice(&encode_idx(idx));
    key
}

pub fn parse_text_idx_key(key: &[u8]) -> Option<(&str, EventIdx)> {
    parse_event_horizon_key(key)
}

// _event_state: state_key \0 type \0 room_id \0 depth idx

pub fn event_state_prefix(state_key: &str, kind: Option<&str>) -> Vec<u8> {
    match kind {
        Some(kind) => joined(&[state_key.as_bytes(), kind.as_bytes()]),
        None => joined(&[state_key.as_bytes()]),
    }
}

pub fn event_state_key(
    state_key: &str,
    kind: &str,
    room_id: &str,
    depth: i64,
    idx: EventIdx,
) -> Vec<u8> {
    let key = joined(&[state_key.as_bytes(), kind.as_bytes(), room_id.as_bytes()]);
    with_depth_idx(key, depth, idx)
}

// _room_head: room_id \0 event_id

pub fn room_prefix(room_id: &str) -> Vec<u8> {
    joined(&[room_id.as_bytes()])
}

pub fn room_head_key(room_id: &str, event_id: &str) -> Vec<u8> {
    let mut key = room_prefix(room_id);
    key.extend_from_slice(event_id.as_bytes());
    key
}

pub fn parse_room_head_key<'k>(room_id: &str, key: &'k [u8]) -> Option<&'k str> {
    text(key.strip_prefix(room_prefix(room_id).as_slice())?)
}

// _room_events: room_id \0 depth idx

pub fn room_events_key(room_id: &str, depth: i64, idx: EventIdx) -> Vec<u8> {
    with_depth_idx(room_prefix(room_id), depth, idx)
}

/// Keys of `room_id` whose depth lies within `depths`.
pub fn room_events_range(room_id: &str, depths: impl RangeBounds<i64>) -> KeyRange {
    let prefix = room_prefix(room_id);
    let at = |depth: i64| {
        let mut key = prefix.clone();
        key.extend_from_slice(&encode_depth(depth));
        key
    };

    let start = match depths.start_bound() {
        Bound::Included(&lo) => at(lo),
        Bound::Excluded(&lo) => match lo.checked_add(1) {
            Some(lo) => at(lo),
            None => return KeyRange::new(prefix.clone(), Some(prefix.clone())),
        },
        Bound::Unbounded => prefix.clone(),
    };
    let end = match depths.end_bound() {
        Bound::Included(&hi) => prefix_end(&at(hi)),
        Bound::Excluded(&hi) => Some(at(hi)),
        Bound::Unbounded => prefix_end(&prefix),
    };
    KeyRange::new(start, end)
}

/// `(depth, idx)` of a `_room_events` key.
pub fn parse_room_events_key(key: &[u8]) -> Option<(i64, EventIdx)> {
    let (_, tail) = split_tail(key, 2)?;
    depth_idx(tail)
}

// _room_type: room_id \0 type \0 depth idx

pub fn room_type_prefix(room_id: &str, kind: &str) -> Vec<u8> {
    joined(&[room_id.as_bytes(), kind.as_bytes()])
}

pub fn room_type_key(room_id: &str, kind: &str, depth: i64, idx: EventIdx) -> Vec<u8> {
    with_depth_idx(room_type_prefix(room_id, kind), depth, idx)
}

// _room_joined: room_id \0 origin \0 user_id

pub fn room_joined_prefix(room_id: &str, origin: Option<&str>) -> Vec<u8> {
    match origin {
        Some(origin) => joined(&[room_id.as_bytes(), origin.as_bytes()]),
        None => room_prefix(room_id),
    }
}

pub fn room_joined_key(room_id: &str, origin: &str, user_id: &str) -> Vec<u8> {
    let mut key = room_joined_prefix(room_id, Some(origin));
    key.extend_from_slice(user_id.as_bytes());
    key
}

/// `(origin, user_id)`
pub fn parse_room_joined_key<'k>(room_id: &str, key: &'k [u8]) -> Option<(&'k str, &'k str)> {
    let rest = key.strip_prefix(room_prefix(room_id).as_slice())?;
    let (origin, user) = split_sep(rest)?;
    Some((text(origin)?, text(user)?))
}

// _room_state: room_id \0 type \0 state_key

pub fn room_state_prefix(room_id: &str, kind: Option<&str>) -> Vec<u8> {
    match kind {
        Some(kind) => joined(&[room_id.as_bytes(), kind.as_bytes()]),
        None => room_prefix(room_id),
    }
}

pub fn room_state_key(room_id: &str, kind: &str, state_key: &str) -> Vec<u8> {
    let mut key = room_state_prefix(room_id, Some(kind));
    key.extend_from_slice(state_key.as_bytes());
    key
}

/// `(type, state_key)`
pub fn parse_room_state_key<'k>(room_id: &str, key: &'k [u8]) -> Option<(&'k str, &'k str)> {
    let rest = key.strip_prefix(room_prefix(room_id).as_slice())?;
    let (kind, state_key) = split_sep(rest)?;
    Some((text(kind)?, text(state_key)?))
}

// _room_state_space: room_id \0 type \0 state_key \0 depth idx

pub fn room_state_space_prefix(room_id: &str, kind: &str, state_key: &str) -> Vec<u8> {
    joined(&[room_id.as_bytes(), kind.as_bytes(), state_key.as_bytes()])
}

pub fn room_state_space_key(
    room_id: &str,
    kind: &str,
    state_key: &str,
    depth: i64,
    idx: EventIdx,
) -> Vec<u8> {
    with_depth_idx(room_state_space_prefix(room_id, kind, state_key), depth, idx)
}

/// `(depth, idx)` of a `_room_state_space` or `_room_type` key.
pub fn parse_depth_idx_suffix(key: &[u8]) -> Option<(i64, EventIdx)> {
    parse_room_events_key(key)
}
