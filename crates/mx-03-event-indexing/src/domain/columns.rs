//! Column families of the event store.
//!
//! | Column | Key | Value |
//! |--------|-----|-------|
//! | `_event_idx` | event_id | idx (0 = blacklisted) |
//! | `_event_idx_max` | `last` | highest idx ever indexed |
//! | one per field | idx | field JSON |
//! | `_event_json` | idx | canonical event JSON |
//! | `_event_refs` | target idx, ref type, referrer idx | - |
//! | `_event_horizon` | unresolved event_id, referrer idx | referrer room_id |
//! | `_event_sender` | sender, idx | - |
//! | `_event_type` | type, idx | - |
//! | `_event_state` | state_key, type, room_id, depth, idx | - |
//! | `_room_head` | room_id, event_id | idx |
//! | `_room_events` | room_id, depth, idx | idx |
//! | `_room_type` | room_id, type, depth, idx | - |
//! | `_room_joined` | room_id, origin, user_id | idx |
//! | `_room_state` | room_id, type, state_key | idx |
//! | `_room_state_space` | room_id, type, state_key, depth, idx | idx |

use shared_types::EventField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    /// Direct storage of one event field, keyed by idx.
    Field(EventField),
    EventIdx,
    /// High-water mark of indexed idx values; deletes never lower it.
    EventIdxMax,
    EventJson,
    EventRefs,
    EventHorizon,
    EventSender,
    EventType,
    EventState,
    RoomHead,
    RoomEvents,
    RoomType,
    RoomJoined,
    RoomState,
    RoomStateSpace,
}

impl Column {
    /// Every column except the per-field ones.
    pub const INDICES: [Column; 14] = [
        Column::EventIdx,
        Column::EventIdxMax,
        Column::EventJson,
        Column::EventRefs,
        Column::EventHorizon,
        Column::EventSender,
        Column::EventType,
        Column::EventState,
        Column::RoomHead,
        Column::RoomEvents,
        Column::RoomType,
        Column::RoomJoined,
        Column::RoomState,
        Column::RoomStateSpace,
    ];

    pub fn all() -> impl Iterator<Item = Column> {
        EventField::ALL
            .into_iter()
            .map(Column::Field)
            .chain(Column::INDICES)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Column::Field(field) => field.name(),
            Column::EventIdx => "_event_idx",
            Column::EventIdxMax => "_event_idx_max",
            Column::EventJson => "_event_json",
            Column::EventRefs => "_event_refs",
            Column::EventHorizon => "_event_horizon",
            Column::EventSender => "_event_sender",
            Column::EventType => "_event_type",
            Column::EventState => "_event_state",
            Column::RoomHead => "_room_head",
            Column::RoomEvents => "_room_events",
            Column::RoomType => "_room_type",
            Column::RoomJoined => "_room_joined",
            Column::RoomState => "_room_state",
            Column::RoomStateSpace => "_room_state_space",
        }
    }

    pub fn from_name(name: &str) -> Option<Column> {
        Column::all().find(|c| c.name() == name)
    }
}
