//! Bitsets selecting which indices a write touches and which reference
//! kinds it follows.

use std::fmt;

/// One bit per index a write may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Index {
    EventId = 0,
    EventCols,
    EventJson,
    EventSender,
    EventType,
    EventState,
    EventRefs,
    EventHorizon,
    EventHorizonResolve,
    RoomEvents,
    RoomType,
    RoomHead,
    RoomHeadResolve,
    RoomState,
    RoomStateSpace,
    RoomJoined,
    RoomRedact,
}

impl Index {
    pub const ALL: [Index; 17] = [
        Index::EventId,
        Index::EventCols,
        Index::EventJson,
        Index::EventSender,
        Index::EventType,
        Index::EventState,
        Index::EventRefs,
        Index::EventHorizon,
        Index::EventHorizonResolve,
        Index::RoomEvents,
        Index::RoomType,
        Index::RoomHead,
        Index::RoomHeadResolve,
        Index::RoomState,
        Index::RoomStateSpace,
        Index::RoomJoined,
        Index::RoomRedact,
    ];

    pub const fn bit(self) -> u32 {
        1 << self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Index::EventId => "EVENT_ID",
            Index::EventCols => "EVENT_COLS",
            Index::EventJson => "EVENT_JSON",
            Index::EventSender => "EVENT_SENDER",
            Index::EventType => "EVENT_TYPE",
            Index::EventState => "EVENT_STATE",
            Index::EventRefs => "EVENT_REFS",
            Index::EventHorizon => "EVENT_HORIZON",
            Index::EventHorizonResolve => "EVENT_HORIZON_RESOLVE",
            Index::RoomEvents => "ROOM_EVENTS",
            Index::RoomType => "ROOM_TYPE",
            Index::RoomHead => "ROOM_HEAD",
            Index::RoomHeadResolve => "ROOM_HEAD_RESOLVE",
            Index::RoomState => "ROOM_STATE",
            Index::RoomStateSpace => "ROOM_STATE_SPACE",
            Index::RoomJoined => "ROOM_JOINED",
            Index::RoomRedact => "ROOM_REDACT",
        }
    }
}

/// The set of indices a write touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Appendix(u32);

impl Appendix {
    pub const NONE: Appendix = Appendix(0);

    pub const ALL: Appendix = Appendix((1 << Index::ALL.len()) - 1);

    /// The indices revisited for a referrer when its horizon resolves.
    pub const HORIZON_RESOLVE: Appendix =
        Appendix::of(&[Index::EventRefs, Index::RoomRedact, Index::RoomHeadResolve]);

    pub const fn of(indices: &[Index]) -> Appendix {
        let mut bits = 0;
        let mut i = 0;
        while i < indices.len() {
            bits |= indices[i].bit();
            i += 1;
        }
        Appendix(bits)
    }

    pub const fn has(self, index: Index) -> bool {
        self.0 & index.bit() != 0
    }

    pub const fn any(self) -> bool {
        self.0 != 0
    }

    pub const fn with(self, index: Index) -> Appendix {
        Appendix(self.0 | index.bit())
    }

    pub const fn without(self, index: Index) -> Appendix {
        Appendix(self.0 & !index.bit())
    }

    pub const fn intersect(self, other: Appendix) -> Appendix {
        Appendix(self.0 & other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = Index> {
        Index::ALL.into_iter().filter(move |i| self.has(*i))
    }
}

impl Default for Appendix {
    fn default() -> Self {
        Appendix::ALL
    }
}

impl fmt::Display for Appendix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter().map(Index::name).collect();
        f.write_str(&names.join("|"))
    }
}

/// The kinds of reference recorded in `_event_refs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum RefType {
    /// The referrer lists the target in `prev_events`.
    Next = 0,
    /// The referrer lists the target in `auth_events`.
    NextAuth = 1,
    /// The referrer is a redaction of the target.
    Redaction = 2,
}

impl RefType {
    pub const ALL: [RefType; 3] = [RefType::Next, RefType::NextAuth, RefType::Redaction];

    pub const fn from_u8(value: u8) -> Option<RefType> {
        match value {
            0 => Some(RefType::Next),
            1 => Some(RefType::NextAuth),
            2 => Some(RefType::Redaction),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            RefType::Next => "NEXT",
            RefType::NextAuth => "NEXT_AUTH",
            RefType::Redaction => "M_ROOM_REDACTION",
        }
    }
}

/// A set of reference kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefMask(u8);

impl RefMask {
    pub const NONE: RefMask = RefMask(0);

    pub const ALL: RefMask = RefMask(0b111);

    pub const fn of(types: &[RefType]) -> RefMask {
        let mut bits = 0;
        let mut i = 0;
        while i < types.len() {
            bits |= 1 << types[i] as u8;
            i += 1;
        }
        RefMask(bits)
    }

    pub const fn has(self, ref_type: RefType) -> bool {
        self.0 & (1 << ref_type as u8) != 0
    }

    pub const fn any(self) -> bool {
        self.0 != 0
    }
}

impl Default for RefMask {
    fn default() -> Self {
        RefMask::ALL
    }
}
