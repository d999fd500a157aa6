//! Rule codes and their reflection table.

/// Number of conformity rules.
pub const NUM_CODES: usize = 30;

/// One code per structural rule; the discriminant is the report bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Code {
    InvalidOrMissingEventId = 0,
    InvalidOrMissingRoomId,
    InvalidOrMissingSenderId,
    MissingType,
    InvalidType,
    MissingOrigin,
    InvalidOrigin,
    InvalidStateKey,
    InvalidOrMissingRedactsId,
    MissingContentMembership,
    InvalidContentMembership,
    MissingMemberStateKey,
    InvalidMemberStateKey,
    MissingPrevEvents,
    MissingAuthEvents,
    DepthNegative,
    DepthZero,
    MissingSignatures,
    MissingOriginSignature,
    MismatchOriginSender,
    MismatchCreateSender,
    MismatchAliasesStateKey,
    SelfRedacts,
    SelfPrevEvent,
    SelfAuthEvent,
    DupPrevEvent,
    DupAuthEvent,
    MismatchEventId,
    MissingHashes,
    MismatchHashes,
}

/// Names indexed by bit position.
pub const REFLECTS: [&str; NUM_CODES] = [
    "INVALID_OR_MISSING_EVENT_ID",
    "INVALID_OR_MISSING_ROOM_ID",
    "INVALID_OR_MISSING_SENDER_ID",
    "MISSING_TYPE",
    "INVALID_TYPE",
    "MISSING_ORIGIN",
    "INVALID_ORIGIN",
    "INVALID_STATE_KEY",
    "INVALID_OR_MISSING_REDACTS_ID",
    "MISSING_CONTENT_MEMBERSHIP",
    "INVALID_CONTENT_MEMBERSHIP",
    "MISSING_MEMBER_STATE_KEY",
    "INVALID_MEMBER_STATE_KEY",
    "MISSING_PREV_EVENTS",
    "MISSING_AUTH_EVENTS",
    "DEPTH_NEGATIVE",
    "DEPTH_ZERO",
    "MISSING_SIGNATURES",
    "MISSING_ORIGIN_SIGNATURE",
    "MISMATCH_ORIGIN_SENDER",
    "MISMATCH_CREATE_SENDER",
    "MISMATCH_ALIASES_STATE_KEY",
    "SELF_REDACTS",
    "SELF_PREV_EVENT",
    "SELF_AUTH_EVENT",
    "DUP_PREV_EVENT",
    "DUP_AUTH_EVENT",
    "MISMATCH_EVENT_ID",
    "MISSING_HASHES",
    "MISMATCH_HASHES",
];

impl Code {
    pub const ALL: [Code; NUM_CODES] = [
        Code::InvalidOrMissingEventId,
        Code::InvalidOrMissingRoomId,
        Code::InvalidOrMissingSenderId,
        Code::MissingType,
        Code::InvalidType,
        Code::MissingOrigin,
        Code::InvalidOrigin,
        Code::InvalidStateKey,
        Code::InvalidOrMissingRedactsId,
        Code::MissingContentMembership,
        Code::InvalidContentMembership,
        Code::MissingMemberStateKey,
        Code::InvalidMemberStateKey,
        Code::MissingPrevEvents,
        Code::MissingAuthEvents,
        Code::DepthNegative,
        Code::DepthZero,
        Code::MissingSignatures,
        Code::MissingOriginSignature,
        Code::MismatchOriginSender,
        Code::MismatchCreateSender,
        Code::MismatchAliasesStateKey,
        Code::SelfRedacts,
        Code::SelfPrevEvent,
        Code::SelfAuthEvent,
        Code::DupPrevEvent,
        Code::DupAuthEvent,
        Code::MismatchEventId,
        Code::MissingHashes,
        Code::MismatchHashes,
    ];

    pub const fn bit(self) -> u64 {
        1 << self as u8
    }

    pub const fn name(self) -> &'static str {
        REFLECTS[self as usize]
    }

    pub fn from_name(name: &str) -> Option<Code> {
        Code::ALL.into_iter().find(|code| code.name() == name)
    }
}

// The table order must follow the discriminants.
const _: () = {
    let mut i = 0;
    while i < NUM_CODES {
        assert!(Code::ALL[i] as usize == i);
        i += 1;
    }
};

/// Human-readable name of a rule code.
pub fn reflect(code: Code) -> &'static str {
    code.name()
}
