//! # Matrix Identifiers
//!
//! Grammar checks for sigil-prefixed identifiers and server names.
//!
//! | Kind | Sigil | Shape |
//! |------|-------|-------|
//! | Event (v1/v2) | `$` | `$opaque:server` |
//! | Event (v3) | `$` | 43 chars of standard unpadded base64 |
//! | Event (v4+) | `$` | 43 chars of URL-safe unpadded base64 |
//! | Room | `!` | `!opaque:server` |
//! | User | `@` | `@localpart:server` |
//! | Room alias | `#` | `#alias:server` |

use std::net::{Ipv4Addr, Ipv6Addr};

/// Maximum length of any identifier, sigil included.
pub const ID_MAX_SIZE: usize = 255;

/// Length of a hash-derived event id without its sigil.
const HASH_ID_LEN: usize = 43;

/// Identifier kinds distinguished by their leading sigil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Event,
    Room,
    User,
    RoomAlias,
}

impl IdKind {
    pub const fn sigil(self) -> char {
        match self {
            IdKind::Event => '$',
            IdKind::Room => '!',
            IdKind::User => '@',
            IdKind::RoomAlias => '#',
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            IdKind::Event => "event_id",
            IdKind::Room => "room_id",
            IdKind::User => "user_id",
            IdKind::RoomAlias => "room_alias",
        }
    }
}

/// Event id formats. Room versions 1 and 2 share the server-assigned format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdVersion {
    V1,
    V3,
    V4,
}

impl IdVersion {
    /// The id format a room of the given version requires.
    pub fn for_room_version(room_version: &str) -> IdVersion {
        match room_version {
            "1" | "2" => IdVersion::V1,
            "3" => IdVersion::V3,
            _ => IdVersion::V4,
        }
    }

    /// Whether `event_id` is well-formed in this format.
    pub fn matches(self, event_id: &str) -> bool {
        if event_id.len() > ID_MAX_SIZE {
            return false;
        }
        let Some(rest) = event_id.strip_prefix('$') else {
            return false;
        };
        match self {
            IdVersion::V1 => match rest.split_once(':') {
                Some((local, host)) => valid_opaque(local) && valid_remote(host),
                None => false,
            },
            IdVersion::V3 => is_hash_id(rest, false),
            IdVersion::V4 => is_hash_id(rest, true),
        }
    }

    /// Detect the format of an event id. A hash id using only characters
    /// common to both alphabets is reported as `V4`.
    pub fn detect(event_id: &str) -> Option<IdVersion> {
        [IdVersion::V1, IdVersion::V4, IdVersion::V3]
            .into_iter()
            .find(|v| v.matches(event_id))
    }
}

/// Whether `id` is a well-formed identifier of `kind`.
pub fn valid(kind: IdKind, id: &str) -> bool {
    if id.len() > ID_MAX_SIZE {
        return false;
    }
    if kind == IdKind::Event {
        return IdVersion::detect(id).is_some();
    }
    let Some(rest) = id.strip_prefix(kind.sigil()) else {
        return false;
    };
    let Some((local, host)) = rest.split_once(':') else {
        return false;
    };
    let local_ok = match kind {
        IdKind::User => !local.is_empty() && local.bytes().all(|b| (0x21..=0x7e).contains(&b)),
        _ => valid_opaque(local),
    };
    local_ok && valid_remote(host)
}

/// The server name part of a sigil-prefixed id (everything after the first `:`).
pub fn host(id: &str) -> Option<&str> {
    if !id.starts_with(['$', '!', '@', '#']) {
        return None;
    }
    id.split_once(':').map(|(_, host)| host)
}

/// The localpart of a sigil-prefixed id, sigil excluded.
pub fn localpart(id: &str) -> Option<&str> {
    let mut chars = id.chars();
    match chars.next() {
        Some('$' | '!' | '@' | '#') => chars.as_str().split_once(':').map(|(local, _)| local),
        _ => None,
    }
}

/// Whether `remote` is a syntactically valid server name: a DNS name, an
/// IPv4 literal or a bracketed IPv6 literal, each with an optional port.
pub fn valid_remote(remote: &str) -> bool {
    if remote.is_empty() || remote.len() > crate::ORIGIN_MAX_SIZE {
        return false;
    }

    if let Some(rest) = remote.strip_prefix('[') {
        let Some((addr, tail)) = rest.split_once(']') else {
            return false;
        };
        return addr.parse::<Ipv6Addr>().is_ok() && valid_port_suffix(tail);
    }

    let (host, tail) = match remote.find(':') {
        Some(i) => remote.split_at(i),
        None => (remote, ""),
    };
    (host.parse::<Ipv4Addr>().is_ok() || valid_dns_name(host)) && valid_port_suffix(tail)
}

fn valid_port_suffix(tail: &str) -> bool {
    match tail.strip_prefix(':') {
        None => tail.is_empty(),
        Some(port) => {
            !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) && port.parse::<u16>().is_ok()
        }
    }
}

fn valid_dns_name(host: &str) -> bool {
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

fn valid_opaque(local: &str) -> bool {
    !local.is_empty() && !local.chars().any(char::is_control)
}

fn is_hash_id(rest: &str, urlsafe: bool) -> bool {
    rest.len() == HASH_ID_LEN
        && rest.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || if urlsafe {
                    b == b'-' || b == b'_'
                } else {
                    b == b'+' || b == b'/'
                }
        })
}
