//! Datagram codec for encoding and decoding KeyRelay protocol messages.
//!
//! Wire format:
//! ```text
//! announce:   "new:" <dotted IPv4>        e.g. b"new:192.168.1.50"
//! key event:  <one UTF-8 character>       e.g. b"z", b"\xC3\xA9"
//! ```
//! There is no header, length prefix, or checksum.  A datagram that starts
//! with the announce prefix is an announce; anything else is a key event whose
//! character is the first one in the payload.
//!
//! Decoding an announce is lenient in one way: ASCII whitespace and NUL bytes
//! around the address text are stripped before it is parsed, so
//! `b"new:10.0.0.7\n"` and NUL-padded buffers decode like `b"new:10.0.0.7"`.
//! Encoding never emits them.

use std::net::Ipv4Addr;

use crate::domain::peers::PeerAddress;
use crate::protocol::messages::{WireMessage, ANNOUNCE_PREFIX};
use thiserror::Error;

/// Errors that can occur while decoding a datagram.
///
/// Receivers treat every variant as a malformed message and drop it.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The payload does not begin with a valid UTF-8 character.
    #[error("payload does not start with a valid UTF-8 character")]
    InvalidUtf8,

    /// The text after the announce prefix is not a dotted IPv4 address.
    #[error("invalid announce address: {0:?}")]
    InvalidAnnounceAddress(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a single keystroke as its UTF-8 bytes.
///
/// # Examples
///
/// ```rust
/// use keyrelay_core::protocol::encode_key_event;
///
/// assert_eq!(encode_key_event('z'), b"z".to_vec());
/// assert_eq!(encode_key_event('é'), "é".as_bytes().to_vec());
/// ```
pub fn encode_key_event(key: char) -> Vec<u8> {
    let mut buf = [0u8; 4];
    key.encode_utf8(&mut buf).as_bytes().to_vec()
}

/// Encodes an announce for `addr`: the literal `new:` followed by the dotted
/// IPv4 text.
///
/// # Examples
///
/// ```rust
/// use std::net::Ipv4Addr;
/// use keyrelay_core::{protocol::encode_announce, PeerAddress};
///
/// let bytes = encode_announce(PeerAddress::new(Ipv4Addr::new(192, 168, 1, 50)));
/// assert_eq!(bytes, b"new:192.168.1.50".to_vec());
/// ```
pub fn encode_announce(addr: PeerAddress) -> Vec<u8> {
    format!("{ANNOUNCE_PREFIX}{}", addr.ip()).into_bytes()
}

/// Encodes any [`WireMessage`].
pub fn encode_message(msg: &WireMessage) -> Vec<u8> {
    match msg {
        WireMessage::Announce(addr) => encode_announce(*addr),
        WireMessage::KeyEvent(key) => encode_key_event(*key),
    }
}

/// Decodes one datagram payload.
///
/// Returns `Ok(None)` for an empty payload, which carries no message.
/// Bytes after the first character of a key event are ignored.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the payload is malformed.
///
/// # Examples
///
/// ```rust
/// use keyrelay_core::{decode_message, WireMessage};
///
/// assert_eq!(decode_message(b"zzz").unwrap(), Some(WireMessage::KeyEvent('z')));
/// assert_eq!(decode_message(b"").unwrap(), None);
/// ```
pub fn decode_message(bytes: &[u8]) -> Result<Option<WireMessage>, ProtocolError> {
    if bytes.is_empty() {
        return Ok(None);
    }

    if let Some(rest) = bytes.strip_prefix(ANNOUNCE_PREFIX.as_bytes()) {
        return decode_announce(rest).map(|addr| Some(WireMessage::Announce(addr)));
    }

    first_char(bytes)
        .map(|key| Some(WireMessage::KeyEvent(key)))
        .ok_or(ProtocolError::InvalidUtf8)
}

// ── Payload decoding ──────────────────────────────────────────────────────────

fn decode_announce(rest: &[u8]) -> Result<PeerAddress, ProtocolError> {
    let text = String::from_utf8_lossy(rest);
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0');
    trimmed
        .parse::<Ipv4Addr>()
        .map(PeerAddress::new)
        .map_err(|_| ProtocolError::InvalidAnnounceAddress(trimmed.to_string()))
}

/// Returns the first character of the longest valid UTF-8 prefix of `bytes`.
fn first_char(bytes: &[u8]) -> Option<char> {
    let valid = match std::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => std::str::from_utf8(&bytes[..e.valid_up_to()]).ok()?,
    };
    valid.chars().next()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
