//! KeyRelay wire message types.
//!
//! One UDP datagram carries exactly one message; the datagram boundary is the
//! message boundary.

use crate::domain::peers::PeerAddress;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Well-known UDP port used by both roles.
pub const DEFAULT_PORT: u16 = 11000;

/// Literal prefix that marks an announce datagram.
pub const ANNOUNCE_PREFIX: &str = "new:";

/// Receive buffer size.  Announce text is at most 19 bytes and a key event at
/// most 4, so anything larger is truncated by the OS and then decoded as usual.
pub const MAX_DATAGRAM_SIZE: usize = 512;

// ── Message enum ──────────────────────────────────────────────────────────────

/// A decoded datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireMessage {
    /// A client announcing the address the host should send key events to.
    Announce(PeerAddress),
    /// A single translated keystroke to render on the receiving machine.
    KeyEvent(char),
}

impl WireMessage {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Announce(_) => "announce",
            WireMessage::KeyEvent(_) => "key-event",
        }
    }
}
