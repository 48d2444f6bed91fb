//! # keyrelay-core
//!
//! Shared library for KeyRelay containing the datagram wire codec, the peer
//! registry, and the key substitution table.
//!
//! This crate is used by both the host and the client roles.
//! It has zero dependencies on OS APIs, sockets, or the file system.
//!
//! # Architecture overview (for beginners)
//!
//! KeyRelay forwards single keystrokes from one machine (the "host") to any
//! number of other machines (the "clients") on the same LAN.  Every keystroke
//! typed on the host is first passed through a substitution table, and only
//! keys that have an entry in the table are sent.
//!
//! This crate (`keyrelay-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How bytes travel over the network.  There is no header
//!   and no framing: one UDP datagram carries exactly one message, either the
//!   text `new:<ipv4>` or a single UTF-8 character.
//!
//! - **`domain`** – The host-side peer registry and the [`PeerAddress`] type.
//!
//! - **`keymap`** – The [`KeyTranslator`] substitution table and the parser
//!   for `a=b,c=d` remap batches.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::peers::{PeerAddress, PeerRegistry};
pub use keymap::{KeyTranslator, RemapError, RemapOutcome};
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::messages::WireMessage;
