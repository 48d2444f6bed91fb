//! Protocol module containing the wire message type and the datagram codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_message, encode_announce, encode_key_event, encode_message, ProtocolError};
pub use messages::*;
