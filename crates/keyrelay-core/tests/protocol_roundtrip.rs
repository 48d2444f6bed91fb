//! Integration tests for the keyrelay-core protocol codec.
//!
//! These tests exercise the codec, the peer registry, and the translator
//! together through the public API, the same way the host and client
//! sessions use them.

use std::net::Ipv4Addr;

use keyrelay_core::{
    decode_message, encode_message,
    keymap::parse_mapping_batch,
    protocol::{encode_announce, encode_key_event},
    KeyTranslator, PeerAddress, PeerRegistry, WireMessage,
};

#[test]
fn test_key_event_round_trip_across_the_char_space() {
    // Every 97th scalar value covers ASCII, the BMP, and the astral planes.
    for key in (0u32..=0x10FFFF).step_by(97).filter_map(char::from_u32) {
        let decoded = decode_message(&encode_key_event(key)).expect("decode must succeed");
        assert_eq!(decoded, Some(WireMessage::KeyEvent(key)), "char U+{:04X}", key as u32);
    }
}

#[test]
fn test_key_event_round_trip_for_boundary_chars() {
    for key in ['\0', 'n', '\u{7F}', '\u{80}', '\u{7FF}', '\u{800}', '\u{FFFF}', '\u{10000}', char::MAX] {
        assert_eq!(
            decode_message(&encode_key_event(key)),
            Ok(Some(WireMessage::KeyEvent(key)))
        );
    }
}

#[test]
fn test_announce_round_trip_for_representative_addresses() {
    let hosts = [
        Ipv4Addr::new(0, 0, 0, 0),
        Ipv4Addr::new(127, 0, 0, 1),
        Ipv4Addr::new(192, 168, 1, 50),
        Ipv4Addr::new(10, 200, 3, 4),
        Ipv4Addr::new(255, 255, 255, 255),
    ];

    for ip in hosts {
        let addr = PeerAddress::new(ip);
        let decoded = decode_message(&encode_announce(addr)).expect("decode must succeed");
        assert_eq!(decoded, Some(WireMessage::Announce(addr)));
    }
}

#[test]
fn test_encode_message_then_decode_is_identity() {
    let messages = [
        WireMessage::KeyEvent('z'),
        WireMessage::Announce(PeerAddress::new(Ipv4Addr::new(172, 16, 0, 9))),
    ];

    for msg in messages {
        assert_eq!(decode_message(&encode_message(&msg)), Ok(Some(msg)));
    }
}

/// Mirrors what the host session does with a stream of raw datagrams:
/// announces populate the registry and duplicates collapse.
#[test]
fn test_decoded_announces_populate_registry_without_duplicates() {
    // Arrange
    let datagrams: [&[u8]; 5] = [
        b"new:192.168.1.50",
        b"new:192.168.1.51",
        b"new:192.168.1.50",
        b"x",
        b"",
    ];
    let mut registry = PeerRegistry::new();

    // Act
    for datagram in datagrams {
        if let Ok(Some(WireMessage::Announce(addr))) = decode_message(datagram) {
            registry.register(addr);
        }
    }

    // Assert
    let mut peers = registry.all();
    peers.sort();
    assert_eq!(
        peers,
        vec![
            PeerAddress::new(Ipv4Addr::new(192, 168, 1, 50)),
            PeerAddress::new(Ipv4Addr::new(192, 168, 1, 51)),
        ]
    );
}

/// The host-side path from a keystroke to the bytes on the wire.
#[test]
fn test_parsed_batch_translates_keystrokes_before_encoding() {
    // Arrange
    let mut translator = KeyTranslator::new();
    translator.remap(parse_mapping_batch("a=z,bad=x,c=d").expect("parse"));

    // Act
    let sent: Vec<Vec<u8>> = "abc"
        .chars()
        .filter_map(|key| translator.translate(key))
        .map(encode_key_event)
        .collect();

    // Assert: 'b' has no mapping and is never encoded
    assert_eq!(sent, vec![b"z".to_vec(), b"d".to_vec()]);
}
