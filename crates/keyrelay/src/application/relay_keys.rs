//! RelayKeysUseCase: translates host keystrokes and broadcasts them to peers.
//!
//! This use case is the heart of the host role.  It owns the key translator
//! and the peer registry for one session and dispatches encoded key events
//! through a [`KeyTransmitter`].
//!
//! # Architecture
//!
//! The transmitter is a trait so the use case can be unit-tested with a
//! recording double; the production implementation is the UDP
//! `RelayChannel`.

use std::net::SocketAddr;

use async_trait::async_trait;
use keyrelay_core::{protocol::encode_key_event, KeyTranslator, PeerAddress, PeerRegistry};
use thiserror::Error;
use tracing::{debug, info};

/// Error type for a transmitter that can no longer send at all.
///
/// Failures to reach an individual peer are not errors; they are logged by
/// the transmitter and reflected in the delivered count.
#[derive(Debug, Error, PartialEq)]
pub enum TransmitError {
    #[error("transmitter is closed")]
    Closed,
}

/// Trait for sending one datagram payload to a set of peers.
///
/// Infrastructure implementations use UDP; test implementations record calls.
#[async_trait]
pub trait KeyTransmitter: Send + Sync {
    /// Sends `payload` to every address in `peers`, best-effort.
    ///
    /// Returns how many sends were accepted by the transport.
    async fn send_to_peers(&self, payload: &[u8], peers: &[SocketAddr])
        -> Result<usize, TransmitError>;
}

/// What happened to a single host keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeystrokeOutcome {
    /// The key had a mapping and was offered to every known peer.
    Relayed {
        key: char,
        sent_as: char,
        delivered: usize,
        peers: usize,
    },
    /// The key has no mapping; nothing was sent.
    Unmapped(char),
}

/// The Relay Keys use case.
pub struct RelayKeysUseCase {
    translator: KeyTranslator,
    registry: PeerRegistry,
    peer_port: u16,
}

impl RelayKeysUseCase {
    /// Creates a use case that sends key events to peers on `peer_port`.
    pub fn new(translator: KeyTranslator, peer_port: u16) -> Self {
        Self {
            translator,
            registry: PeerRegistry::new(),
            peer_port,
        }
    }

    /// Records a peer that announced itself.
    ///
    /// Returns `true` when the peer was not previously known.
    pub fn handle_announce(&mut self, addr: PeerAddress) -> bool {
        let added = self.registry.register(addr);
        if added {
            info!("new client joined from {addr} ({} known)", self.registry.len());
        } else {
            debug!("repeat announce from {addr}");
        }
        added
    }

    /// Translates `key` and broadcasts the result to every known peer.
    ///
    /// Unmapped keys are ignored and never sent.
    ///
    /// # Errors
    ///
    /// Returns [`TransmitError`] only if the transmitter is closed.
    pub async fn handle_keystroke(
        &self,
        key: char,
        transmitter: &dyn KeyTransmitter,
    ) -> Result<KeystrokeOutcome, TransmitError> {
        let Some(sent_as) = self.translator.translate(key) else {
            debug!("no mapping for {key:?}; not sent");
            return Ok(KeystrokeOutcome::Unmapped(key));
        };

        let destinations: Vec<SocketAddr> = self
            .registry
            .all()
            .iter()
            .map(|peer| peer.socket_addr(self.peer_port))
            .collect();

        let payload = encode_key_event(sent_as);
        let delivered = transmitter.send_to_peers(&payload, &destinations).await?;
        debug!(
            "sent key {sent_as:?} (typed {key:?}) to {delivered}/{} peers",
            destinations.len()
        );

        Ok(KeystrokeOutcome::Relayed {
            key,
            sent_as,
            delivered,
            peers: destinations.len(),
        })
    }

    /// Snapshot of every registered peer.
    pub fn peers(&self) -> Vec<PeerAddress> {
        self.registry.all()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    // ── Test doubles ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingTransmitter {
        sent: Mutex<Vec<(Vec<u8>, Vec<SocketAddr>)>>,
        closed: bool,
    }

    #[async_trait]
    impl KeyTransmitter for RecordingTransmitter {
        async fn send_to_peers(
            &self,
            payload: &[u8],
            peers: &[SocketAddr],
        ) -> Result<usize, TransmitError> {
            if self.closed {
                return Err(TransmitError::Closed);
            }
            self.sent.lock().unwrap().push((payload.to_vec(), peers.to_vec()));
            Ok(peers.len())
        }
    }

    fn peer(last: u8) -> PeerAddress {
        PeerAddress::new(Ipv4Addr::new(192, 168, 1, last))
    }

    fn use_case_with(pairs: &[(&str, &str)]) -> RelayKeysUseCase {
        let mut translator = KeyTranslator::new();
        translator.remap(pairs.iter().copied());
        RelayKeysUseCase::new(translator, 11000)
    }

    #[test]
    fn test_handle_announce_registers_once() {
        // Arrange
        let mut uc = use_case_with(&[]);

        // Act
        let first = uc.handle_announce(peer(50));
        let second = uc.handle_announce(peer(50));

        // Assert
        assert!(first);
        assert!(!second);
        assert_eq!(uc.peers(), vec![peer(50)]);
    }

    #[tokio::test]
    async fn test_mapped_key_is_translated_and_sent_to_every_peer() {
        // Arrange
        let mut uc = use_case_with(&[("a", "z")]);
        uc.handle_announce(peer(50));
        uc.handle_announce(peer(51));
        let tx = RecordingTransmitter::default();

        // Act
        let outcome = uc.handle_keystroke('a', &tx).await.expect("send");

        // Assert
        assert_eq!(
            outcome,
            KeystrokeOutcome::Relayed { key: 'a', sent_as: 'z', delivered: 2, peers: 2 }
        );
        let sent = tx.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, b"z".to_vec());
        let mut dests = sent[0].1.clone();
        dests.sort();
        assert_eq!(
            dests,
            vec![
                "192.168.1.50:11000".parse::<SocketAddr>().unwrap(),
                "192.168.1.51:11000".parse::<SocketAddr>().unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn test_unmapped_key_sends_nothing() {
        // Arrange
        let mut uc = use_case_with(&[("a", "z")]);
        uc.handle_announce(peer(50));
        let tx = RecordingTransmitter::default();

        // Act
        let outcome = uc.handle_keystroke('x', &tx).await.expect("no error");

        // Assert
        assert_eq!(outcome, KeystrokeOutcome::Unmapped('x'));
        assert!(tx.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mapped_key_with_no_peers_reports_zero_delivered() {
        let uc = use_case_with(&[("a", "z")]);
        let tx = RecordingTransmitter::default();

        let outcome = uc.handle_keystroke('a', &tx).await.expect("send");

        assert_eq!(
            outcome,
            KeystrokeOutcome::Relayed { key: 'a', sent_as: 'z', delivered: 0, peers: 0 }
        );
    }

    #[tokio::test]
    async fn test_closed_transmitter_is_reported() {
        let mut uc = use_case_with(&[("a", "z")]);
        uc.handle_announce(peer(1));
        let tx = RecordingTransmitter { closed: true, ..Default::default() };

        let result = uc.handle_keystroke('a', &tx).await;

        assert_eq!(result, Err(TransmitError::Closed));
    }

    #[tokio::test]
    async fn test_peer_port_is_applied_to_destinations() {
        // Arrange
        let mut translator = KeyTranslator::new();
        translator.remap([("k", "k")]);
        let mut uc = RelayKeysUseCase::new(translator, 4242);
        uc.handle_announce(peer(9));
        let tx = RecordingTransmitter::default();

        // Act
        uc.handle_keystroke('k', &tx).await.expect("send");

        // Assert
        let sent = tx.sent.lock().unwrap();
        assert_eq!(sent[0].1, vec!["192.168.1.9:4242".parse::<SocketAddr>().unwrap()]);
    }
}
