//! The host session: relays translated keystrokes to announced clients.

use std::fmt;
use std::net::SocketAddr;

use keyrelay_core::{decode_message, KeyTranslator, PeerAddress, WireMessage};
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::SessionError;
use crate::application::relay_keys::{KeystrokeOutcome, RelayKeysUseCase};
use crate::config::RelayConfig;
use crate::infrastructure::network::{ChannelError, Datagram, RelayChannel};

/// Lifecycle state of a [`HostSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Idle,
    Hosting,
    Stopped,
}

impl HostState {
    pub fn as_str(self) -> &'static str {
        match self {
            HostState::Idle => "idle",
            HostState::Hosting => "hosting",
            HostState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters reported when a host session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostSummary {
    /// Keystrokes that had a mapping and were broadcast.
    pub keys_relayed: usize,
    /// Keystrokes with no mapping.
    pub keys_ignored: usize,
    /// Inbound datagrams that could not be decoded.
    pub messages_dropped: usize,
    /// Distinct peers registered during the session.
    pub peers: usize,
}

/// One hosting run.
pub struct HostSession {
    id: Uuid,
    config: RelayConfig,
    relay: RelayKeysUseCase,
    channel: Option<RelayChannel>,
    inbound: Option<mpsc::Receiver<Datagram>>,
    state: HostState,
    summary: HostSummary,
}

impl HostSession {
    /// Creates an idle session that will translate keys with `translator`.
    pub fn new(config: RelayConfig, translator: KeyTranslator) -> Self {
        let relay = RelayKeysUseCase::new(translator, config.peer_port);
        Self {
            id: Uuid::new_v4(),
            config,
            relay,
            channel: None,
            inbound: None,
            state: HostState::Idle,
            summary: HostSummary::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    /// The bound address while hosting.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.channel.as_ref().map(RelayChannel::local_addr)
    }

    pub fn peers(&self) -> Vec<PeerAddress> {
        self.relay.peers()
    }

    /// Binds the listen port and starts receiving announces.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] unless idle, or
    /// [`SessionError::Channel`] if the port cannot be bound.  A bind
    /// failure is fatal: the session moves to `Stopped`.
    pub async fn start(&mut self) -> Result<SocketAddr, SessionError> {
        self.expect_state(HostState::Idle)?;
        let span = info_span!("host", session = %self.id);
        let result = async {
            let channel = RelayChannel::bind(self.config.listen_addr()).await?;
            let inbound = channel.start_receiving(self.config.queue_capacity)?;
            Ok::<_, ChannelError>((channel, inbound))
        }
        .instrument(span.clone())
        .await;

        let _enter = span.enter();
        match result {
            Ok((channel, inbound)) => {
                let addr = channel.local_addr();
                info!("hosting on {addr}, quit key {:?}", self.config.quit_key);
                self.channel = Some(channel);
                self.inbound = Some(inbound);
                self.state = HostState::Hosting;
                Ok(addr)
            }
            Err(e) => {
                error!("cannot host: {e}");
                self.state = HostState::Stopped;
                Err(e.into())
            }
        }
    }

    /// Runs the host loop until the quit key or the end of `keys`.
    ///
    /// While running, every inbound announce registers a peer and every
    /// mapped keystroke is broadcast to all registered peers.  The session
    /// is stopped when this returns.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] unless hosting, or
    /// [`SessionError::Channel`] if the channel closes underneath the loop.
    pub async fn run(&mut self, keys: mpsc::Receiver<char>) -> Result<HostSummary, SessionError> {
        let span = info_span!("host", session = %self.id);
        self.run_loop(keys).instrument(span).await
    }

    async fn run_loop(&mut self, mut keys: mpsc::Receiver<char>) -> Result<HostSummary, SessionError> {
        self.expect_state(HostState::Hosting)?;
        let Some(mut inbound) = self.inbound.take() else {
            return Err(SessionError::InvalidState {
                expected: "hosting with an inbound queue",
                actual: self.state.as_str(),
            });
        };

        let result = loop {
            tokio::select! {
                key = keys.recv() => match key {
                    Some(key) if key == self.config.quit_key => {
                        info!("quit key pressed");
                        break Ok(());
                    }
                    Some(key) => {
                        if let Err(e) = self.handle_keystroke(key).await {
                            break Err(e);
                        }
                    }
                    None => {
                        info!("keystroke source ended");
                        break Ok(());
                    }
                },
                Some(datagram) = inbound.recv() => {
                    self.handle_datagram(&datagram);
                }
            }
        };

        self.stop();
        result.map(|()| self.summary)
    }

    /// Waits for the next inbound datagram.
    ///
    /// Returns `None` once the channel is closed, or while [`Self::run`]
    /// owns the queue.
    pub async fn next_datagram(&mut self) -> Option<Datagram> {
        self.inbound.as_mut()?.recv().await
    }

    /// Decodes one inbound datagram and registers announced peers.
    ///
    /// Key events arriving at a host are ignored. Malformed datagrams are
    /// dropped.  Returns the decoded message, if any.
    pub fn handle_datagram(&mut self, datagram: &Datagram) -> Option<WireMessage> {
        match decode_message(&datagram.payload) {
            Ok(Some(msg)) => {
                match msg {
                    WireMessage::Announce(addr) => {
                        if self.relay.handle_announce(addr) {
                            self.summary.peers = self.relay.peers().len();
                        }
                    }
                    WireMessage::KeyEvent(_) => {
                        debug!("ignoring {} from {} on a host", msg.kind(), datagram.sender);
                    }
                }
                Some(msg)
            }
            Ok(None) => {
                debug!("empty datagram from {}", datagram.sender);
                None
            }
            Err(e) => {
                debug!("dropping datagram from {}: {e}", datagram.sender);
                self.summary.messages_dropped += 1;
                None
            }
        }
    }

    /// Translates and broadcasts one keystroke.
    ///
    /// The quit key is not special here; [`Self::run`] checks it first.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] unless hosting, or
    /// [`SessionError::Channel`] if the channel is closed.
    pub async fn handle_keystroke(&mut self, key: char) -> Result<KeystrokeOutcome, SessionError> {
        self.expect_state(HostState::Hosting)?;
        let channel = self.channel.as_ref().ok_or(ChannelError::Closed)?;
        let outcome = self
            .relay
            .handle_keystroke(key, channel)
            .await
            .map_err(|_| ChannelError::Closed)?;

        match outcome {
            KeystrokeOutcome::Relayed { sent_as, delivered, peers, .. } => {
                self.summary.keys_relayed += 1;
                if delivered < peers {
                    warn!("key {sent_as:?} reached only {delivered} of {peers} peers");
                }
            }
            KeystrokeOutcome::Unmapped(_) => self.summary.keys_ignored += 1,
        }
        Ok(outcome)
    }

    /// Closes the channel.  The session cannot be restarted.
    pub fn stop(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
        self.inbound = None;
        if self.state != HostState::Stopped {
            info!(
                "host stopped: {} relayed, {} ignored, {} peers",
                self.summary.keys_relayed, self.summary.keys_ignored, self.summary.peers
            );
        }
        self.state = HostState::Stopped;
    }

    pub fn summary(&self) -> HostSummary {
        self.summary
    }

    fn expect_state(&self, expected: HostState) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tokio::net::UdpSocket;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    fn loopback_config(peer_port: u16) -> RelayConfig {
        RelayConfig {
            bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            listen_port: 0,
            peer_port,
            ..RelayConfig::default()
        }
    }

    fn translator(pairs: &[(&str, &str)]) -> KeyTranslator {
        let mut t = KeyTranslator::new();
        t.remap(pairs.iter().copied());
        t
    }

    #[tokio::test]
    async fn test_start_moves_idle_to_hosting() {
        // Arrange
        let mut host = HostSession::new(loopback_config(0), KeyTranslator::new());
        assert_eq!(host.state(), HostState::Idle);

        // Act
        let addr = host.start().await.expect("start");

        // Assert
        assert_eq!(host.state(), HostState::Hosting);
        assert_eq!(host.local_addr(), Some(addr));
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_port_in_use_stops_session() {
        // Arrange
        let mut first = HostSession::new(loopback_config(0), KeyTranslator::new());
        let addr = first.start().await.expect("start");
        let mut second = HostSession::new(
            RelayConfig { listen_port: addr.port(), ..loopback_config(0) },
            KeyTranslator::new(),
        );

        // Act
        let result = second.start().await;

        // Assert
        assert!(matches!(result, Err(SessionError::Channel(ChannelError::Bind { .. }))));
        assert_eq!(second.state(), HostState::Stopped);
    }

    #[tokio::test]
    async fn test_announce_datagram_registers_peer_once() {
        // Arrange
        let mut host = HostSession::new(loopback_config(0), KeyTranslator::new());
        let addr = host.start().await.expect("start");
        let client = UdpSocket::bind("127.0.0.1:0").await.expect("bind");

        // Act
        client.send_to(b"new:192.168.1.50", addr).await.expect("send");
        client.send_to(b"new:192.168.1.50", addr).await.expect("send");
        for _ in 0..2 {
            let dg = timeout(WAIT, host.next_datagram()).await.expect("timeout").expect("dg");
            host.handle_datagram(&dg);
        }

        // Assert
        assert_eq!(host.peers(), vec![PeerAddress::new(Ipv4Addr::new(192, 168, 1, 50))]);
        assert_eq!(host.summary().peers, 1);
    }

    #[tokio::test]
    async fn test_malformed_datagram_is_dropped() {
        let mut host = HostSession::new(loopback_config(0), KeyTranslator::new());
        let sender: SocketAddr = "127.0.0.1:9".parse().unwrap();

        let decoded = host.handle_datagram(&Datagram { payload: b"new:nope".to_vec(), sender });

        assert!(decoded.is_none());
        assert!(host.peers().is_empty());
        assert_eq!(host.summary().messages_dropped, 1);
    }

    #[tokio::test]
    async fn test_inbound_key_event_is_ignored() {
        let mut host = HostSession::new(loopback_config(0), KeyTranslator::new());
        let sender: SocketAddr = "127.0.0.1:9".parse().unwrap();

        let decoded = host.handle_datagram(&Datagram { payload: b"k".to_vec(), sender });

        assert_eq!(decoded, Some(WireMessage::KeyEvent('k')));
        assert!(host.peers().is_empty());
    }

    #[tokio::test]
    async fn test_mapped_keystroke_reaches_registered_peer() {
        // Arrange: a raw socket plays the client on 127.0.0.1:<peer port>
        let client = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
        let peer_port = client.local_addr().unwrap().port();
        let mut host = HostSession::new(loopback_config(peer_port), translator(&[("a", "z")]));
        host.start().await.expect("start");
        host.handle_datagram(&Datagram {
            payload: b"new:127.0.0.1".to_vec(),
            sender: client.local_addr().unwrap(),
        });

        // Act
        let outcome = host.handle_keystroke('a').await.expect("relay");

        // Assert
        assert!(matches!(outcome, KeystrokeOutcome::Relayed { sent_as: 'z', delivered: 1, .. }));
        let mut buf = [0u8; 16];
        let (len, _) = timeout(WAIT, client.recv_from(&mut buf)).await.expect("timeout").expect("recv");
        assert_eq!(&buf[..len], b"z");
        assert_eq!(host.summary().keys_relayed, 1);
    }

    #[tokio::test]
    async fn test_unmapped_keystroke_is_counted_not_sent() {
        let mut host = HostSession::new(loopback_config(0), translator(&[("a", "z")]));
        host.start().await.expect("start");

        let outcome = host.handle_keystroke('x').await.expect("no error");

        assert_eq!(outcome, KeystrokeOutcome::Unmapped('x'));
        assert_eq!(host.summary().keys_ignored, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_quit_key() {
        // Arrange
        let mut host = HostSession::new(loopback_config(0), translator(&[("a", "z")]));
        host.start().await.expect("start");
        let (tx, rx) = mpsc::channel(4);
        tx.send('a').await.unwrap();
        tx.send('b').await.unwrap();
        tx.send('q').await.unwrap();

        // Act
        let summary = timeout(WAIT, host.run(rx)).await.expect("timeout").expect("run");

        // Assert
        assert_eq!(summary.keys_relayed, 1);
        assert_eq!(summary.keys_ignored, 1);
        assert_eq!(host.state(), HostState::Stopped);
        assert!(host.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_run_stops_when_key_source_ends() {
        let mut host = HostSession::new(loopback_config(0), KeyTranslator::new());
        host.start().await.expect("start");
        let (tx, rx) = mpsc::channel::<char>(1);
        drop(tx);

        let summary = timeout(WAIT, host.run(rx)).await.expect("timeout").expect("run");

        assert_eq!(summary, HostSummary::default());
        assert_eq!(host.state(), HostState::Stopped);
    }

    #[tokio::test]
    async fn test_run_before_start_is_invalid_state() {
        let mut host = HostSession::new(loopback_config(0), KeyTranslator::new());
        let (_tx, rx) = mpsc::channel(1);

        let result = host.run(rx).await;

        assert!(matches!(
            result,
            Err(SessionError::InvalidState { expected: "hosting", actual: "idle" })
        ));
    }

    #[tokio::test]
    async fn test_stopped_session_cannot_restart() {
        let mut host = HostSession::new(loopback_config(0), KeyTranslator::new());
        host.start().await.expect("start");
        host.stop();

        let result = host.start().await;

        assert!(matches!(result, Err(SessionError::InvalidState { actual: "stopped", .. })));
    }
}
