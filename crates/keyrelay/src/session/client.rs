//! The client session: announces itself to a host and renders key events.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use keyrelay_core::{decode_message, protocol::encode_announce, PeerAddress};
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::SessionError;
use crate::application::manage_settings::ManageSettingsUseCase;
use crate::application::render_keys::{KeySimulator, RenderKeysUseCase, RenderOutcome};
use crate::config::RelayConfig;
use crate::infrastructure::network::{Datagram, LocalAddressResolver, RelayChannel};

/// Lifecycle state of a [`ClientSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Connecting,
    Connected,
    Stopped,
}

impl ClientState {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientState::Idle => "idle",
            ClientState::Connecting => "connecting",
            ClientState::Connected => "connected",
            ClientState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters reported when a client session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientSummary {
    pub keys_simulated: usize,
    pub simulation_failures: usize,
    /// Inbound datagrams that could not be decoded.
    pub messages_dropped: usize,
}

/// One joined run against a host.
pub struct ClientSession {
    id: Uuid,
    config: RelayConfig,
    settings: ManageSettingsUseCase,
    resolver: Arc<dyn LocalAddressResolver>,
    render: RenderKeysUseCase,
    channel: Option<RelayChannel>,
    inbound: Option<mpsc::Receiver<Datagram>>,
    host: Option<SocketAddr>,
    state: ClientState,
    summary: ClientSummary,
}

impl ClientSession {
    pub fn new(
        config: RelayConfig,
        settings: ManageSettingsUseCase,
        resolver: Arc<dyn LocalAddressResolver>,
        simulator: Arc<dyn KeySimulator>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            settings,
            resolver,
            render: RenderKeysUseCase::new(simulator),
            channel: None,
            inbound: None,
            host: None,
            state: ClientState::Idle,
            summary: ClientSummary::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// The host address while connected.
    pub fn host(&self) -> Option<SocketAddr> {
        self.host
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.channel.as_ref().map(RelayChannel::local_addr)
    }

    /// The settings this session reads and updates.
    pub fn settings(&self) -> &ManageSettingsUseCase {
        &self.settings
    }

    /// Joins the host at `address`, or at the remembered address when `None`.
    ///
    /// The address is remembered for the next join before connecting.  The
    /// client then binds its listen port, connects to the host, sends one
    /// announce carrying its own IPv4 address, and starts receiving.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidAddress`] / [`SessionError::NoRememberedAddress`]:
    ///   the session stays idle and may be joined again.
    /// - [`SessionError::NoIpv4Interface`] / [`SessionError::Channel`]: fatal,
    ///   the session moves to `Stopped`.
    pub async fn join(&mut self, address: Option<&str>) -> Result<SocketAddr, SessionError> {
        let span = info_span!("client", session = %self.id);
        self.join_inner(address).instrument(span).await
    }

    async fn join_inner(&mut self, address: Option<&str>) -> Result<SocketAddr, SessionError> {
        self.expect_state(ClientState::Idle)?;

        let text = match address {
            Some(text) => text.trim().to_string(),
            None => self
                .settings
                .last_used_address()
                .map(str::to_string)
                .ok_or(SessionError::NoRememberedAddress)?,
        };
        let host_ip: Ipv4Addr = text.parse().map_err(|_| {
            warn!("invalid host address {text:?}");
            SessionError::InvalidAddress(text.clone())
        })?;

        self.state = ClientState::Connecting;
        if let Err(e) = self.settings.remember_address(&text) {
            warn!("could not remember host address: {e}");
        }

        match self.connect(host_ip).await {
            Ok(host) => {
                info!("connected to host {host}; waiting for key events");
                self.state = ClientState::Connected;
                Ok(host)
            }
            Err(e) => {
                error!("cannot join {host_ip}: {e}");
                self.stop();
                Err(e)
            }
        }
    }

    async fn connect(&mut self, host_ip: Ipv4Addr) -> Result<SocketAddr, SessionError> {
        let local_ip = self.resolver.local_ipv4()?;
        let channel = RelayChannel::bind(self.config.listen_addr()).await?;
        let host = SocketAddr::new(IpAddr::V4(host_ip), self.config.peer_port);

        channel.connect(host).await?;
        channel.send(&encode_announce(PeerAddress::new(local_ip))).await?;
        info!("announced {local_ip} to {host}");

        let inbound = channel.start_receiving(self.config.queue_capacity)?;
        self.channel = Some(channel);
        self.inbound = Some(inbound);
        self.host = Some(host);
        Ok(host)
    }

    /// Renders key events until the quit key or the end of `keys`.
    ///
    /// Keys typed on the client other than the quit key are ignored.  The
    /// session is stopped when this returns.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] unless connected.
    pub async fn run(&mut self, keys: mpsc::Receiver<char>) -> Result<ClientSummary, SessionError> {
        let span = info_span!("client", session = %self.id);
        self.run_loop(keys).instrument(span).await
    }

    async fn run_loop(&mut self, mut keys: mpsc::Receiver<char>) -> Result<ClientSummary, SessionError> {
        self.expect_state(ClientState::Connected)?;
        let Some(mut inbound) = self.inbound.take() else {
            return Err(SessionError::InvalidState {
                expected: "connected with an inbound queue",
                actual: self.state.as_str(),
            });
        };

        loop {
            tokio::select! {
                key = keys.recv() => match key {
                    Some(key) if key == self.config.quit_key => {
                        info!("quit key pressed; disconnecting");
                        break;
                    }
                    Some(key) => debug!("ignoring local key {key:?}"),
                    None => {
                        info!("keystroke source ended; disconnecting");
                        break;
                    }
                },
                Some(datagram) = inbound.recv() => {
                    self.handle_datagram(&datagram);
                }
            }
        }

        self.stop();
        Ok(self.summary)
    }

    /// Waits for the next inbound datagram.
    ///
    /// Returns `None` once the channel is closed, or while [`Self::run`]
    /// owns the queue.
    pub async fn next_datagram(&mut self) -> Option<Datagram> {
        self.inbound.as_mut()?.recv().await
    }

    /// Decodes one datagram from the host and renders key events.
    ///
    /// Every key event is simulated as received; announces are ignored and
    /// malformed datagrams dropped.
    pub fn handle_datagram(&mut self, datagram: &Datagram) -> Option<RenderOutcome> {
        let msg = match decode_message(&datagram.payload) {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                debug!("empty datagram from {}", datagram.sender);
                return None;
            }
            Err(e) => {
                debug!("dropping datagram from {}: {e}", datagram.sender);
                self.summary.messages_dropped += 1;
                return None;
            }
        };

        debug!("{} from {}", msg.kind(), datagram.sender);
        match self.render.handle_message(msg) {
            Ok(outcome) => {
                if let RenderOutcome::Simulated(key) = outcome {
                    debug!("received key {key:?}");
                    self.summary.keys_simulated += 1;
                }
                Some(outcome)
            }
            Err(e) => {
                warn!("failed to simulate key press: {e}");
                self.summary.simulation_failures += 1;
                None
            }
        }
    }

    /// Closes the channel.  The session cannot be joined again.
    pub fn stop(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
        self.inbound = None;
        self.host = None;
        if self.state != ClientState::Stopped {
            info!(
                "client stopped: {} keys simulated, {} failures",
                self.summary.keys_simulated, self.summary.simulation_failures
            );
        }
        self.state = ClientState::Stopped;
    }

    pub fn summary(&self) -> ClientSummary {
        self.summary
    }

    fn expect_state(&self, expected: ClientState) -> Result<(), SessionError> {
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
