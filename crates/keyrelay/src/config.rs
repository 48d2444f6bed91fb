//! Session configuration types.
//!
//! [`RelayConfig`] holds every runtime setting a host or client session
//! needs.  The binary fills it from CLI arguments and environment variables;
//! tests build it directly so they can use loopback addresses and free ports.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use keyrelay_core::protocol::DEFAULT_PORT;

/// Keystroke that ends a host or client session.
pub const DEFAULT_QUIT_KEY: char = 'q';

/// Capacity of the queue between the receive task and the session loop.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// All runtime configuration for a relay session.
///
/// # Example
///
/// ```rust
/// use keyrelay::config::RelayConfig;
///
/// let cfg = RelayConfig::default();
/// assert_eq!(cfg.listen_addr().port(), 11000);
/// assert_eq!(cfg.peer_port, 11000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Local IP the relay socket binds to.  `0.0.0.0` binds all interfaces.
    pub bind_ip: IpAddr,
    /// Local UDP port.  The host receives announces here; a client receives
    /// key events here.
    pub listen_port: u16,
    /// UDP port on the other side.  The host sends key events to
    /// `<client ip>:peer_port`; a client announces to `<host ip>:peer_port`.
    pub peer_port: u16,
    /// Keystroke that stops the session instead of being relayed.
    pub quit_key: char,
    /// Bounded queue size for inbound datagrams.
    pub queue_capacity: usize,
}

impl RelayConfig {
    /// The socket address the relay channel binds to.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.listen_port)
    }
}

impl Default for RelayConfig {
    /// Both roles use the well-known port on all interfaces.
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listen_port: DEFAULT_PORT,
            peer_port: DEFAULT_PORT,
            quit_key: DEFAULT_QUIT_KEY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}
