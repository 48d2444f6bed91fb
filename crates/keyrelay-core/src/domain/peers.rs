//! Peer addresses and the host-side peer registry.
//!
//! The registry is the host's in-memory record of every client that has
//! announced itself during the current session.
//!
//! # Lifecycle (for beginners)
//!
//! ```text
//! client sends "new:<ip>"  ──►  host decodes Announce  ──►  PeerRegistry::register
//!                                                                  │
//!                             host broadcasts key events  ◄── PeerRegistry::all
//! ```
//!
//! There is no removal: UDP has no connection to lose, so a client that goes
//! away simply stops receiving.  Entries live until the host session ends.

use std::collections::HashSet;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// The IPv4 host of a peer.
///
/// Every peer listens on the same well-known port, so identity is the host
/// value alone.  The port is attached only when a socket address is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddress(Ipv4Addr);

impl PeerAddress {
    /// Wraps an IPv4 host.
    pub const fn new(ip: Ipv4Addr) -> Self {
        Self(ip)
    }

    /// The IPv4 host value.
    pub const fn ip(&self) -> Ipv4Addr {
        self.0
    }

    /// The socket address of this peer on `port`.
    pub fn socket_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.0, port))
    }
}

impl From<Ipv4Addr> for PeerAddress {
    fn from(ip: Ipv4Addr) -> Self {
        Self(ip)
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Set of known client addresses, deduplicated by host.
///
/// # HashSet choice
///
/// Broadcast order is irrelevant for a best-effort datagram protocol, so a
/// `HashSet` gives O(1) dedup without keeping insertion order.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashSet<PeerAddress>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `addr` unless it is already present.
    ///
    /// Returns `true` when the address was newly added.
    pub fn register(&mut self, addr: PeerAddress) -> bool {
        self.peers.insert(addr)
    }

    /// A snapshot of every known peer, in no particular order.
    pub fn all(&self) -> Vec<PeerAddress> {
        self.peers.iter().copied().collect()
    }

    pub fn contains(&self, addr: PeerAddress) -> bool {
        self.peers.contains(&addr)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(last: u8) -> PeerAddress {
        PeerAddress::new(Ipv4Addr::new(192, 168, 1, last))
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = PeerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.all().is_empty());
    }

    #[test]
    fn test_register_new_peer_returns_true() {
        // Arrange
        let mut registry = PeerRegistry::new();

        // Act
        let added = registry.register(peer(50));

        // Assert
        assert!(added);
        assert_eq!(registry.all(), vec![peer(50)]);
    }

    #[test]
    fn test_register_same_host_twice_keeps_one_entry() {
        // Arrange
        let mut registry = PeerRegistry::new();
        registry.register(peer(50));

        // Act
        let added_again = registry.register(peer(50));

        // Assert
        assert!(!added_again);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_all_returns_every_distinct_peer() {
        // Arrange
        let mut registry = PeerRegistry::new();
        registry.register(peer(1));
        registry.register(peer(2));
        registry.register(peer(1));

        // Act
        let mut all = registry.all();
        all.sort();

        // Assert
        assert_eq!(all, vec![peer(1), peer(2)]);
    }

    #[test]
    fn test_contains_reports_membership() {
        let mut registry = PeerRegistry::new();
        registry.register(peer(9));
        assert!(registry.contains(peer(9)));
        assert!(!registry.contains(peer(10)));
    }

    #[test]
    fn test_socket_addr_attaches_port() {
        let addr = peer(50).socket_addr(11000);
        assert_eq!(addr, "192.168.1.50:11000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_display_is_dotted_ipv4() {
        assert_eq!(peer(7).to_string(), "192.168.1.7");
    }
}
