//! Local IPv4 address discovery for the client announce.
//!
//! The host learns where to send key events only from the address a client
//! puts in its `new:` announce, so the client must find an IPv4 address the
//! host can route to.  Loopback is used only if the machine has nothing else.

use std::net::{IpAddr, Ipv4Addr};

use thiserror::Error;
use tracing::debug;

/// Error type for local address discovery.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// No interface carries an IPv4 address.
    #[error("no IPv4 network interface found: {0}")]
    NoIpv4Interface(String),
}

/// Trait abstracting local address lookup so sessions can be tested on
/// loopback.
pub trait LocalAddressResolver: Send + Sync {
    fn local_ipv4(&self) -> Result<Ipv4Addr, AddressError>;
}

/// Resolves the machine's primary IPv4 address from the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAddressResolver;

impl LocalAddressResolver for SystemAddressResolver {
    fn local_ipv4(&self) -> Result<Ipv4Addr, AddressError> {
        match local_ip_address::local_ip() {
            Ok(IpAddr::V4(ip)) => return Ok(ip),
            Ok(IpAddr::V6(ip)) => debug!("primary address {ip} is IPv6; scanning interfaces"),
            Err(e) => debug!("primary address lookup failed: {e}; scanning interfaces"),
        }

        let interfaces = local_ip_address::list_afinet_netifas()
            .map_err(|e| AddressError::NoIpv4Interface(e.to_string()))?;
        pick_ipv4(interfaces.into_iter().map(|(_, ip)| ip)).ok_or_else(|| {
            AddressError::NoIpv4Interface("no interface has an IPv4 address".to_string())
        })
    }
}

/// Always returns the same address.
#[derive(Debug, Clone, Copy)]
pub struct FixedAddressResolver(pub Ipv4Addr);

impl LocalAddressResolver for FixedAddressResolver {
    fn local_ipv4(&self) -> Result<Ipv4Addr, AddressError> {
        Ok(self.0)
    }
}

/// First non-loopback IPv4 address, falling back to an IPv4 loopback.
fn pick_ipv4(addrs: impl IntoIterator<Item = IpAddr>) -> Option<Ipv4Addr> {
    let mut loopback = None;
    for addr in addrs {
        if let IpAddr::V4(ip) = addr {
            if !ip.is_loopback() {
                return Some(ip);
            }
            loopback.get_or_insert(ip);
        }
    }
    loopback
}
