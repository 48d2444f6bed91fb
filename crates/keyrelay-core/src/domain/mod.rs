//! Domain entities for KeyRelay.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: no sockets, no files, no OS input APIs.
//!
//! Code in outer layers (application, infrastructure, sessions) depends on the
//! domain, but the domain never depends on them.

/// Peer addresses and the host-side peer registry.
///
/// See [`peers::PeerRegistry`] for the main type.
pub mod peers;
