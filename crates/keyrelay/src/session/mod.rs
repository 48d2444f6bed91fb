//! Host and client sessions.
//!
//! A session owns everything one run of a role needs: the relay channel,
//! its inbound queue, the role's use case, and its lifecycle state.  There is
//! no process-wide state, so two sessions in one process (as in the
//! integration tests) never interfere.
//!
//! # Lifecycles
//!
//! ```text
//! host:    Idle ──start──▶ Hosting ──stop──▶ Stopped
//! client:  Idle ──join──▶ Connecting ──▶ Connected ──stop──▶ Stopped
//! ```
//!
//! Each `run` loop multiplexes the keystroke queue and the inbound datagram
//! queue with `tokio::select!`, so the quit key is seen even while no
//! datagrams arrive.

use thiserror::Error;

use crate::infrastructure::key_capture::CaptureError;
use crate::infrastructure::network::{AddressError, ChannelError};
use crate::infrastructure::storage::settings::SettingsError;

pub mod client;
pub mod host;

pub use client::{ClientSession, ClientState, ClientSummary};
pub use host::{HostSession, HostState, HostSummary};

/// Error type for session lifecycle operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The join target is not a dotted IPv4 address.
    #[error("invalid IPv4 address: {0:?}")]
    InvalidAddress(String),

    #[error(transparent)]
    NoIpv4Interface(#[from] AddressError),

    #[error("no host address given and none remembered from a previous join")]
    NoRememberedAddress,

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The operation is not valid in the session's current state.
    #[error("session is {actual}, operation requires {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
}
