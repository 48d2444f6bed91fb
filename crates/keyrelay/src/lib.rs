//! keyrelay library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does keyrelay do? (for beginners)
//!
//! One machine runs as the *host*.  Every key typed on the host is looked up
//! in a substitution table; if the key has an entry, the substituted
//! character is sent as a single UDP datagram to every client that has
//! announced itself.
//!
//! Any number of machines run as *clients*.  A client:
//!
//! 1. Sends one `new:<its ipv4>` datagram to the host so the host learns
//!    where to send key events.
//! 2. Receives one-character datagrams from the host.
//! 3. Renders each received character locally through a [`KeySimulator`].
//!
//! [`KeySimulator`]: application::render_keys::KeySimulator

/// Application layer: use cases and the traits they depend on.
pub mod application;

/// Runtime configuration for sessions.
pub mod config;

/// Infrastructure layer: UDP transport, settings file, keystroke sources,
/// and key simulators.
pub mod infrastructure;

/// Host and client sessions: the event loops that wire everything together.
pub mod session;
