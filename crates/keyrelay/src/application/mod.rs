//! Application layer use cases.
//!
//! # What use cases are there?
//!
//! - **`relay_keys`** – Host side.  Translates local keystrokes through the
//!   substitution table and hands the encoded key event to a
//!   `KeyTransmitter` for every registered peer.  Also records announced
//!   peers.
//!
//! - **`render_keys`** – Client side.  Decides what to do with a decoded
//!   message and calls the injected `KeySimulator` for key events.
//!
//! - **`manage_settings`** – Owns the loaded settings and the key
//!   translator, applies remap batches, and persists every change through a
//!   `SettingsRepository`.
//!
//! Each use case depends only on traits and `keyrelay_core` types, so it can
//! be tested without sockets, files, or an OS input API.

pub mod manage_settings;
pub mod relay_keys;
pub mod render_keys;
