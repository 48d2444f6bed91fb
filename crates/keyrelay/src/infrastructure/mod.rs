//! Infrastructure layer.
//!
//! Contains OS-facing adapters: the UDP channel, the settings file,
//! keystroke sources, and key simulators.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `keyrelay_core`, but MUST NOT be imported by the `application` layer,
//! except for the plain settings data types.

pub mod key_capture;
pub mod key_simulation;
pub mod network;
pub mod storage;
