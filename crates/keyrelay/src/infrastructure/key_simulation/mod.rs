//! Key simulators that render received key events on the client.
//!
//! The platform simulator is selected at compile time via
//! `#[cfg(target_os = ...)]`:
//!
//! - **`windows`** – Injects keystrokes with `SendInput` (Windows only).
//! - **`stdout`** – Writes each character to the terminal.  Used on
//!   platforms without an injector.
//! - **`mock`** – Records every call for test assertions.

use std::sync::Arc;

use crate::application::render_keys::KeySimulator;

pub mod mock;
pub mod stdout;
#[cfg(target_os = "windows")]
pub mod windows;

pub use mock::MockKeySimulator;
pub use stdout::StdoutKeySimulator;
#[cfg(target_os = "windows")]
pub use self::windows::SendInputKeySimulator;

/// The simulator the client binary uses on this platform.
#[cfg(target_os = "windows")]
pub fn platform_simulator() -> Arc<dyn KeySimulator> {
    Arc::new(SendInputKeySimulator::new())
}

/// The simulator the client binary uses on this platform.
#[cfg(not(target_os = "windows"))]
pub fn platform_simulator() -> Arc<dyn KeySimulator> {
    Arc::new(StdoutKeySimulator::new())
}
