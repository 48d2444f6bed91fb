//! Mock key simulator for tests.
//!
//! Each simulated key is pushed into a `Mutex<Vec<char>>` so assertions can
//! inspect what was rendered and in what order.  Set `should_fail = true` to
//! exercise error paths.

use std::sync::Mutex;

use crate::application::render_keys::{KeySimulator, SimulationError};

/// A simulator that records calls without touching the OS.
#[derive(Debug, Default)]
pub struct MockKeySimulator {
    /// Every key passed to `simulate_key_press`.
    pub pressed: Mutex<Vec<char>>,
    /// When `true`, every call returns `SimulationError::Platform`.
    pub should_fail: bool,
}

impl MockKeySimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the keys simulated so far.
    pub fn pressed_keys(&self) -> Vec<char> {
        self.pressed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl KeySimulator for MockKeySimulator {
    fn simulate_key_press(&self, key: char) -> Result<(), SimulationError> {
        if self.should_fail {
            return Err(SimulationError::Platform("mock failure".to_string()));
        }
        self.pressed.lock().unwrap_or_else(|e| e.into_inner()).push(key);
        Ok(())
    }
}
