//! Renders received keys by writing them to standard output.

use std::io::Write;

use crate::application::render_keys::{KeySimulator, SimulationError};

#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutKeySimulator;

impl StdoutKeySimulator {
    pub fn new() -> Self {
        Self
    }
}

impl KeySimulator for StdoutKeySimulator {
    fn simulate_key_press(&self, key: char) -> Result<(), SimulationError> {
        let mut out = std::io::stdout().lock();
        let mut buf = [0u8; 4];
        out.write_all(key.encode_utf8(&mut buf).as_bytes())
            .and_then(|()| out.flush())
            .map_err(|e| SimulationError::Platform(e.to_string()))
    }
}
