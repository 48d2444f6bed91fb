//! RenderKeysUseCase: turns received key events into local keystrokes.
//!
//! This use case sits at the application layer and delegates to a
//! [`KeySimulator`] trait object for the actual OS-level injection.  The
//! simulator implementations live in the infrastructure layer.
//!
//! The client never consults its own substitution table: the host has
//! already translated every key before sending it.

use std::sync::Arc;

use keyrelay_core::WireMessage;
use thiserror::Error;
use tracing::debug;

/// Error type for key simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("platform error: {0}")]
    Platform(String),
}

/// Platform-agnostic keystroke injection.
///
/// Implementations may silently do nothing on platforms without an input
/// injection API.
pub trait KeySimulator: Send + Sync {
    /// Simulates one press of `key` on the local machine.
    fn simulate_key_press(&self, key: char) -> Result<(), SimulationError>;
}

/// What the client did with one decoded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Simulated(char),
    /// Announces are only meaningful to a host.
    Ignored,
}

/// The Render Keys use case.
pub struct RenderKeysUseCase {
    simulator: Arc<dyn KeySimulator>,
}

impl RenderKeysUseCase {
    /// Creates a new use case with the given simulator.
    pub fn new(simulator: Arc<dyn KeySimulator>) -> Self {
        Self { simulator }
    }

    /// Handles one decoded message from the host.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError`] if the simulator reports a failure.
    pub fn handle_message(&self, msg: WireMessage) -> Result<RenderOutcome, SimulationError> {
        match msg {
            WireMessage::KeyEvent(key) => {
                debug!("simulating key press {key:?}");
                self.simulator.simulate_key_press(key)?;
                Ok(RenderOutcome::Simulated(key))
            }
            WireMessage::Announce(addr) => {
                debug!("ignoring announce from {addr} on a client");
                Ok(RenderOutcome::Ignored)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use keyrelay_core::PeerAddress;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSimulator {
        pressed: Mutex<Vec<char>>,
        should_fail: bool,
    }

    impl KeySimulator for RecordingSimulator {
        fn simulate_key_press(&self, key: char) -> Result<(), SimulationError> {
            if self.should_fail {
                return Err(SimulationError::Platform("injected failure".to_string()));
            }
            self.pressed.lock().unwrap().push(key);
            Ok(())
        }
    }

    #[test]
    fn test_key_event_is_simulated_unchanged() {
        // Arrange
        let sim = Arc::new(RecordingSimulator::default());
        let uc = RenderKeysUseCase::new(sim.clone());

        // Act
        let outcome = uc.handle_message(WireMessage::KeyEvent('z')).expect("simulate");

        // Assert
        assert_eq!(outcome, RenderOutcome::Simulated('z'));
        assert_eq!(*sim.pressed.lock().unwrap(), vec!['z']);
    }

    #[test]
    fn test_announce_is_ignored_on_client() {
        let sim = Arc::new(RecordingSimulator::default());
        let uc = RenderKeysUseCase::new(sim.clone());

        let outcome = uc
            .handle_message(WireMessage::Announce(PeerAddress::new(Ipv4Addr::LOCALHOST)))
            .expect("no error");

        assert_eq!(outcome, RenderOutcome::Ignored);
        assert!(sim.pressed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_simulator_failure_is_propagated() {
        let sim = Arc::new(RecordingSimulator { should_fail: true, ..Default::default() });
        let uc = RenderKeysUseCase::new(sim);

        let result = uc.handle_message(WireMessage::KeyEvent('a'));

        assert!(matches!(result, Err(SimulationError::Platform(_))));
    }

    #[test]
    fn test_keys_are_simulated_in_arrival_order() {
        let sim = Arc::new(RecordingSimulator::default());
        let uc = RenderKeysUseCase::new(sim.clone());

        for key in ['h', 'i', '!'] {
            uc.handle_message(WireMessage::KeyEvent(key)).expect("simulate");
        }

        assert_eq!(*sim.pressed.lock().unwrap(), vec!['h', 'i', '!']);
    }
}
