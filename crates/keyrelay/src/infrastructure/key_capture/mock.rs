//! Mock key source for tests.
//!
//! Allows tests to inject characters as if typed, without a terminal.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, Sender};

use super::{CaptureError, KeySource};

/// Buffer size for injected keys.
const MOCK_CAPACITY: usize = 64;

/// A [`KeySource`] that emits whatever tests inject.
#[derive(Clone, Default)]
pub struct MockKeySource {
    sender: Arc<Mutex<Option<Sender<char>>>>,
}

impl MockKeySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects a character, as if typed.
    ///
    /// Panics if `start()` has not been called, after `stop()`, or when the
    /// buffer is full.
    pub fn inject(&self, key: char) {
        let guard = self.sender.lock().expect("lock poisoned");
        match *guard {
            Some(ref sender) => sender
                .try_send(key)
                .expect("receiver dropped or buffer full"),
            None => panic!("MockKeySource::inject called before start()"),
        }
    }
}

impl KeySource for MockKeySource {
    fn start(&self) -> Result<mpsc::Receiver<char>, CaptureError> {
        let mut guard = self.sender.lock().expect("lock poisoned");
        if guard.is_some() {
            return Err(CaptureError::AlreadyStarted);
        }
        let (tx, rx) = mpsc::channel(MOCK_CAPACITY);
        *guard = Some(tx);
        Ok(rx)
    }

    fn stop(&self) {
        // Dropping the sender ends the stream.
        *self.sender.lock().expect("lock poisoned") = None;
    }
}
