//! Line-based keystroke source for non-interactive standard input.
//!
//! Standard input is read line by line on a dedicated thread; every
//! character of a line except the line terminator is forwarded.  End of
//! input closes the channel.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{CaptureError, KeySource};

const STDIN_CAPACITY: usize = 256;

/// A [`KeySource`] reading the process's standard input.
#[derive(Debug, Default)]
pub struct StdinKeySource {
    started: AtomicBool,
    stopped: Arc<AtomicBool>,
}

impl StdinKeySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeySource for StdinKeySource {
    fn start(&self) -> Result<mpsc::Receiver<char>, CaptureError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::AlreadyStarted);
        }

        let (tx, rx) = mpsc::channel(STDIN_CAPACITY);
        let stopped = Arc::clone(&self.stopped);

        std::thread::Builder::new()
            .name("keyrelay-stdin".to_string())
            .spawn(move || read_loop(tx, stopped))
            .map_err(|e| CaptureError::StartFailed(e.to_string()))?;

        debug!("stdin key source started");
        Ok(rx)
    }

    fn stop(&self) {
        // The reader thread notices at its next line; a pending read cannot
        // be interrupted.
        self.stopped.store(true, Ordering::SeqCst);
    }
}

fn read_loop(tx: mpsc::Sender<char>, stopped: Arc<AtomicBool>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        if stopped.load(Ordering::SeqCst) {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("failed to read standard input: {e}");
                break;
            }
        };
        for key in line.chars().filter(|c| *c != '\r' && *c != '\n') {
            if tx.blocking_send(key).is_err() {
                // Session gone.
                return;
            }
        }
    }
    debug!("stdin key source ended");
}
