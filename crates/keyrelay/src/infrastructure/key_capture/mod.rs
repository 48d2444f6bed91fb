//! Keystroke sources for the host and for the client's quit key.
//!
//! A [`KeySource`] produces typed characters on a Tokio channel.  The
//! channel closing means the source has ended; sessions treat that the same
//! as the quit key.
//!
//! # Implementations
//!
//! - **`terminal`** – Raw-mode terminal, one key press at a time.
//! - **`stdin`** – Line reader used when standard input is not a terminal,
//!   e.g. piped input.
//! - **`mock`** – Lets tests inject characters directly.
//!
//! Both real sources read on a dedicated OS thread, since blocking reads
//! must stay off the Tokio runtime.

use std::io::IsTerminal;

use thiserror::Error;
use tokio::sync::mpsc;

pub mod mock;
pub mod stdin;
pub mod terminal;

pub use mock::MockKeySource;
pub use stdin::StdinKeySource;
pub use terminal::TerminalKeySource;

/// Error type for keystroke sources.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("key source has already been started")]
    AlreadyStarted,
    #[error("failed to start key capture: {0}")]
    StartFailed(String),
}

/// Trait abstracting keystroke production.
pub trait KeySource: Send + Sync {
    /// Starts the source and returns a receiver for typed characters.
    fn start(&self) -> Result<mpsc::Receiver<char>, CaptureError>;
    /// Stops producing characters; the receiver then sees end-of-stream.
    fn stop(&self);
}

/// Picks the keyboard source for this process: raw single keys when
/// standard input is a terminal, lines otherwise.
pub fn keyboard_source() -> Box<dyn KeySource> {
    if std::io::stdin().is_terminal() {
        Box::new(TerminalKeySource::new())
    } else {
        Box::new(StdinKeySource::new())
    }
}
