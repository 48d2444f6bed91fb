//! Raw-mode terminal keystroke source.
//!
//! Puts the terminal into raw mode so every key press is delivered as soon as
//! it is typed, without echo and without waiting for Enter.  Keys are read on
//! a dedicated thread with `crossterm::event`; the thread polls with a short
//! timeout so [`KeySource::stop`] is noticed without another key press.
//! `stop` joins the thread, so cooked mode is back once it returns.
//!
//! Raw mode swallows the terminal's interrupt signal, so Ctrl+C and Ctrl+D
//! end the stream instead.  Sessions treat that like the quit key.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{CaptureError, KeySource};

const TERMINAL_CAPACITY: usize = 256;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What one terminal event means to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Forward this character.
    Key(char),
    /// End the stream.
    End,
    /// Not a typed character (release, arrow key, resize, ...).
    Ignore,
}

/// Classifies one terminal event.
pub fn classify(event: &Event) -> KeyAction {
    match event {
        Event::Key(key) => classify_key(key),
        _ => KeyAction::Ignore,
    }
}

fn classify_key(key: &KeyEvent) -> KeyAction {
    if key.kind == KeyEventKind::Release {
        return KeyAction::Ignore;
    }
    match key.code {
        KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            KeyAction::End
        }
        KeyCode::Char(c) => KeyAction::Key(c),
        KeyCode::Enter => KeyAction::Key('\r'),
        KeyCode::Tab => KeyAction::Key('\t'),
        _ => KeyAction::Ignore,
    }
}

/// A [`KeySource`] reading single key presses from a raw-mode terminal.
#[derive(Debug, Default)]
pub struct TerminalKeySource {
    started: AtomicBool,
    stopped: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl TerminalKeySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeySource for TerminalKeySource {
    fn start(&self) -> Result<mpsc::Receiver<char>, CaptureError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::AlreadyStarted);
        }

        let raw = RawModeGuard::enable()?;
        let (tx, rx) = mpsc::channel(TERMINAL_CAPACITY);
        let stopped = Arc::clone(&self.stopped);

        let handle = std::thread::Builder::new()
            .name("keyrelay-terminal".to_string())
            .spawn(move || read_loop(raw, tx, stopped))
            .map_err(|e| CaptureError::StartFailed(e.to_string()))?;
        *self.reader.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        debug!("terminal key source started");
        Ok(rx)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let handle = self.reader.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("terminal reader thread panicked");
            }
        }
    }
}

/// Restores cooked mode when the reader thread exits.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self, CaptureError> {
        terminal::enable_raw_mode()
            .map(|()| Self)
            .map_err(|e| CaptureError::StartFailed(format!("raw mode: {e}")))
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("failed to restore terminal mode: {e}");
        }
    }
}

fn read_loop(_raw: RawModeGuard, tx: mpsc::Sender<char>, stopped: Arc<AtomicBool>) {
    while !stopped.load(Ordering::SeqCst) {
        match event::poll(POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                warn!("failed to poll terminal: {e}");
                break;
            }
        }
        let event = match event::read() {
            Ok(event) => event,
            Err(e) => {
                warn!("failed to read terminal: {e}");
                break;
            }
        };
        match classify(&event) {
            KeyAction::Key(key) => {
                if tx.blocking_send(key).is_err() {
                    // Session gone.
                    break;
                }
            }
            KeyAction::End => break,
            KeyAction::Ignore => {}
        }
    }
    debug!("terminal key source ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_single_char_press_is_forwarded_immediately() {
        assert_eq!(classify(&press(KeyCode::Char('a'))), KeyAction::Key('a'));
    }

    #[test]
    fn test_shifted_and_non_ascii_chars_are_forwarded() {
        let shifted = Event::Key(KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT));

        assert_eq!(classify(&shifted), KeyAction::Key('A'));
        assert_eq!(classify(&press(KeyCode::Char('é'))), KeyAction::Key('é'));
    }

    #[test]
    fn test_key_release_is_ignored() {
        let release = Event::Key(KeyEvent::new_with_kind(
            KeyCode::Char('a'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        ));

        assert_eq!(classify(&release), KeyAction::Ignore);
    }

    #[test]
    fn test_ctrl_c_and_ctrl_d_end_the_stream() {
        for c in ['c', 'd'] {
            let event = Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
            assert_eq!(classify(&event), KeyAction::End);
        }
    }

    #[test]
    fn test_enter_and_tab_map_to_control_chars() {
        assert_eq!(classify(&press(KeyCode::Enter)), KeyAction::Key('\r'));
        assert_eq!(classify(&press(KeyCode::Tab)), KeyAction::Key('\t'));
    }

    #[test]
    fn test_navigation_keys_and_resize_are_ignored() {
        assert_eq!(classify(&press(KeyCode::Left)), KeyAction::Ignore);
        assert_eq!(classify(&Event::Resize(80, 24)), KeyAction::Ignore);
    }
}
