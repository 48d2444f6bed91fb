//! Windows key injection via the SendInput API.
//!
//! Each character is sent as Unicode keyboard input (`KEYEVENTF_UNICODE`),
//! one key-down and one key-up per UTF-16 code unit, so the character is
//! typed as-is regardless of the active keyboard layout.

use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    KEYEVENTF_UNICODE, VIRTUAL_KEY,
};

use crate::application::render_keys::{KeySimulator, SimulationError};

/// A [`KeySimulator`] that injects keystrokes into the focused window.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendInputKeySimulator;

impl SendInputKeySimulator {
    pub fn new() -> Self {
        Self
    }
}

impl KeySimulator for SendInputKeySimulator {
    fn simulate_key_press(&self, key: char) -> Result<(), SimulationError> {
        let inputs = unicode_inputs(key);
        // SAFETY: inputs is a slice of fully initialised KEYBDINPUT structures
        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            return Err(SimulationError::Platform(format!(
                "SendInput injected {sent} of {} events for {key:?}",
                inputs.len()
            )));
        }
        Ok(())
    }
}

fn unicode_inputs(key: char) -> Vec<INPUT> {
    let mut units = [0u16; 2];
    key.encode_utf16(&mut units)
        .iter()
        .flat_map(|&unit| {
            [
                unicode_input(unit, KEYEVENTF_UNICODE),
                unicode_input(unit, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP),
            ]
        })
        .collect()
}

fn unicode_input(unit: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(0),
                wScan: unit,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}
