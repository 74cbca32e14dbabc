//! Platform specific code for low level keyboard read/write.
//!
//! Input always comes from the Windows low-level keyboard hook. Output goes through
//! `SendInput`, except in tests, with the `simulated_output` feature, or on other operating
//! systems, where the simulated backend records what would have been sent.

use std::fmt;

use keylayer_parser::keys::{vk_to_str, VirtualKey};

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use windows::*;

#[cfg(any(test, feature = "simulated_output", not(target_os = "windows")))]
mod simulated;
#[cfg(any(test, feature = "simulated_output", not(target_os = "windows")))]
pub use simulated::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyValue {
    Release = 0,
    Press = 1,
    Repeat = 2,
}

impl From<bool> for KeyValue {
    fn from(up: bool) -> Self {
        match up {
            true => Self::Release,
            false => Self::Press,
        }
    }
}

impl From<KeyValue> for bool {
    fn from(val: KeyValue) -> Self {
        matches!(val, KeyValue::Release)
    }
}

/// A decoded physical (or injected) key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: VirtualKey,
    pub value: KeyValue,
    /// Produced by `SendInput`, ours or another program's.
    pub injected: bool,
}

impl KeyEvent {
    pub fn new(code: VirtualKey, value: KeyValue) -> Self {
        Self {
            code,
            value,
            injected: false,
        }
    }

    pub fn injected(code: VirtualKey, value: KeyValue) -> Self {
        Self {
            code,
            value,
            injected: true,
        }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let direction = match self.value {
            KeyValue::Release => "↑",
            KeyValue::Press => "↓",
            KeyValue::Repeat => "⟳",
        };
        let injected = if self.injected { " (injected)" } else { "" };
        write!(f, "{direction}{}{injected}", vk_to_str(self.code))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Btn {
    Left,
    Right,
    Mid,
}

impl From<keylayer_parser::cfg::MouseButton> for Btn {
    fn from(b: keylayer_parser::cfg::MouseButton) -> Self {
        use keylayer_parser::cfg::MouseButton;
        match b {
            MouseButton::Left => Btn::Left,
            MouseButton::Right => Btn::Right,
            MouseButton::Middle => Btn::Mid,
        }
    }
}

impl fmt::Display for Btn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Btn::Left => "Left",
            Btn::Right => "Right",
            Btn::Mid => "Middle",
        })
    }
}
