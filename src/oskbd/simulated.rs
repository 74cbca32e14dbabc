//! Output that records what would be sent instead of doing anything OS-related.
//!
//! Every send becomes one token in [`SimOutputs::events`]. Time that passes between two sends
//! is recorded as a `t:<n>ms` token in front of the later one:
//!
//! ```text
//! t:200ms dn:Ctrl t:100ms up:Ctrl
//! ```

use std::io;

use keylayer_parser::keys::{vk_to_str, VirtualKey};

use super::*;

#[derive(Debug, Default)]
pub struct SimOutputs {
    pub events: Vec<String>,
    pending_ms: u64,
}

impl SimOutputs {
    fn push(&mut self, event: String) {
        if self.pending_ms > 0 {
            self.events.push(format!("t:{}ms", self.pending_ms));
            self.pending_ms = 0;
        }
        self.events.push(event);
    }

    /// Forget everything recorded so far, including time not yet attached to an event.
    pub fn clear(&mut self) {
        self.events.clear();
        self.pending_ms = 0;
    }

    pub fn to_ascii(&self) -> String {
        self.events.join(" ")
    }
}

/// Handle for "writing" keys.
#[derive(Debug, Default)]
pub struct KbdOut {
    pub outputs: SimOutputs,
    /// Makes every send fail, to exercise error paths.
    pub reject_sends: bool,
    cursor: (i32, i32),
}

impl KbdOut {
    pub fn new() -> Result<Self, io::Error> {
        Ok(Self::default())
    }

    fn check(&self) -> Result<(), io::Error> {
        if self.reject_sends {
            return Err(io::Error::other("simulated send failure"));
        }
        Ok(())
    }

    pub fn advance_ms(&mut self, ms: u64) {
        self.outputs.pending_ms += ms;
    }

    pub fn press_key(&mut self, key: VirtualKey) -> Result<(), io::Error> {
        self.check()?;
        self.outputs.push(format!("dn:{}", vk_to_str(key)));
        Ok(())
    }

    pub fn release_key(&mut self, key: VirtualKey) -> Result<(), io::Error> {
        self.check()?;
        self.outputs.push(format!("up:{}", vk_to_str(key)));
        Ok(())
    }

    pub fn click_btn(&mut self, btn: Btn) -> Result<(), io::Error> {
        self.check()?;
        self.outputs.push(format!("mdn:{btn}"));
        Ok(())
    }

    pub fn release_btn(&mut self, btn: Btn) -> Result<(), io::Error> {
        self.check()?;
        self.outputs.push(format!("mup:{btn}"));
        Ok(())
    }

    pub fn set_mouse(&mut self, x: i32, y: i32) -> Result<(), io::Error> {
        self.check()?;
        self.cursor = (x, y);
        self.outputs.push(format!("mv:{x},{y}"));
        Ok(())
    }

    pub fn cursor_pos(&self) -> Result<(i32, i32), io::Error> {
        Ok(self.cursor)
    }

    /// Record an event that was handed back to the OS untouched.
    pub fn log_passthrough(&mut self, event: &KeyEvent) {
        let dir = if bool::from(event.value) { "up" } else { "dn" };
        self.outputs
            .push(format!("pass:{dir}:{}", vk_to_str(event.code)));
    }
}
