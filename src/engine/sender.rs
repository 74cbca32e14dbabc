//! Synthetic output with bookkeeping of which keys are currently held down by us.

use std::fmt;
use std::io;

use keylayer_parser::keys::{vk_to_str, VirtualKey};

use crate::oskbd::{Btn, KbdOut};

/// One synthetic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEvent {
    Press(VirtualKey),
    Release(VirtualKey),
    BtnDown(Btn),
    BtnUp(Btn),
    MoveMouse(i32, i32),
}

impl OutputEvent {
    fn send(self, out: &mut KbdOut) -> Result<(), io::Error> {
        match self {
            OutputEvent::Press(vk) => out.press_key(vk),
            OutputEvent::Release(vk) => out.release_key(vk),
            OutputEvent::BtnDown(btn) => out.click_btn(btn),
            OutputEvent::BtnUp(btn) => out.release_btn(btn),
            OutputEvent::MoveMouse(x, y) => out.set_mouse(x, y),
        }
    }
}

impl fmt::Display for OutputEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutputEvent::Press(vk) => write!(f, "↓{}", vk_to_str(*vk)),
            OutputEvent::Release(vk) => write!(f, "↑{}", vk_to_str(*vk)),
            OutputEvent::BtnDown(btn) => write!(f, "mouse ↓{btn}"),
            OutputEvent::BtnUp(btn) => write!(f, "mouse ↑{btn}"),
            OutputEvent::MoveMouse(x, y) => write!(f, "cursor to {x},{y}"),
        }
    }
}

/// Send events that were held back with [`KeySender::defer_output`].
pub fn send_deferred(out: &mut KbdOut, events: &[OutputEvent]) {
    for ev in events {
        if let Err(e) = ev.send(out) {
            log::error!("could not send {ev}: {e}");
        }
    }
}

/// Emits synthetic key and mouse events. OS failures are logged and otherwise ignored; a lost
/// synthetic event must never take the hook down with it.
pub struct KeySender {
    pub kbd_out: KbdOut,
    /// Keys sent down and not yet sent up, oldest first.
    pressed: Vec<VirtualKey>,
    /// While set, events are queued here instead of reaching `kbd_out`.
    deferred: Option<Vec<OutputEvent>>,
}

impl KeySender {
    pub fn new(kbd_out: KbdOut) -> Self {
        Self {
            kbd_out,
            pressed: vec![],
            deferred: None,
        }
    }

    /// Queue output instead of sending it, until [`KeySender::take_deferred`]. Used off the
    /// hook thread: `SendInput` must not run while the engine lock is held there, or the hook
    /// waiting on that lock cannot see the injected events.
    pub fn defer_output(&mut self) {
        self.deferred.get_or_insert_with(Vec::new);
    }

    /// Stop deferring and return what was queued.
    pub fn take_deferred(&mut self) -> Vec<OutputEvent> {
        self.deferred.take().unwrap_or_default()
    }

    fn emit(&mut self, ev: OutputEvent) {
        if let Some(queue) = self.deferred.as_mut() {
            queue.push(ev);
            return;
        }
        if let Err(e) = ev.send(&mut self.kbd_out) {
            log::error!("could not send {ev}: {e}");
        }
    }

    pub fn pressed_keys(&self) -> &[VirtualKey] {
        &self.pressed
    }

    pub fn is_pressed(&self, vk: VirtualKey) -> bool {
        self.pressed.contains(&vk)
    }

    pub fn press(&mut self, vk: VirtualKey) {
        log::debug!("send ↓{}", vk_to_str(vk));
        self.emit(OutputEvent::Press(vk));
        if !self.pressed.contains(&vk) {
            self.pressed.push(vk);
        }
    }

    pub fn release(&mut self, vk: VirtualKey) {
        log::debug!("send ↑{}", vk_to_str(vk));
        self.emit(OutputEvent::Release(vk));
        self.pressed.retain(|k| *k != vk);
    }

    pub fn press_all(&mut self, keys: &[VirtualKey]) {
        for vk in keys {
            self.press(*vk);
        }
    }

    /// Release in reverse order of `keys`.
    pub fn release_all_of(&mut self, keys: &[VirtualKey]) {
        for vk in keys.iter().rev() {
            self.release(*vk);
        }
    }

    /// Modifiers down, keys down in order, keys up in reverse, modifiers up in reverse.
    pub fn chord(&mut self, modifiers: &[VirtualKey], keys: &[VirtualKey]) {
        self.press_all(modifiers);
        self.press_all(keys);
        self.release_all_of(keys);
        self.release_all_of(modifiers);
    }

    pub fn tap(&mut self, vk: VirtualKey) {
        self.chord(&[], &[vk]);
    }

    /// Release every key we still hold, newest first.
    pub fn release_all(&mut self) {
        if self.pressed.is_empty() {
            return;
        }
        log::info!(
            "releasing held keys: {}",
            self.pressed
                .iter()
                .map(|vk| vk_to_str(*vk))
                .collect::<Vec<_>>()
                .join(" ")
        );
        let held = std::mem::take(&mut self.pressed);
        for vk in held.into_iter().rev() {
            self.emit(OutputEvent::Release(vk));
        }
    }

    pub fn set_cursor(&mut self, x: i32, y: i32) {
        self.emit(OutputEvent::MoveMouse(x, y));
    }

    pub fn cursor_pos(&self) -> Option<(i32, i32)> {
        match self.kbd_out.cursor_pos() {
            Ok(p) => Some(p),
            Err(e) => {
                log::warn!("could not read the cursor position: {e}");
                None
            }
        }
    }

    pub fn click(&mut self, btn: Btn) {
        self.emit(OutputEvent::BtnDown(btn));
        self.emit(OutputEvent::BtnUp(btn));
    }
}
