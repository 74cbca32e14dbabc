//! The stack of active layers.
//!
//! Index 0 always holds the base layer. The last element has the highest priority when
//! resolving bindings. Every change is announced to the optional observer channel with a
//! snapshot of the new stack.

use std::sync::mpsc::{SyncSender as Sender, TrySendError};

use keylayer_parser::cfg::BASE_LAYER_ID;
use keylayer_tcp_protocol::ServerMessage;

#[derive(Debug)]
pub struct LayerStack {
    stack: Vec<String>,
    observer: Option<Sender<ServerMessage>>,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStack {
    pub fn new() -> Self {
        Self {
            stack: vec![BASE_LAYER_ID.to_string()],
            observer: None,
        }
    }

    pub fn set_observer(&mut self, tx: Option<Sender<ServerMessage>>) {
        self.observer = tx;
    }

    pub fn as_slice(&self) -> &[String] {
        &self.stack
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.stack.clone()
    }

    pub fn top(&self) -> &str {
        self.stack.last().map(String::as_str).unwrap_or(BASE_LAYER_ID)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.stack.iter().any(|l| l == id)
    }

    /// Layers from highest to lowest priority.
    pub fn resolution_order(&self) -> impl Iterator<Item = &str> {
        self.stack.iter().rev().map(String::as_str)
    }

    /// Append `id` unless it is already active.
    pub fn push(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.stack.push(id.to_string());
        self.changed();
        true
    }

    /// Remove `id` from wherever it sits. The base layer is never removed.
    pub fn pop(&mut self, id: &str) -> bool {
        match self.stack.iter().position(|l| l == id) {
            Some(0) | None => false,
            Some(idx) => {
                self.stack.remove(idx);
                self.changed();
                true
            }
        }
    }

    pub fn toggle(&mut self, id: &str) {
        if self.contains(id) {
            self.pop(id);
        } else {
            self.push(id);
        }
    }

    /// Replace the whole stack so that `id` is the only active layer above base.
    pub fn set_layer(&mut self, id: &str) {
        let mut stack = vec![BASE_LAYER_ID.to_string()];
        if id != BASE_LAYER_ID {
            stack.push(id.to_string());
        }
        if stack != self.stack {
            self.stack = stack;
            self.changed();
        }
    }

    pub fn reset_to_layer(&mut self, id: &str) {
        self.set_layer(id);
    }

    fn changed(&self) {
        log::info!("layer stack: {}", self.stack.join(" > "));
        let Some(tx) = &self.observer else {
            return;
        };
        match tx.try_send(ServerMessage::LayerChange {
            stack: self.snapshot(),
        }) {
            Ok(_) => {}
            Err(TrySendError::Full(_)) => log::warn!("layer change notification dropped, channel full"),
            Err(TrySendError::Disconnected(_)) => log::debug!("no layer change listener"),
        }
    }
}
