//! keylayer TCP Protocol
//!
//! This crate defines the line-delimited JSON messages exchanged between TCP clients (usually
//! a configuration UI) and the keylayer daemon. Bindings and actions are carried as plain JSON
//! values in the same shape as the configuration file, so this crate does not depend on the
//! configuration model.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAction {
    Press,
    Release,
    Repeat,
}

/// Messages sent from the server to connected clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// The active layer stack changed. The last element has the highest priority.
    LayerChange {
        stack: Vec<String>,
    },
    /// A physical key event was observed by the hook. Injected events are not reported.
    KeyEvent {
        vk: u16,
        key: String,
        action: KeyAction,
    },
    LayerNames {
        names: Vec<String>,
    },
    LayerStack {
        stack: Vec<String>,
    },
    /// Bindings of one key on every layer that binds it.
    Bindings {
        vk: u16,
        layers: Vec<LayerBindings>,
    },
    /// The action a trigger resolves to through the current layer stack.
    Action {
        vk: u16,
        trigger: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        layer: Option<String>,
        action: Option<serde_json::Value>,
    },
    Error {
        msg: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerBindings {
    pub layer: String,
    pub bindings: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "status")]
pub enum ServerResponse {
    Ok,
    Error { msg: String },
}

impl ServerResponse {
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut msg = serde_json::to_vec(self).expect("ServerResponse should serialize");
        msg.push(b'\n');
        msg
    }
}

impl ServerMessage {
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut msg = serde_json::to_vec(self).expect("ServerMessage should serialize");
        msg.push(b'\n');
        msg
    }
}

/// Messages sent from clients to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    RequestLayerNames {},
    RequestLayerStack {},
    RequestBindings {
        vk: u16,
    },
    RequestAction {
        vk: u16,
        trigger: String,
    },
    PushLayer {
        layer: String,
    },
    PopLayer {
        layer: String,
    },
    ToggleLayer {
        layer: String,
    },
    /// Replace the stack with the base layer plus `new`.
    ChangeLayer {
        new: String,
    },
    /// `binding` has the configuration file shape: `{"trigger": ..., "action": {...}}`.
    AddBinding {
        layer: String,
        vk: u16,
        binding: serde_json::Value,
    },
    RemoveBinding {
        layer: String,
        vk: u16,
        trigger: String,
    },
    /// `layer` has the configuration file shape: `{"id": ..., "bindings": {...}}`.
    AddLayer {
        layer: serde_json::Value,
    },
    RemoveLayer {
        layer: String,
    },
    /// Release every key the daemon is synthetically holding down.
    ReleaseAll {},
}

impl FromStr for ClientMessage {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}
