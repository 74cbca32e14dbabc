use serde::{Deserialize, Serialize};

use crate::keys::*;

pub const DEFAULT_REPEAT_DELAY_MS: u64 = 500;
pub const DEFAULT_REPEAT_INTERVAL_MS: u64 = 100;

/// What a physical key press was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    Tap,
    Hold,
    DoubleTap,
}

impl Trigger {
    pub const ALL: [Trigger; 3] = [Trigger::Tap, Trigger::Hold, Trigger::DoubleTap];
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Trigger::Tap => "tap",
            Trigger::Hold => "hold",
            Trigger::DoubleTap => "doubleTap",
        })
    }
}

impl std::str::FromStr for Trigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tap" => Ok(Trigger::Tap),
            "hold" => Ok(Trigger::Hold),
            "doubleTap" | "doubletap" | "double-tap" => Ok(Trigger::DoubleTap),
            _ => Err(format!("unknown trigger: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifierSet {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub win: bool,
}

impl ModifierSet {
    /// Modifier keys in the order they are pressed.
    pub fn keys(&self) -> Vec<VirtualKey> {
        [
            (self.ctrl, VK_CONTROL),
            (self.shift, VK_SHIFT),
            (self.alt, VK_MENU),
            (self.win, VK_LWIN),
        ]
        .into_iter()
        .filter_map(|(on, vk)| on.then_some(vk))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.shift || self.alt || self.win)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

fn default_click_count() -> u32 {
    1
}

/// The effect of a resolved trigger. Exactly one variant per binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    #[serde(rename_all = "camelCase")]
    Remap {
        keys: Vec<VirtualKey>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        modifiers: Option<ModifierSet>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repeat: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repeat_delay_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repeat_interval_ms: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    LayerToggle { layer_id: String },
    #[serde(rename_all = "camelCase")]
    LayerMomentary { layer_id: String },
    MouseMove { x: i32, y: i32 },
    #[serde(rename_all = "camelCase")]
    MouseClick {
        x: i32,
        y: i32,
        #[serde(default)]
        button: MouseButton,
        #[serde(default = "default_click_count")]
        click_count: u32,
    },
    #[serde(rename_all = "camelCase")]
    CursorReturn { delay_ms: u64 },
    #[serde(rename_all = "camelCase")]
    Delay { delay_ms: u64 },
    #[serde(rename_all = "camelCase")]
    Macro { macro_id: String },
    None,
}

impl Action {
    /// Shorthand for a plain key substitution.
    pub fn remap(keys: impl Into<Vec<VirtualKey>>) -> Self {
        Action::Remap {
            keys: keys.into(),
            modifiers: None,
            repeat: None,
            repeat_delay_ms: None,
            repeat_interval_ms: None,
        }
    }

    pub fn is_remap(&self) -> bool {
        matches!(self, Action::Remap { .. })
    }

    /// Layer this action refers to, if any.
    pub fn layer_ref(&self) -> Option<&str> {
        match self {
            Action::LayerToggle { layer_id } | Action::LayerMomentary { layer_id } => {
                Some(layer_id)
            }
            _ => None,
        }
    }

    pub fn macro_ref(&self) -> Option<&str> {
        match self {
            Action::Macro { macro_id } => Some(macro_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyBinding {
    pub trigger: Trigger,
    pub action: Action,
    /// Overrides the hold threshold of a Hold binding or the interval of a DoubleTap binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_ms: Option<u64>,
}

impl KeyBinding {
    pub fn new(trigger: Trigger, action: Action) -> Self {
        Self {
            trigger,
            action,
            timing_ms: None,
        }
    }

    pub fn with_timing(mut self, ms: u64) -> Self {
        self.timing_ms = Some(ms);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub actions: Vec<Action>,
}
