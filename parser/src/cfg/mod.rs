//! The remap configuration: layers of key bindings, global timing settings and macros.
//!
//! A configuration is a JSON document shaped like:
//!
//! ```json
//! {
//!   "layers": [
//!     { "id": "base", "bindings": { "65": [ { "trigger": "tap",
//!         "action": { "type": "remap", "keys": [66] } } ] } }
//!   ],
//!   "globalSettings": { "defaultHoldThresholdMs": 200, "defaultTapIntervalMs": 300 },
//!   "macros": []
//! }
//! ```
//!
//! Loading is lenient. Problems that only affect a single binding are logged and left for the
//! engine to treat as no-ops; only malformed JSON is an error.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::keys::*;

mod action;
pub use action::*;

mod error;
pub use error::*;

mod store;
pub use store::*;

mod validate;
pub use validate::*;


pub const BASE_LAYER_ID: &str = "base";
pub const DEFAULT_HOLD_THRESHOLD_MS: u64 = 200;
pub const DEFAULT_TAP_INTERVAL_MS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    #[serde(default = "default_hold_threshold")]
    pub default_hold_threshold_ms: u64,
    #[serde(default = "default_tap_interval")]
    pub default_tap_interval_ms: u64,
}

fn default_hold_threshold() -> u64 {
    DEFAULT_HOLD_THRESHOLD_MS
}

fn default_tap_interval() -> u64 {
    DEFAULT_TAP_INTERVAL_MS
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            default_hold_threshold_ms: DEFAULT_HOLD_THRESHOLD_MS,
            default_tap_interval_ms: DEFAULT_TAP_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: String,
    #[serde(default)]
    pub bindings: BTreeMap<VirtualKey, Vec<KeyBinding>>,
    /// Modifiers held for as long as the layer is momentarily active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_modifiers: Option<ModifierSet>,
    /// Extra keys held for as long as the layer is momentarily active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_keys: Option<Vec<VirtualKey>>,
}

impl Layer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bindings: BTreeMap::new(),
            default_modifiers: None,
            active_keys: None,
        }
    }

    pub fn binding(&self, vk: VirtualKey, trigger: Trigger) -> Option<&KeyBinding> {
        self.bindings
            .get(&vk)?
            .iter()
            .find(|b| b.trigger == trigger)
    }

    /// Insert a binding, replacing any existing binding with the same trigger.
    pub fn set_binding(&mut self, vk: VirtualKey, binding: KeyBinding) {
        let slot = self.bindings.entry(vk).or_default();
        match slot.iter_mut().find(|b| b.trigger == binding.trigger) {
            Some(existing) => *existing = binding,
            None => slot.push(binding),
        }
    }

    pub fn unset_binding(&mut self, vk: VirtualKey, trigger: Trigger) -> Option<KeyBinding> {
        let slot = self.bindings.get_mut(&vk)?;
        let idx = slot.iter().position(|b| b.trigger == trigger)?;
        let removed = slot.remove(idx);
        if slot.is_empty() {
            self.bindings.remove(&vk);
        }
        Some(removed)
    }

    /// Keys pressed when the layer becomes momentarily active: modifiers first, then the
    /// active keys, without duplicates.
    pub fn held_keys(&self) -> Vec<VirtualKey> {
        let mut keys = self
            .default_modifiers
            .map(|m| m.keys())
            .unwrap_or_default();
        for vk in self.active_keys.iter().flatten() {
            if !keys.contains(vk) {
                keys.push(*vk);
            }
        }
        keys
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemapConfig {
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub global_settings: GlobalSettings,
    #[serde(default)]
    pub macros: Vec<MacroDef>,
}

impl Default for RemapConfig {
    fn default() -> Self {
        Self {
            layers: vec![Layer::new(BASE_LAYER_ID)],
            global_settings: GlobalSettings::default(),
            macros: vec![],
        }
    }
}

/// Parse a configuration from a JSON file.
pub fn new_from_file(p: &Path) -> MResult<RemapConfig> {
    let text = std::fs::read_to_string(p).map_err(|source| CfgError::Io {
        path: p.display().to_string(),
        source,
    })?;
    log::info!("loading configuration from {}", p.display());
    new_from_str(&text)
}

/// Parse a configuration from JSON text.
pub fn new_from_str(cfg_text: &str) -> MResult<RemapConfig> {
    let mut cfg: RemapConfig = serde_json::from_str(cfg_text).map_err(CfgError::from)?;
    cfg.normalize();
    for warning in cfg.check() {
        log::warn!("{warning}");
    }
    Ok(cfg)
}

impl RemapConfig {
    /// Repair structural problems that would otherwise break the base-layer invariant.
    fn normalize(&mut self) {
        if self.layer(BASE_LAYER_ID).is_none() {
            log::warn!("configuration has no \"{BASE_LAYER_ID}\" layer, adding an empty one");
            self.layers.insert(0, Layer::new(BASE_LAYER_ID));
        }
        let mut seen: Vec<String> = vec![];
        self.layers.retain(|l| {
            if seen.contains(&l.id) {
                log::warn!("duplicate layer \"{}\" ignored", l.id);
                false
            } else {
                seen.push(l.id.clone());
                true
            }
        });
        for layer in self.layers.iter_mut() {
            for (vk, slot) in layer.bindings.iter_mut() {
                let mut deduped: Vec<KeyBinding> = Vec::with_capacity(slot.len());
                for b in slot.drain(..) {
                    if let Some(pos) = deduped.iter().position(|d| d.trigger == b.trigger) {
                        log::warn!(
                            "layer \"{}\" key {}: duplicate {} binding, keeping the last one",
                            layer.id,
                            vk_to_str(*vk),
                            b.trigger
                        );
                        deduped[pos] = b;
                    } else {
                        deduped.push(b);
                    }
                }
                *slot = deduped;
            }
            layer.bindings.retain(|_, slot| !slot.is_empty());
        }
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn layer_names(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.id.clone()).collect()
    }

    pub fn get_macro(&self, id: &str) -> Option<&MacroDef> {
        self.macros.iter().find(|m| m.id == id)
    }

    pub fn add_binding(&mut self, layer_id: &str, vk: VirtualKey, binding: KeyBinding) -> Result<()> {
        let layer = self
            .layer_mut(layer_id)
            .ok_or_else(|| CfgError::UnknownLayer(layer_id.into()))?;
        if matches!(binding.action, Action::LayerMomentary { .. }) && binding.trigger != Trigger::Hold
        {
            log::warn!(
                "layer \"{layer_id}\" key {}: layerMomentary only runs on hold",
                vk_to_str(vk)
            );
        }
        layer.set_binding(vk, binding);
        Ok(())
    }

    pub fn remove_binding(&mut self, layer_id: &str, vk: VirtualKey, trigger: Trigger) -> Result<KeyBinding> {
        let layer = self
            .layer_mut(layer_id)
            .ok_or_else(|| CfgError::UnknownLayer(layer_id.into()))?;
        layer
            .unset_binding(vk, trigger)
            .ok_or_else(|| CfgError::MissingBinding {
                layer: layer_id.into(),
                key: vk_to_str(vk),
                trigger: trigger.to_string(),
            })
    }

    pub fn add_layer(&mut self, layer: Layer) -> Result<()> {
        if self.layer(&layer.id).is_some() {
            return Err(CfgError::DuplicateLayer(layer.id));
        }
        self.layers.push(layer);
        Ok(())
    }

    /// Remove a layer and return it. The base layer is never removed: asking for it changes
    /// nothing and returns `None`.
    pub fn remove_layer(&mut self, layer_id: &str) -> Result<Option<Layer>> {
        if layer_id == BASE_LAYER_ID {
            log::debug!("ignoring removal of the base layer");
            return Ok(None);
        }
        let idx = self
            .layers
            .iter()
            .position(|l| l.id == layer_id)
            .ok_or_else(|| CfgError::UnknownLayer(layer_id.into()))?;
        Ok(Some(self.layers.remove(idx)))
    }

    /// Add or replace a macro. Rejected if the reference graph would contain a cycle.
    pub fn add_macro(&mut self, def: MacroDef) -> Result<()> {
        let mut candidate = self.macros.clone();
        match candidate.iter_mut().find(|m| m.id == def.id) {
            Some(existing) => *existing = def.clone(),
            None => candidate.push(def.clone()),
        }
        if let Some(path) = find_macro_cycle(&candidate, &def.id) {
            return Err(CfgError::MacroCycle {
                id: def.id,
                path: path.join(" -> "),
            });
        }
        self.macros = candidate;
        Ok(())
    }

    pub fn remove_macro(&mut self, id: &str) -> Option<MacroDef> {
        let idx = self.macros.iter().position(|m| m.id == id)?;
        Some(self.macros.remove(idx))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
