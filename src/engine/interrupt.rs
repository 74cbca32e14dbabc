//! Early resolution of undecided keys when another key is pressed.
//!
//! When B goes down while A is still undecided, A's outcome has to be fixed before B's
//! bindings are resolved: a momentary layer on A must be active for B, and a remap on A must
//! reach the OS before B does.

use super::*;

impl RemapEngine {
    /// Resolve every undecided key except `incoming`. Returns whether anything was resolved.
    pub(super) fn resolve_interrupts(&mut self, incoming: VirtualKey) -> bool {
        let mut resolved = false;

        // A different key disambiguates a pending double tap as a single tap.
        for vk in self.keys.pending_tap_keys(incoming) {
            log::debug!("{} interrupted while waiting for a double tap", vk_to_str(vk));
            self.flush_pending_tap(vk);
            resolved = true;
        }

        for vk in self.keys.pending_hold_keys(incoming) {
            if self.momentary.contains_key(&vk) {
                continue;
            }
            let Some(bindings) = self.keys.bindings(vk).cloned() else {
                continue;
            };
            if let Some(Action::LayerMomentary { layer_id }) = bindings.hold.as_ref().map(|b| &b.action)
            {
                if self.keys.force_hold(vk, &mut self.timers) {
                    log::debug!("{} interrupted, activating {layer_id} now", vk_to_str(vk));
                    self.flush_pending_tap(vk);
                    self.activate_momentary(vk, layer_id);
                    resolved = true;
                }
                continue;
            }
            let remap = [bindings.hold.as_ref(), bindings.tap.as_ref()]
                .into_iter()
                .flatten()
                .map(|b| &b.action)
                .find(|a| a.is_remap());
            if let Some(Action::Remap { keys, modifiers, .. }) = remap {
                let mut forced = modifiers.map(|m| m.keys()).unwrap_or_default();
                forced.extend(keys.iter().copied());
                log::debug!("{} interrupted, holding its remap", vk_to_str(vk));
                self.flush_pending_tap(vk);
                self.sender.press_all(&forced);
                self.keys.force_keys(vk, forced, &mut self.timers);
                resolved = true;
            }
        }
        resolved
    }
}
