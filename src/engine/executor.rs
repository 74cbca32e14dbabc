//! Runs resolved actions: key sends, layer changes, hold remaps and mouse operations.

use super::*;

/// Minimum spacing between repeats so a zero interval cannot starve the event loop.
const MIN_REPEAT_INTERVAL_MS: u64 = 1;

/// A remap started by a Hold trigger, active until the physical key is released.
#[derive(Debug)]
pub(super) struct HoldRemap {
    /// Keys sent down and not yet released. Empty for repeating remaps.
    held: Vec<VirtualKey>,
    modifiers: Vec<VirtualKey>,
    keys: Vec<VirtualKey>,
    repeat_timer: Option<timers::TimerId>,
    interval_ms: u64,
}

#[derive(Debug)]
pub(super) struct MomentaryLayer {
    pub(super) layer_id: String,
    /// Default modifiers and active keys pressed on activation.
    held: Vec<VirtualKey>,
}

impl RemapEngine {
    pub(super) fn execute(&mut self, vk: VirtualKey, trigger: Trigger, action: &Action) {
        log::debug!("{} {trigger}: {action:?}", vk_to_str(vk));
        match action {
            Action::Remap {
                keys,
                modifiers,
                repeat,
                repeat_delay_ms,
                repeat_interval_ms,
            } => {
                let mods = modifiers.map(|m| m.keys()).unwrap_or_default();
                if trigger == Trigger::Hold {
                    let repeat = repeat.unwrap_or(false).then(|| {
                        (
                            repeat_delay_ms.unwrap_or(DEFAULT_REPEAT_DELAY_MS),
                            repeat_interval_ms.unwrap_or(DEFAULT_REPEAT_INTERVAL_MS),
                        )
                    });
                    self.start_hold_remap(vk, mods, keys.clone(), repeat);
                } else {
                    self.sender.chord(&mods, keys);
                }
            }
            Action::LayerToggle { layer_id } => {
                if self.cfg.layer(layer_id).is_some() {
                    self.layers.toggle(layer_id);
                } else {
                    log::warn!("layerToggle: unknown layer \"{layer_id}\"");
                }
            }
            Action::LayerMomentary { layer_id } => {
                if trigger == Trigger::Hold {
                    self.activate_momentary(vk, layer_id);
                } else {
                    log::warn!("layerMomentary on {trigger} does nothing, it needs a hold");
                }
            }
            Action::MouseMove { x, y } => {
                self.save_cursor();
                self.sender.set_cursor(*x, *y);
            }
            Action::MouseClick {
                x,
                y,
                button,
                click_count,
            } => {
                self.save_cursor();
                self.sender.set_cursor(*x, *y);
                for _ in 0..*click_count {
                    self.sender.click(Btn::from(*button));
                }
            }
            Action::CursorReturn { delay_ms } => {
                if let Some(old) = self.cursor_return_timer.take() {
                    self.timers.cancel(old);
                }
                self.cursor_return_timer =
                    Some(self.timers.schedule(*delay_ms, TimerKind::CursorReturn));
            }
            Action::Delay { delay_ms } => {
                log::debug!("delay of {delay_ms}ms outside of a macro has nothing to wait for");
            }
            Action::Macro { macro_id } => self.start_macro(vk, macro_id),
            Action::None => {}
        }
    }

    /// Run a tap; `None` sends the physical key itself.
    pub(super) fn run_tap(&mut self, vk: VirtualKey, action: Option<&Action>) {
        match action {
            Some(action) => self.execute(vk, Trigger::Tap, action),
            None => self.sender.tap(vk),
        }
    }

    /// Run the deferred tap of `vk` now, if it has one.
    pub(super) fn flush_pending_tap(&mut self, vk: VirtualKey) {
        if let Some(pending) = self.keys.take_pending_tap(vk, &mut self.timers) {
            self.keys.forget_last_tap(vk);
            self.run_tap(vk, pending.action.as_ref());
        }
    }

    /// Undo whatever a Hold trigger on `vk` left active.
    pub(super) fn release_hold(&mut self, vk: VirtualKey) {
        self.stop_hold_remap(vk);
        self.deactivate_momentary(vk);
    }

    fn start_hold_remap(
        &mut self,
        vk: VirtualKey,
        modifiers: Vec<VirtualKey>,
        keys: Vec<VirtualKey>,
        repeat: Option<(u64, u64)>,
    ) {
        self.stop_hold_remap(vk);
        let remap = match repeat {
            Some((delay_ms, interval_ms)) => {
                self.sender.chord(&modifiers, &keys);
                let timer = self
                    .timers
                    .schedule(delay_ms.max(MIN_REPEAT_INTERVAL_MS), TimerKind::RepeatTick { vk });
                HoldRemap {
                    held: vec![],
                    modifiers,
                    keys,
                    repeat_timer: Some(timer),
                    interval_ms: interval_ms.max(MIN_REPEAT_INTERVAL_MS),
                }
            }
            None => {
                let mut held = modifiers.clone();
                held.extend(keys.iter().copied());
                self.sender.press_all(&held);
                HoldRemap {
                    held,
                    modifiers,
                    keys,
                    repeat_timer: None,
                    interval_ms: 0,
                }
            }
        };
        self.hold_remaps.insert(vk, remap);
    }

    pub(super) fn repeat_tick(&mut self, vk: VirtualKey, id: timers::TimerId) {
        let still_held = self.keys.is_down(vk);
        let Some(remap) = self.hold_remaps.get(&vk) else {
            return;
        };
        if remap.repeat_timer != Some(id) || !still_held {
            return;
        }
        let (modifiers, keys, interval) =
            (remap.modifiers.clone(), remap.keys.clone(), remap.interval_ms);
        self.sender.chord(&modifiers, &keys);
        let next = self.timers.schedule(interval, TimerKind::RepeatTick { vk });
        if let Some(remap) = self.hold_remaps.get_mut(&vk) {
            remap.repeat_timer = Some(next);
        }
    }

    fn stop_hold_remap(&mut self, vk: VirtualKey) {
        let Some(remap) = self.hold_remaps.remove(&vk) else {
            return;
        };
        if let Some(t) = remap.repeat_timer {
            self.timers.cancel(t);
        }
        self.sender.release_all_of(&remap.held);
    }

    pub(super) fn activate_momentary(&mut self, vk: VirtualKey, layer_id: &str) {
        if self.momentary.contains_key(&vk) {
            log::debug!("{} already holds a momentary layer", vk_to_str(vk));
            return;
        }
        let Some(layer) = self.cfg.layer(layer_id) else {
            log::warn!("layerMomentary: unknown layer \"{layer_id}\"");
            return;
        };
        let held = layer.held_keys();
        self.momentary.insert(
            vk,
            MomentaryLayer {
                layer_id: layer_id.to_string(),
                held: held.clone(),
            },
        );
        self.layers.push(layer_id);
        self.sender.press_all(&held);
    }

    pub(super) fn deactivate_momentary(&mut self, vk: VirtualKey) {
        let Some(m) = self.momentary.remove(&vk) else {
            return;
        };
        self.layers.pop(&m.layer_id);
        self.sender.release_all_of(&m.held);
    }

    fn save_cursor(&mut self) {
        if self.saved_cursor.is_none() {
            self.saved_cursor = self.sender.cursor_pos();
        }
    }

    pub(super) fn restore_cursor(&mut self) {
        match self.saved_cursor.take() {
            Some((x, y)) => self.sender.set_cursor(x, y),
            None => log::debug!("cursor return with no saved position"),
        }
    }
}
