//! Implements the glue between OS input/output and the layered rule table.
//!
//! [`RemapEngine`] owns every piece of mutable remapping state. The hook callback feeds it key
//! events through [`RemapEngine::handle_input_event`] and the event loop advances its clock
//! through [`RemapEngine::tick_ms`]; both run on the hook thread.

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::sync::mpsc::{SyncSender as Sender, TrySendError};
use std::sync::Arc;
use std::time;

use keylayer_parser::cfg;
use keylayer_parser::cfg::*;
use keylayer_parser::keys::*;
use keylayer_tcp_protocol::{KeyAction, ServerMessage};

use crate::layers::LayerStack;
use crate::oskbd::*;
use crate::ValidatedArgs;

mod executor;
mod interrupt;
mod key_state;
mod macros;
mod sender;
mod timers;

pub use key_state::{Disposition, ResolvedBindings};
pub use macros::MAX_MACRO_DEPTH;
pub use sender::{send_deferred, KeySender, OutputEvent};

use executor::*;
use key_state::*;
use macros::MacroPlayback;
use timers::{TimerKind, Timers};

#[cfg(target_os = "windows")]
mod windows;

#[cfg(not(target_os = "windows"))]
mod unknown;

type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;

pub struct RemapEngine {
    /// Synthetic key/mouse output and the keys it currently holds down.
    pub sender: KeySender,
    /// The rule table.
    cfg: RemapConfig,
    /// Active layers, base first.
    layers: LayerStack,
    /// Per physical key timing state.
    keys: KeyStateMachine,
    timers: Timers,
    /// Hold-triggered remaps that are still active, by the physical key that started them.
    hold_remaps: HashMap<VirtualKey, HoldRemap>,
    /// Momentarily active layers, by the physical key holding them.
    momentary: HashMap<VirtualKey, MomentaryLayer>,
    /// Macro playbacks suspended on a delay.
    playbacks: HashMap<u64, MacroPlayback>,
    next_playback_id: u64,
    /// Cursor position from before the first mouse action since the last cursor return.
    saved_cursor: Option<(i32, i32)>,
    cursor_return_timer: Option<timers::TimerId>,
    /// Receives the rule table after every edit.
    store: Option<Box<dyn ConfigStore>>,
    /// Key event notifications for IPC clients.
    notify_tx: Option<Sender<ServerMessage>>,
    /// Time of the last tick, used to turn wall-clock time into whole milliseconds.
    last_tick: time::Instant,
    /// Sub-millisecond remainder carried between ticks.
    time_remainder: u128,
}

impl RemapEngine {
    /// Create an engine from command line arguments, loading and persisting to the config file.
    pub fn new(args: &ValidatedArgs) -> Result<Self> {
        let cfg = match cfg::new_from_file(&args.path) {
            Ok(c) => c,
            Err(e) => {
                log::error!("{e:?}");
                return Err(anyhow!("failed to parse file"));
            }
        };
        let mut engine = Self::from_config(cfg, KbdOut::new()?);
        engine.set_store(Some(Box::new(JsonFileStore::new(&args.path))));
        Ok(engine)
    }

    /// Create a new engine wrapped in `Arc<Mutex>`.
    pub fn new_arc(args: &ValidatedArgs) -> Result<Arc<Mutex<Self>>> {
        Ok(Arc::new(Mutex::new(Self::new(args)?)))
    }

    pub fn from_config(cfg: RemapConfig, kbd_out: KbdOut) -> Self {
        log::info!("layers: {}", cfg.layer_names().join(", "));
        Self {
            sender: KeySender::new(kbd_out),
            cfg,
            layers: LayerStack::new(),
            keys: KeyStateMachine::default(),
            timers: Timers::default(),
            hold_remaps: HashMap::default(),
            momentary: HashMap::default(),
            playbacks: HashMap::default(),
            next_playback_id: 0,
            saved_cursor: None,
            cursor_return_timer: None,
            store: None,
            notify_tx: None,
            last_tick: time::Instant::now(),
            time_remainder: 0,
        }
    }

    /// Parse JSON configuration text into a new engine.
    pub fn new_from_str(cfg_text: &str) -> Result<Self> {
        let cfg = cfg::new_from_str(cfg_text).map_err(|e| anyhow!("{e:?}"))?;
        Ok(Self::from_config(cfg, KbdOut::new()?))
    }

    pub fn set_store(&mut self, store: Option<Box<dyn ConfigStore>>) {
        self.store = store;
    }

    /// Route layer-change and key-event notifications to `tx`.
    pub fn set_notifier(&mut self, tx: Option<Sender<ServerMessage>>) {
        self.layers.set_observer(tx.clone());
        self.notify_tx = tx;
    }

    /// Process one key event from the hook. Returns `true` if the event must be swallowed.
    pub fn handle_input_event(&mut self, event: &KeyEvent) -> Result<bool> {
        if event.injected {
            log::trace!("{event} passes through");
            return Ok(false);
        }
        log::debug!("process recv ev {event}");
        match event.value {
            KeyValue::Press | KeyValue::Repeat => self.handle_press(event.code),
            KeyValue::Release => self.handle_release(event.code),
        }
    }

    fn handle_press(&mut self, vk: VirtualKey) -> Result<bool> {
        if let Some(swallow) = self.keys.repeat_is_swallowed(vk) {
            log::trace!("{} repeat, swallow={swallow}", vk_to_str(vk));
            return Ok(swallow);
        }
        self.notify_key(vk, KeyAction::Press);
        let now = self.timers.now();

        let interrupted = self.resolve_interrupts(vk);
        let bindings = self.resolve_bindings(vk);

        if bindings.is_empty() {
            if interrupted {
                log::debug!("{} re-sent after interrupt output", vk_to_str(vk));
                self.keys.press(vk, now, Disposition::Resent, bindings);
                self.sender.press(vk);
                return Ok(true);
            }
            self.keys.press(vk, now, Disposition::PassThrough, bindings);
            return Ok(false);
        }

        let hold_threshold = bindings
            .hold
            .as_ref()
            .and_then(|b| b.timing_ms)
            .unwrap_or(self.cfg.global_settings.default_hold_threshold_ms);
        self.keys.press(vk, now, Disposition::Remapped, bindings);
        self.keys.arm_hold(vk, hold_threshold, &mut self.timers);
        Ok(true)
    }

    fn handle_release(&mut self, vk: VirtualKey) -> Result<bool> {
        let now = self.timers.now();
        let interval = self.cfg.global_settings.default_tap_interval_ms;
        let Some((resolution, bindings)) = self.keys.release(vk, now, interval, &mut self.timers)
        else {
            log::debug!("release of {} without a press, passing through", vk_to_str(vk));
            return Ok(false);
        };
        self.notify_key(vk, KeyAction::Release);
        log::debug!("{} resolved: {resolution:?}", vk_to_str(vk));

        match resolution {
            Resolution::PassThrough => return Ok(false),
            Resolution::Resent => self.sender.release(vk),
            Resolution::Forced(keys) => self.sender.release_all_of(&keys),
            Resolution::Hold => self.release_hold(vk),
            Resolution::DoubleTap => {
                if let Some(discarded) = self.keys.take_pending_tap(vk, &mut self.timers) {
                    log::debug!("double tap replaces deferred tap {:?}", discarded.action);
                }
                if let Some(b) = bindings.double_tap {
                    self.execute(vk, Trigger::DoubleTap, &b.action);
                }
            }
            Resolution::Tap => {
                let tap_action = bindings.tap.map(|b| b.action);
                match bindings.double_tap {
                    Some(dt) => {
                        self.flush_pending_tap(vk);
                        let window = dt.timing_ms.unwrap_or(interval);
                        let timer = self
                            .timers
                            .schedule(window, TimerKind::DoubleTapExpiry { vk });
                        self.keys.defer_tap(
                            vk,
                            PendingTap {
                                timer,
                                action: tap_action,
                            },
                        );
                    }
                    None => self.run_tap(vk, tap_action.as_ref()),
                }
            }
        }
        Ok(true)
    }

    /// The bindings of `vk` on the highest-priority active layer that binds it at all. Lower
    /// layers are masked for that key even for triggers the winning layer leaves unbound.
    pub fn resolve_bindings(&self, vk: VirtualKey) -> ResolvedBindings {
        let mut resolved = ResolvedBindings::default();
        if let Some((_, slot)) = self.resolving_layer(vk) {
            for b in slot {
                resolved.set(b.clone());
            }
        }
        resolved
    }

    fn resolving_layer(&self, vk: VirtualKey) -> Option<(&str, &[KeyBinding])> {
        self.layers.resolution_order().find_map(|id| {
            let layer = self.cfg.layer(id)?;
            match layer.bindings.get(&vk) {
                Some(slot) if !slot.is_empty() => Some((layer.id.as_str(), slot.as_slice())),
                _ => None,
            }
        })
    }

    /// Advance the engine clock by `ms`, running every timer that falls due in order.
    pub fn tick_ms(&mut self, ms: u64) {
        let target = self.timers.now() + ms;
        loop {
            let before = self.timers.now();
            let Some((id, kind)) = self.timers.pop_due(target) else {
                break;
            };
            self.sender.kbd_out.advance_ms(self.timers.now() - before);
            self.fire_timer(id, kind);
        }
        let before = self.timers.now();
        self.timers.advance_to(target);
        self.sender.kbd_out.advance_ms(target - before);
    }

    /// Advance the engine clock to the wall clock.
    pub fn tick_to_now(&mut self) {
        let now = time::Instant::now();
        let elapsed = now.duration_since(self.last_tick).as_micros() + self.time_remainder;
        self.last_tick = now;
        self.time_remainder = elapsed % 1000;
        let ms = (elapsed / 1000) as u64;
        if ms > 0 {
            self.tick_ms(ms);
        }
    }

    /// Milliseconds of wall-clock time until the next timer is due, if any is scheduled.
    pub fn ms_until_next_timer(&mut self) -> Option<u64> {
        let deadline = self.timers.next_deadline()?;
        let elapsed =
            ((self.last_tick.elapsed().as_micros() + self.time_remainder) / 1000) as u64;
        Some(deadline.saturating_sub(self.timers.now() + elapsed))
    }

    fn fire_timer(&mut self, id: timers::TimerId, kind: TimerKind) {
        log::trace!("timer {id} fired: {kind:?}");
        match kind {
            TimerKind::HoldTimeout { vk } => {
                let Some(bindings) = self.keys.hold_timeout(vk, id) else {
                    return;
                };
                self.flush_pending_tap(vk);
                if let Some(b) = bindings.hold {
                    log::debug!("{} hold", vk_to_str(vk));
                    self.execute(vk, Trigger::Hold, &b.action);
                }
            }
            TimerKind::DoubleTapExpiry { vk } => {
                if let Some(pending) = self.keys.expire_pending_tap(vk, id) {
                    self.run_tap(vk, pending.action.as_ref());
                }
            }
            TimerKind::RepeatTick { vk } => self.repeat_tick(vk, id),
            TimerKind::MacroResume { playback } => self.resume_macro(playback),
            TimerKind::CursorReturn => {
                if self.cursor_return_timer == Some(id) {
                    self.cursor_return_timer = None;
                    self.restore_cursor();
                }
            }
        }
    }

    fn notify_key(&self, vk: VirtualKey, action: KeyAction) {
        let Some(tx) = &self.notify_tx else {
            return;
        };
        let msg = ServerMessage::KeyEvent {
            vk,
            key: vk_to_str(vk),
            action,
        };
        if let Err(TrySendError::Full(_)) = tx.try_send(msg) {
            log::debug!("key event notification dropped, channel full");
        }
    }

    fn persist(&mut self) -> Result<()> {
        if let Some(store) = self.store.as_mut() {
            store
                .save(&self.cfg)
                .map_err(|e| anyhow!("change applied but not saved: {e}"))?;
        }
        Ok(())
    }

    /// Release every synthetic key and forget all in-flight state. The layer stack goes back
    /// to the base layer.
    pub fn reset(&mut self) {
        log::info!("resetting remap state");
        self.timers.clear();
        self.hold_remaps.clear();
        self.momentary.clear();
        self.playbacks.clear();
        self.keys.clear();
        self.cursor_return_timer = None;
        self.saved_cursor = None;
        self.sender.release_all();
        self.layers.reset_to_layer(BASE_LAYER_ID);
    }

    // ---------------------------------------------------------------------------------------
    // Accessors and mutators used by the IPC server.

    pub fn config(&self) -> &RemapConfig {
        &self.cfg
    }

    pub fn get_layers(&self) -> Vec<String> {
        self.cfg.layer_names()
    }

    /// Bindings of `vk` on every layer that binds it.
    pub fn get_bindings(&self, vk: VirtualKey) -> Vec<(String, Vec<KeyBinding>)> {
        self.cfg
            .layers
            .iter()
            .filter_map(|l| l.bindings.get(&vk).map(|b| (l.id.clone(), b.clone())))
            .collect()
    }

    /// The action `trigger` on `vk` resolves to through the current stack, and its layer.
    pub fn get_action(&self, vk: VirtualKey, trigger: Trigger) -> Option<(String, Action)> {
        let (layer, slot) = self.resolving_layer(vk)?;
        slot.iter()
            .find(|b| b.trigger == trigger)
            .map(|b| (layer.to_string(), b.action.clone()))
    }

    pub fn get_layer_stack(&self) -> Vec<String> {
        self.layers.snapshot()
    }

    pub fn add_binding(&mut self, layer_id: &str, vk: VirtualKey, binding: KeyBinding) -> Result<()> {
        self.cfg.add_binding(layer_id, vk, binding)?;
        self.persist()
    }

    pub fn remove_binding(&mut self, layer_id: &str, vk: VirtualKey, trigger: Trigger) -> Result<()> {
        self.cfg.remove_binding(layer_id, vk, trigger)?;
        self.persist()
    }

    pub fn add_layer(&mut self, layer: Layer) -> Result<()> {
        self.cfg.add_layer(layer)?;
        self.persist()
    }

    /// Removing the base layer is ignored.
    pub fn remove_layer(&mut self, layer_id: &str) -> Result<()> {
        if self.cfg.remove_layer(layer_id)?.is_none() {
            return Ok(());
        }
        let holders: Vec<VirtualKey> = self
            .momentary
            .iter()
            .filter(|(_, m)| m.layer_id == layer_id)
            .map(|(vk, _)| *vk)
            .collect();
        for vk in holders {
            self.deactivate_momentary(vk);
        }
        self.layers.pop(layer_id);
        self.persist()
    }

    pub fn add_macro(&mut self, def: MacroDef) -> Result<()> {
        self.cfg.add_macro(def)?;
        self.persist()
    }

    pub fn push_layer(&mut self, layer_id: &str) -> Result<()> {
        self.ensure_layer(layer_id)?;
        self.layers.push(layer_id);
        Ok(())
    }

    pub fn pop_layer(&mut self, layer_id: &str) {
        self.layers.pop(layer_id);
    }

    pub fn toggle_layer(&mut self, layer_id: &str) -> Result<()> {
        self.ensure_layer(layer_id)?;
        self.layers.toggle(layer_id);
        Ok(())
    }

    pub fn set_layer(&mut self, layer_id: &str) -> Result<()> {
        self.ensure_layer(layer_id)?;
        self.layers.set_layer(layer_id);
        Ok(())
    }

    pub fn reset_to_layer(&mut self, layer_id: &str) -> Result<()> {
        self.ensure_layer(layer_id)?;
        self.layers.reset_to_layer(layer_id);
        Ok(())
    }

    pub fn release_all(&mut self) {
        self.sender.release_all();
    }

    fn ensure_layer(&self, layer_id: &str) -> Result<()> {
        match self.cfg.layer(layer_id) {
            Some(_) => Ok(()),
            None => Err(CfgError::UnknownLayer(layer_id.into()).into()),
        }
    }
}
