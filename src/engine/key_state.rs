//! Per-key timing state: turns physical downs and ups into Tap, Hold and DoubleTap.

use keylayer_parser::cfg::{Action, KeyBinding, Trigger};
use keylayer_parser::keys::VirtualKey;

use super::timers::{TimerId, TimerKind, Timers};
use super::HashMap;

/// The bindings a key resolved to when it was pressed. Later layer changes do not affect a
/// press that is already in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedBindings {
    pub tap: Option<KeyBinding>,
    pub hold: Option<KeyBinding>,
    pub double_tap: Option<KeyBinding>,
}

impl ResolvedBindings {
    pub fn get(&self, trigger: Trigger) -> Option<&KeyBinding> {
        match trigger {
            Trigger::Tap => self.tap.as_ref(),
            Trigger::Hold => self.hold.as_ref(),
            Trigger::DoubleTap => self.double_tap.as_ref(),
        }
    }

    pub fn set(&mut self, binding: KeyBinding) {
        match binding.trigger {
            Trigger::Tap => self.tap = Some(binding),
            Trigger::Hold => self.hold = Some(binding),
            Trigger::DoubleTap => self.double_tap = Some(binding),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tap.is_none() && self.hold.is_none() && self.double_tap.is_none()
    }
}

/// How the hook answered the key-down of the current press.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Disposition {
    /// Handed back to the OS; the release goes back too.
    #[default]
    PassThrough,
    /// Swallowed and classified into triggers.
    Remapped,
    /// Swallowed and re-sent synthetically so it lands after interrupt output.
    Resent,
    /// Resolved early by another key's press; these keys are held until release.
    Forced(Vec<VirtualKey>),
}

/// A tap held back while waiting to see whether a second tap follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTap {
    pub timer: TimerId,
    /// `None` sends the key itself.
    pub action: Option<Action>,
}

#[derive(Debug, Clone, Default)]
pub struct KeyState {
    pub is_down: bool,
    pub down_time: u64,
    pub last_tap_time: Option<u64>,
    pub hold_timer: Option<TimerId>,
    pub hold_fired: bool,
    pub disposition: Disposition,
    pub bindings: ResolvedBindings,
    pub pending_tap: Option<PendingTap>,
}

/// What a key release resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    PassThrough,
    Resent,
    Forced(Vec<VirtualKey>),
    Hold,
    Tap,
    DoubleTap,
}

#[derive(Debug, Default)]
pub struct KeyStateMachine {
    states: HashMap<VirtualKey, KeyState>,
}

impl KeyStateMachine {
    pub fn get(&self, vk: VirtualKey) -> Option<&KeyState> {
        self.states.get(&vk)
    }

    pub fn is_down(&self, vk: VirtualKey) -> bool {
        self.states.get(&vk).is_some_and(|s| s.is_down)
    }

    /// For a key that is already down, whether its repeats are swallowed.
    pub fn repeat_is_swallowed(&self, vk: VirtualKey) -> Option<bool> {
        self.states
            .get(&vk)
            .filter(|s| s.is_down)
            .map(|s| s.disposition != Disposition::PassThrough)
    }

    pub fn bindings(&self, vk: VirtualKey) -> Option<&ResolvedBindings> {
        self.states.get(&vk).map(|s| &s.bindings)
    }

    pub fn press(
        &mut self,
        vk: VirtualKey,
        now: u64,
        disposition: Disposition,
        bindings: ResolvedBindings,
    ) {
        let state = self.states.entry(vk).or_default();
        state.is_down = true;
        state.down_time = now;
        state.hold_fired = false;
        state.hold_timer = None;
        state.disposition = disposition;
        state.bindings = bindings;
    }

    pub fn arm_hold(&mut self, vk: VirtualKey, threshold_ms: u64, timers: &mut Timers) {
        if let Some(state) = self.states.get_mut(&vk) {
            if let Some(old) = state.hold_timer.take() {
                timers.cancel(old);
            }
            state.hold_timer = Some(timers.schedule(threshold_ms, TimerKind::HoldTimeout { vk }));
        }
    }

    /// The hold timer `id` of `vk` elapsed. Returns the bindings to run the Hold action from,
    /// or `None` if the timer is stale.
    pub fn hold_timeout(&mut self, vk: VirtualKey, id: TimerId) -> Option<ResolvedBindings> {
        let state = self.states.get_mut(&vk)?;
        if !state.is_down
            || state.hold_fired
            || state.hold_timer != Some(id)
            || state.disposition != Disposition::Remapped
        {
            return None;
        }
        state.hold_timer = None;
        state.hold_fired = true;
        Some(state.bindings.clone())
    }

    /// Resolve a pending key as Hold right now.
    pub fn force_hold(&mut self, vk: VirtualKey, timers: &mut Timers) -> bool {
        let Some(state) = self.states.get_mut(&vk) else {
            return false;
        };
        if !state.is_down || state.hold_fired {
            return false;
        }
        if let Some(t) = state.hold_timer.take() {
            timers.cancel(t);
        }
        state.hold_fired = true;
        true
    }

    /// Resolve a pending key by holding `keys` until it is released.
    pub fn force_keys(&mut self, vk: VirtualKey, keys: Vec<VirtualKey>, timers: &mut Timers) {
        if let Some(state) = self.states.get_mut(&vk) {
            if let Some(t) = state.hold_timer.take() {
                timers.cancel(t);
            }
            state.disposition = Disposition::Forced(keys);
        }
    }

    pub fn release(
        &mut self,
        vk: VirtualKey,
        now: u64,
        default_tap_interval_ms: u64,
        timers: &mut Timers,
    ) -> Option<(Resolution, ResolvedBindings)> {
        let state = self.states.get_mut(&vk)?;
        if !state.is_down {
            return None;
        }
        state.is_down = false;
        if let Some(t) = state.hold_timer.take() {
            timers.cancel(t);
        }
        let bindings = std::mem::take(&mut state.bindings);
        let resolution = match std::mem::take(&mut state.disposition) {
            Disposition::PassThrough => Resolution::PassThrough,
            Disposition::Resent => Resolution::Resent,
            Disposition::Forced(keys) => Resolution::Forced(keys),
            Disposition::Remapped if state.hold_fired => {
                state.last_tap_time = None;
                Resolution::Hold
            }
            Disposition::Remapped => {
                let interval = bindings
                    .double_tap
                    .as_ref()
                    .map(|b| b.timing_ms.unwrap_or(default_tap_interval_ms));
                match (interval, state.last_tap_time) {
                    (Some(interval), Some(last)) if now.saturating_sub(last) <= interval => {
                        state.last_tap_time = None;
                        Resolution::DoubleTap
                    }
                    _ => {
                        state.last_tap_time = Some(now);
                        Resolution::Tap
                    }
                }
            }
        };
        state.hold_fired = false;
        Some((resolution, bindings))
    }

    pub fn defer_tap(&mut self, vk: VirtualKey, pending: PendingTap) {
        if let Some(state) = self.states.get_mut(&vk) {
            state.pending_tap = Some(pending);
        }
    }

    /// Take the deferred tap of `vk`, cancelling its expiry timer.
    pub fn take_pending_tap(&mut self, vk: VirtualKey, timers: &mut Timers) -> Option<PendingTap> {
        let pending = self.states.get_mut(&vk)?.pending_tap.take()?;
        timers.cancel(pending.timer);
        Some(pending)
    }

    /// The double-tap window timer `id` closed.
    pub fn expire_pending_tap(&mut self, vk: VirtualKey, id: TimerId) -> Option<PendingTap> {
        let state = self.states.get_mut(&vk)?;
        if state.pending_tap.as_ref()?.timer != id {
            return None;
        }
        state.last_tap_time = None;
        state.pending_tap.take()
    }

    pub fn forget_last_tap(&mut self, vk: VirtualKey) {
        if let Some(state) = self.states.get_mut(&vk) {
            state.last_tap_time = None;
        }
    }

    /// Keys down, swallowed and not yet classified, in press order.
    pub fn pending_hold_keys(&self, except: VirtualKey) -> Vec<VirtualKey> {
        let mut keys: Vec<(u64, VirtualKey)> = self
            .states
            .iter()
            .filter(|(vk, s)| {
                **vk != except
                    && s.is_down
                    && !s.hold_fired
                    && s.disposition == Disposition::Remapped
            })
            .map(|(vk, s)| (s.down_time, *vk))
            .collect();
        keys.sort_unstable();
        keys.into_iter().map(|(_, vk)| vk).collect()
    }

    /// Keys with a tap waiting on the double-tap window, oldest first.
    pub fn pending_tap_keys(&self, except: VirtualKey) -> Vec<VirtualKey> {
        let mut keys: Vec<(u64, VirtualKey)> = self
            .states
            .iter()
            .filter(|(vk, s)| **vk != except && s.pending_tap.is_some())
            .map(|(vk, s)| (s.pending_tap.as_ref().map_or(0, |p| p.timer), *vk))
            .collect();
        keys.sort_unstable();
        keys.into_iter().map(|(_, vk)| vk).collect()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}
