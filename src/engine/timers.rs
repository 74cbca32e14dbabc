//! Deadline queue driving every time-based behaviour of the engine.
//!
//! The queue never reads a clock. The owner advances it explicitly, so the same code runs
//! against the OS clock on the hook thread and against scripted time in tests.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use keylayer_parser::keys::VirtualKey;

use super::HashMap;

pub type TimerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Hold threshold of a physical key elapsed.
    HoldTimeout { vk: VirtualKey },
    /// Double-tap window of a key closed with only one tap seen.
    DoubleTapExpiry { vk: VirtualKey },
    /// Next repetition of a repeating hold remap.
    RepeatTick { vk: VirtualKey },
    /// A suspended macro playback may continue.
    MacroResume { playback: u64 },
    /// Put the cursor back where it was before the last mouse action.
    CursorReturn,
}

#[derive(Debug, Default)]
pub struct Timers {
    now_ms: u64,
    next_id: TimerId,
    queue: BinaryHeap<Reverse<(u64, TimerId)>>,
    live: HashMap<TimerId, TimerKind>,
}

impl Timers {
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    pub fn schedule(&mut self, delay_ms: u64, kind: TimerKind) -> TimerId {
        self.next_id += 1;
        let id = self.next_id;
        self.queue.push(Reverse((self.now_ms + delay_ms, id)));
        self.live.insert(id, kind);
        log::trace!("timer {id} {kind:?} due in {delay_ms}ms");
        id
    }

    /// Cancel a timer. Cancelled entries stay in the heap and are skipped when popped.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.live.remove(&id).is_some()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.live.len()
    }

    pub fn next_deadline(&mut self) -> Option<u64> {
        self.drop_cancelled();
        self.queue.peek().map(|Reverse((deadline, _))| *deadline)
    }

    /// Remove the earliest timer whose deadline is at or before `until`, moving the clock to
    /// that deadline.
    pub fn pop_due(&mut self, until: u64) -> Option<(TimerId, TimerKind)> {
        self.drop_cancelled();
        let Reverse((deadline, id)) = *self.queue.peek()?;
        if deadline > until {
            return None;
        }
        self.queue.pop();
        self.now_ms = self.now_ms.max(deadline);
        self.live.remove(&id).map(|kind| (id, kind))
    }

    pub fn advance_to(&mut self, t: u64) {
        self.now_ms = self.now_ms.max(t);
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.live.clear();
    }

    fn drop_cancelled(&mut self) {
        while let Some(Reverse((_, id))) = self.queue.peek() {
            if self.live.contains_key(id) {
                break;
            }
            self.queue.pop();
        }
    }
}
