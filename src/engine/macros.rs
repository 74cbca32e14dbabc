//! Macro playback.
//!
//! A playback is an explicit stack of frames, one per nested macro. Steps run in order until a
//! `delay` or `cursorReturn` step suspends the playback on a timer; the next step only starts
//! once the timer fires. A macro that is already on the stack is never entered again, and
//! nesting stops at [`MAX_MACRO_DEPTH`].

use super::*;

pub const MAX_MACRO_DEPTH: usize = 16;

#[derive(Debug)]
struct MacroFrame {
    macro_id: String,
    steps: Vec<Action>,
    next: usize,
}

#[derive(Debug)]
pub(super) struct MacroPlayback {
    /// Physical key whose trigger started the playback.
    vk: VirtualKey,
    frames: Vec<MacroFrame>,
    /// Set while suspended on a `cursorReturn` step.
    restore_cursor_on_resume: bool,
}

impl MacroPlayback {
    fn is_active(&self, macro_id: &str) -> bool {
        self.frames.iter().any(|f| f.macro_id == macro_id)
    }
}

impl RemapEngine {
    pub(super) fn start_macro(&mut self, vk: VirtualKey, macro_id: &str) {
        let Some(def) = self.cfg.get_macro(macro_id) else {
            log::warn!("macro \"{macro_id}\" does not exist");
            return;
        };
        log::debug!("macro \"{}\" ({}) starts", def.id, def.name);
        let playback = MacroPlayback {
            vk,
            frames: vec![MacroFrame {
                macro_id: def.id.clone(),
                steps: def.actions.clone(),
                next: 0,
            }],
            restore_cursor_on_resume: false,
        };
        self.next_playback_id += 1;
        self.run_playback(self.next_playback_id, playback);
    }

    pub(super) fn resume_macro(&mut self, id: u64) {
        let Some(mut playback) = self.playbacks.remove(&id) else {
            return;
        };
        if std::mem::take(&mut playback.restore_cursor_on_resume) {
            self.restore_cursor();
        }
        self.run_playback(id, playback);
    }

    /// Run steps until the playback finishes or suspends.
    fn run_playback(&mut self, id: u64, mut playback: MacroPlayback) {
        loop {
            let Some(frame) = playback.frames.last_mut() else {
                log::trace!("macro playback {id} done");
                return;
            };
            let Some(step) = frame.steps.get(frame.next).cloned() else {
                playback.frames.pop();
                continue;
            };
            frame.next += 1;

            match step {
                Action::Delay { delay_ms } => {
                    self.suspend(id, playback, delay_ms);
                    return;
                }
                Action::CursorReturn { delay_ms } => {
                    playback.restore_cursor_on_resume = true;
                    self.suspend(id, playback, delay_ms);
                    return;
                }
                Action::Macro { macro_id } => {
                    if playback.is_active(&macro_id) {
                        log::error!("macro \"{macro_id}\" invokes itself, skipping");
                        continue;
                    }
                    if playback.frames.len() >= MAX_MACRO_DEPTH {
                        log::error!(
                            "macro \"{macro_id}\" exceeds the nesting limit of {MAX_MACRO_DEPTH}, skipping"
                        );
                        continue;
                    }
                    let Some(def) = self.cfg.get_macro(&macro_id) else {
                        log::warn!("macro \"{macro_id}\" does not exist");
                        continue;
                    };
                    playback.frames.push(MacroFrame {
                        macro_id,
                        steps: def.actions.clone(),
                        next: 0,
                    });
                }
                step => self.execute(playback.vk, Trigger::Tap, &step),
            }
        }
    }

    fn suspend(&mut self, id: u64, playback: MacroPlayback, delay_ms: u64) {
        self.timers
            .schedule(delay_ms, TimerKind::MacroResume { playback: id });
        self.playbacks.insert(id, playback);
    }
}
