use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::{mem, ptr};

use winapi::shared::minwindef::FALSE;
use winapi::um::winbase::INFINITE;
use winapi::um::winuser::*;

use super::*;

impl RemapEngine {
    /// Install the low-level keyboard hook and run the hook thread's message loop until
    /// `WM_QUIT`. Timers run on this thread between messages.
    pub fn event_loop(engine: Arc<Mutex<Self>>) -> Result<()> {
        // Display debug and panic output when launched from a terminal.
        unsafe {
            use winapi::um::wincon::*;
            AttachConsole(ATTACH_PARENT_PROCESS);
        };

        // This callback returns `false` if the event is **not** handled and must be handed
        // back to the OS for normal processing, `true` if it is swallowed. Nothing may unwind
        // across the hook boundary: errors and panics both degrade to pass-through.
        let hook_engine = engine.clone();
        let kbhook = KeyboardHook::set_input_cb(move |input_event| {
            let key_event = match KeyEvent::try_from(input_event) {
                Ok(ev) => ev,
                Err(()) => {
                    log::debug!("undecodable hook event {input_event:?}, passing through");
                    return false;
                }
            };
            let result = catch_unwind(AssertUnwindSafe(|| {
                let mut k = hook_engine.lock();
                k.tick_to_now();
                k.handle_input_event(&key_event)
            }));
            match result {
                Ok(Ok(handled)) => handled,
                Ok(Err(e)) => {
                    log::error!("error handling {key_event}: {e:?}");
                    false
                }
                Err(_) => {
                    log::error!("panic while handling {key_event}, passing it through");
                    false
                }
            }
        });
        let _kbhook = match kbhook {
            Ok(h) => h,
            Err(e) => {
                log::error!("could not install the keyboard hook, nothing will be remapped: {e}");
                return Ok(());
            }
        };

        loop {
            let timeout = engine
                .lock()
                .ms_until_next_timer()
                .map(|ms| u32::try_from(ms).unwrap_or(INFINITE - 1))
                .unwrap_or(INFINITE);
            unsafe { MsgWaitForMultipleObjects(0, ptr::null(), FALSE, timeout, QS_ALLINPUT) };

            let mut msg: MSG = unsafe { mem::zeroed() };
            while unsafe { PeekMessageW(&mut msg, ptr::null_mut(), 0, 0, PM_REMOVE) } != 0 {
                if msg.message == WM_QUIT {
                    log::info!("message loop received quit");
                    engine.lock().reset();
                    return Ok(());
                }
                unsafe {
                    TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
            }

            let ticked = catch_unwind(AssertUnwindSafe(|| engine.lock().tick_to_now()));
            if ticked.is_err() {
                log::error!("panic while running timers, releasing held keys");
                engine.lock().reset();
            }
        }
    }
}
