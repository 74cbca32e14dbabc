use parking_lot::Mutex;
use std::sync::Arc;

use super::*;

impl RemapEngine {
    /// There is no keyboard hook outside of Windows. Logs and returns without remapping.
    pub fn event_loop(engine: Arc<Mutex<Self>>) -> Result<()> {
        log::warn!(
            "the low-level keyboard hook is only available on Windows; nothing will be remapped"
        );
        engine.lock().reset();
        Ok(())
    }
}
