//! Safe abstraction over the low-level windows keyboard hook API, plus `SendInput` output.

use std::cell::Cell;
use std::fmt;
use std::io;
use std::ptr;

use winapi::ctypes::*;
use winapi::shared::minwindef::*;
use winapi::um::winuser::*;

use keylayer_parser::keys::vk_to_str;

use super::*;

/// Callback receiving every non-injected key event. Returns `true` to swallow the event.
type HookFn = dyn FnMut(InputEvent) -> bool;

thread_local! {
    /// Stores the hook callback for the current thread.
    static HOOK: Cell<Option<Box<HookFn>>> = Cell::default();
}

/// Wrapper for the low-level keyboard hook API.
/// Automatically unregisters the hook when dropped.
pub struct KeyboardHook {
    handle: HHOOK,
}

impl KeyboardHook {
    /// Sets the low-level keyboard hook for this thread.
    ///
    /// Fails when a hook is already registered from the same thread or when the OS refuses the
    /// registration.
    pub fn set_input_cb(
        callback: impl FnMut(InputEvent) -> bool + 'static,
    ) -> Result<KeyboardHook, io::Error> {
        HOOK.with(|state| {
            if let Some(existing) = state.take() {
                state.set(Some(existing));
                return Err(io::Error::other(
                    "only one keyboard hook can be registered per thread",
                ));
            }
            state.set(Some(Box::new(callback)));
            let handle =
                unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(hook_proc), ptr::null_mut(), 0) };
            if handle.is_null() {
                state.take();
                return Err(io::Error::last_os_error());
            }
            log::info!("low-level keyboard hook installed");
            Ok(KeyboardHook { handle })
        })
    }
}

impl Drop for KeyboardHook {
    fn drop(&mut self) {
        unsafe { UnhookWindowsHookEx(self.handle) };
        HOOK.with(|state| state.take());
        log::info!("low-level keyboard hook removed");
    }
}

/// Key event received by the low level keyboard hook.
#[derive(Debug, Clone, Copy)]
pub struct InputEvent {
    pub code: u32,
    /// Key was released
    pub up: bool,
    pub injected: bool,
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let direction = if self.up { "↑" } else { "↓" };
        write!(f, "{}{}", direction, vk_to_str(self.code as u16))
    }
}

impl InputEvent {
    fn from_hook_lparam(lparam: &KBDLLHOOKSTRUCT) -> Self {
        Self {
            code: lparam.vkCode,
            up: lparam.flags & LLKHF_UP != 0,
            injected: lparam.flags & LLKHF_INJECTED != 0,
        }
    }
}

impl TryFrom<InputEvent> for KeyEvent {
    type Error = ();
    fn try_from(item: InputEvent) -> Result<Self, Self::Error> {
        let code = u16::try_from(item.code).map_err(|_| ())?;
        if code == 0 || code > 0xFF {
            return Err(());
        }
        Ok(Self {
            code,
            value: KeyValue::from(item.up),
            injected: item.injected,
        })
    }
}

/// The actual WinAPI compatible callback.
///
/// code: `<0` must be forwarded to `CallNextHookEx` without further processing; `HC_ACTION`
/// means wparam/lparam describe a key message.
///
/// wparam: `WM_KEYDOWN`, `WM_KEYUP`, `WM_SYSKEYDOWN` or `WM_SYSKEYUP`.
///
/// lparam: pointer to a `KBDLLHOOKSTRUCT`. Flag bit 4 (`LLKHF_INJECTED`) marks events produced
/// by `SendInput`, bit 7 (`LLKHF_UP`) marks releases.
unsafe extern "system" fn hook_proc(code: c_int, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let forward = || unsafe { CallNextHookEx(ptr::null_mut(), code, wparam, lparam) };
    if code != HC_ACTION {
        return forward();
    }
    if !matches!(
        wparam as u32,
        WM_KEYDOWN | WM_KEYUP | WM_SYSKEYDOWN | WM_SYSKEYUP
    ) {
        return forward();
    }
    let Some(hook_lparam) = (unsafe { (lparam as *const KBDLLHOOKSTRUCT).as_ref() }) else {
        log::warn!("keyboard hook received a null payload, passing through");
        return forward();
    };
    let event = InputEvent::from_hook_lparam(hook_lparam);
    log::trace!("hook {event} injected={}", event.injected);

    // `SendInput()` internally calls the hook function. Injected events are never processed,
    // which both prevents feedback loops and keeps the callback from being re-entered.
    if event.injected {
        return forward();
    }

    let mut handled = false;
    HOOK.with(|state| {
        // The callback is moved out while it runs and put back afterwards. Re-entry can only
        // happen through injected events, which were filtered above.
        if let Some(mut hook) = state.take() {
            handled = hook(event);
            state.set(Some(hook));
        }
    });

    if handled { 1 } else { forward() }
}

#[cfg(not(any(test, feature = "simulated_output")))]
/// Handle for writing keys to the OS.
pub struct KbdOut {}

#[cfg(not(any(test, feature = "simulated_output")))]
impl KbdOut {
    pub fn new() -> Result<Self, io::Error> {
        Ok(Self {})
    }

    /// Simulated output records elapsed time; the OS needs nothing.
    pub fn advance_ms(&mut self, _ms: u64) {}

    pub fn press_key(&mut self, key: VirtualKey) -> Result<(), io::Error> {
        send_key(key, false)
    }

    pub fn release_key(&mut self, key: VirtualKey) -> Result<(), io::Error> {
        send_key(key, true)
    }

    pub fn click_btn(&mut self, btn: Btn) -> Result<(), io::Error> {
        log::debug!("click btn: {btn}");
        send_btn(match btn {
            Btn::Left => MOUSEEVENTF_LEFTDOWN,
            Btn::Right => MOUSEEVENTF_RIGHTDOWN,
            Btn::Mid => MOUSEEVENTF_MIDDLEDOWN,
        })
    }

    pub fn release_btn(&mut self, btn: Btn) -> Result<(), io::Error> {
        log::debug!("release btn: {btn}");
        send_btn(match btn {
            Btn::Left => MOUSEEVENTF_LEFTUP,
            Btn::Right => MOUSEEVENTF_RIGHTUP,
            Btn::Mid => MOUSEEVENTF_MIDDLEUP,
        })
    }

    pub fn set_mouse(&mut self, x: i32, y: i32) -> Result<(), io::Error> {
        log::debug!("setting mouse {x} {y}");
        if unsafe { SetCursorPos(x, y) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn cursor_pos(&self) -> Result<(i32, i32), io::Error> {
        let mut p = winapi::shared::windef::POINT { x: 0, y: 0 };
        if unsafe { GetCursorPos(&mut p) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok((p.x, p.y))
    }
}

#[cfg(not(any(test, feature = "simulated_output")))]
fn send_key(vk: VirtualKey, up: bool) -> Result<(), io::Error> {
    let mut flags = 0;
    if up {
        flags |= KEYEVENTF_KEYUP;
    }
    if keylayer_parser::keys::is_extended_key(vk) {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }
    let scan = unsafe { MapVirtualKeyW(u32::from(vk), MAPVK_VK_TO_VSC) } as u16;
    let mut input: INPUT = unsafe { std::mem::zeroed() };
    input.type_ = INPUT_KEYBOARD;
    unsafe {
        *input.u.ki_mut() = KEYBDINPUT {
            wVk: vk,
            wScan: scan,
            dwFlags: flags,
            time: 0,
            dwExtraInfo: 0,
        };
    }
    send_input(input)
}

#[cfg(not(any(test, feature = "simulated_output")))]
fn send_btn(flag: u32) -> Result<(), io::Error> {
    let mut input: INPUT = unsafe { std::mem::zeroed() };
    input.type_ = INPUT_MOUSE;
    let mut m_input: MOUSEINPUT = unsafe { std::mem::zeroed() };
    m_input.dwFlags |= flag;
    unsafe { *input.u.mi_mut() = m_input };
    send_input(input)
}

/// One `INPUT` record per call. A count other than 1 means the OS dropped the event, usually
/// because UIPI blocked it.
#[cfg(not(any(test, feature = "simulated_output")))]
fn send_input(mut input: INPUT) -> Result<(), io::Error> {
    let sent = unsafe { SendInput(1, &mut input, std::mem::size_of::<INPUT>() as c_int) };
    if sent != 1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
