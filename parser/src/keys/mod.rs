//! Windows virtual-key codes and their human readable names.
//!
//! Bindings in the JSON configuration are keyed by the numeric code. Names exist for logging,
//! for the simulation scripts and for clients that prefer not to memorize `0x41`.

/// A Windows virtual-key code (`VK_*`). Only the low byte is meaningful to the OS.
pub type VirtualKey = u16;

pub const VK_BACK: VirtualKey = 0x08;
pub const VK_TAB: VirtualKey = 0x09;
pub const VK_RETURN: VirtualKey = 0x0D;
pub const VK_SHIFT: VirtualKey = 0x10;
pub const VK_CONTROL: VirtualKey = 0x11;
pub const VK_MENU: VirtualKey = 0x12;
pub const VK_PAUSE: VirtualKey = 0x13;
pub const VK_CAPITAL: VirtualKey = 0x14;
pub const VK_ESCAPE: VirtualKey = 0x1B;
pub const VK_SPACE: VirtualKey = 0x20;
pub const VK_PRIOR: VirtualKey = 0x21;
pub const VK_NEXT: VirtualKey = 0x22;
pub const VK_END: VirtualKey = 0x23;
pub const VK_HOME: VirtualKey = 0x24;
pub const VK_LEFT: VirtualKey = 0x25;
pub const VK_UP: VirtualKey = 0x26;
pub const VK_RIGHT: VirtualKey = 0x27;
pub const VK_DOWN: VirtualKey = 0x28;
pub const VK_SNAPSHOT: VirtualKey = 0x2C;
pub const VK_INSERT: VirtualKey = 0x2D;
pub const VK_DELETE: VirtualKey = 0x2E;
pub const VK_LWIN: VirtualKey = 0x5B;
pub const VK_RWIN: VirtualKey = 0x5C;
pub const VK_APPS: VirtualKey = 0x5D;
pub const VK_NUMPAD0: VirtualKey = 0x60;
pub const VK_MULTIPLY: VirtualKey = 0x6A;
pub const VK_ADD: VirtualKey = 0x6B;
pub const VK_SUBTRACT: VirtualKey = 0x6D;
pub const VK_DECIMAL: VirtualKey = 0x6E;
pub const VK_DIVIDE: VirtualKey = 0x6F;
pub const VK_F1: VirtualKey = 0x70;
pub const VK_NUMLOCK: VirtualKey = 0x90;
pub const VK_SCROLL: VirtualKey = 0x91;
pub const VK_LSHIFT: VirtualKey = 0xA0;
pub const VK_RSHIFT: VirtualKey = 0xA1;
pub const VK_LCONTROL: VirtualKey = 0xA2;
pub const VK_RCONTROL: VirtualKey = 0xA3;
pub const VK_LMENU: VirtualKey = 0xA4;
pub const VK_RMENU: VirtualKey = 0xA5;
pub const VK_OEM_1: VirtualKey = 0xBA;
pub const VK_OEM_PLUS: VirtualKey = 0xBB;
pub const VK_OEM_COMMA: VirtualKey = 0xBC;
pub const VK_OEM_MINUS: VirtualKey = 0xBD;
pub const VK_OEM_PERIOD: VirtualKey = 0xBE;
pub const VK_OEM_2: VirtualKey = 0xBF;
pub const VK_OEM_3: VirtualKey = 0xC0;
pub const VK_OEM_4: VirtualKey = 0xDB;
pub const VK_OEM_5: VirtualKey = 0xDC;
pub const VK_OEM_6: VirtualKey = 0xDD;
pub const VK_OEM_7: VirtualKey = 0xDE;

/// Parse a key name. Accepts the names below (case-insensitive), single letters and digits,
/// `f1`-`f24`, `kp0`-`kp9`, plain decimal codes and `0x` prefixed hex codes.
pub fn str_to_vk(s: &str) -> Option<VirtualKey> {
    let lower = s.to_ascii_lowercase();
    let s = lower.as_str();
    if let Some(hex) = s.strip_prefix("0x") {
        return u16::from_str_radix(hex, 16).ok().filter(|vk| *vk <= 0xFF);
    }
    let bytes = s.as_bytes();
    if bytes.len() == 1 {
        let c = bytes[0];
        if c.is_ascii_lowercase() {
            return Some(VirtualKey::from(c.to_ascii_uppercase()));
        }
        if c.is_ascii_digit() {
            return Some(VirtualKey::from(c));
        }
    }
    if let Some(n) = s.strip_prefix('f').and_then(|n| n.parse::<u16>().ok()) {
        return (1..=24).contains(&n).then(|| VK_F1 + n - 1);
    }
    if let Some(n) = s.strip_prefix("kp").and_then(|n| n.parse::<u16>().ok()) {
        return (n <= 9).then_some(VK_NUMPAD0 + n);
    }
    if let Ok(code) = s.parse::<u16>() {
        return (code <= 0xFF).then_some(code);
    }
    Some(match s {
        "bspc" | "backspace" => VK_BACK,
        "tab" => VK_TAB,
        "ret" | "enter" | "return" => VK_RETURN,
        "shift" | "sft" => VK_SHIFT,
        "ctrl" | "ctl" | "control" => VK_CONTROL,
        "alt" | "menu" => VK_MENU,
        "pause" => VK_PAUSE,
        "caps" | "capslock" => VK_CAPITAL,
        "esc" | "escape" => VK_ESCAPE,
        "spc" | "space" => VK_SPACE,
        "pgup" | "pageup" => VK_PRIOR,
        "pgdn" | "pagedown" => VK_NEXT,
        "end" => VK_END,
        "home" => VK_HOME,
        "left" => VK_LEFT,
        "up" => VK_UP,
        "right" => VK_RIGHT,
        "down" => VK_DOWN,
        "prtsc" | "printscreen" => VK_SNAPSHOT,
        "ins" | "insert" => VK_INSERT,
        "del" | "delete" => VK_DELETE,
        "win" | "lwin" | "lmet" => VK_LWIN,
        "rwin" | "rmet" => VK_RWIN,
        "apps" | "compose" => VK_APPS,
        "kp*" => VK_MULTIPLY,
        "kp+" => VK_ADD,
        "kp-" => VK_SUBTRACT,
        "kp." => VK_DECIMAL,
        "kp/" => VK_DIVIDE,
        "nlck" | "numlock" => VK_NUMLOCK,
        "slck" | "scrolllock" => VK_SCROLL,
        "lsft" | "lshift" => VK_LSHIFT,
        "rsft" | "rshift" => VK_RSHIFT,
        "lctl" | "lctrl" => VK_LCONTROL,
        "rctl" | "rctrl" => VK_RCONTROL,
        "lalt" => VK_LMENU,
        "ralt" | "altgr" => VK_RMENU,
        ";" | "scln" | "semicolon" => VK_OEM_1,
        "=" | "eql" | "equal" => VK_OEM_PLUS,
        "," | "comm" | "comma" => VK_OEM_COMMA,
        "-" | "min" | "minus" => VK_OEM_MINUS,
        "." | "dot" | "period" => VK_OEM_PERIOD,
        "/" | "slash" => VK_OEM_2,
        "`" | "grv" | "grave" => VK_OEM_3,
        "[" | "lbrc" => VK_OEM_4,
        "\\" | "bslh" | "backslash" => VK_OEM_5,
        "]" | "rbrc" => VK_OEM_6,
        "'" | "apo" | "quote" => VK_OEM_7,
        _ => return None,
    })
}

/// Display name of a virtual key, used in logs and in simulated output.
pub fn vk_to_str(vk: VirtualKey) -> String {
    let name = match vk {
        0x30..=0x39 | 0x41..=0x5A => return char::from(vk as u8).to_string(),
        0x70..=0x87 => return format!("F{}", vk - VK_F1 + 1),
        0x60..=0x69 => return format!("Kp{}", vk - VK_NUMPAD0),
        VK_BACK => "BSpace",
        VK_TAB => "Tab",
        VK_RETURN => "Enter",
        VK_SHIFT => "Shift",
        VK_CONTROL => "Ctrl",
        VK_MENU => "Alt",
        VK_PAUSE => "Pause",
        VK_CAPITAL => "CapsLock",
        VK_ESCAPE => "Escape",
        VK_SPACE => "Space",
        VK_PRIOR => "PgUp",
        VK_NEXT => "PgDown",
        VK_END => "End",
        VK_HOME => "Home",
        VK_LEFT => "Left",
        VK_UP => "Up",
        VK_RIGHT => "Right",
        VK_DOWN => "Down",
        VK_SNAPSHOT => "PrintScreen",
        VK_INSERT => "Insert",
        VK_DELETE => "Delete",
        VK_LWIN => "LWin",
        VK_RWIN => "RWin",
        VK_APPS => "Apps",
        VK_MULTIPLY => "KpMultiply",
        VK_ADD => "KpPlus",
        VK_SUBTRACT => "KpMinus",
        VK_DECIMAL => "KpDot",
        VK_DIVIDE => "KpSlash",
        VK_NUMLOCK => "NumLock",
        VK_SCROLL => "ScrollLock",
        VK_LSHIFT => "LShift",
        VK_RSHIFT => "RShift",
        VK_LCONTROL => "LCtrl",
        VK_RCONTROL => "RCtrl",
        VK_LMENU => "LAlt",
        VK_RMENU => "RAlt",
        VK_OEM_1 => "SColon",
        VK_OEM_PLUS => "Equal",
        VK_OEM_COMMA => "Comma",
        VK_OEM_MINUS => "Minus",
        VK_OEM_PERIOD => "Dot",
        VK_OEM_2 => "Slash",
        VK_OEM_3 => "Grave",
        VK_OEM_4 => "LBracket",
        VK_OEM_5 => "Bslash",
        VK_OEM_6 => "RBracket",
        VK_OEM_7 => "Quote",
        _ => return format!("VK{vk:#04X}"),
    };
    name.to_string()
}

/// Keys that need `KEYEVENTF_EXTENDEDKEY` when injected, otherwise Windows maps them to their
/// numpad twins.
pub fn is_extended_key(vk: VirtualKey) -> bool {
    matches!(
        vk,
        VK_PRIOR
            | VK_NEXT
            | VK_END
            | VK_HOME
            | VK_LEFT
            | VK_UP
            | VK_RIGHT
            | VK_DOWN
            | VK_SNAPSHOT
            | VK_INSERT
            | VK_DELETE
            | VK_LWIN
            | VK_RWIN
            | VK_APPS
            | VK_DIVIDE
            | VK_NUMLOCK
            | VK_RCONTROL
            | VK_RMENU
    )
}

#[test]
fn key_names_resolve() {
    assert_eq!(str_to_vk("a"), Some(0x41));
    assert_eq!(str_to_vk("A"), Some(0x41));
    assert_eq!(str_to_vk("7"), Some(0x37));
    assert_eq!(str_to_vk("spc"), Some(VK_SPACE));
    assert_eq!(str_to_vk("f12"), Some(0x7B));
    assert_eq!(str_to_vk("f25"), None);
    assert_eq!(str_to_vk("0x42"), Some(0x42));
    assert_eq!(str_to_vk("66"), Some(0x42));
    assert_eq!(str_to_vk("kp3"), Some(0x63));
    assert_eq!(str_to_vk("nosuchkey"), None);
}

#[test]
fn key_names_display() {
    assert_eq!(vk_to_str(0x42), "B");
    assert_eq!(vk_to_str(VK_CONTROL), "Ctrl");
    assert_eq!(vk_to_str(0x71), "F2");
    assert_eq!(vk_to_str(0xE9), "VK0xE9");
    assert_eq!(str_to_vk(&vk_to_str(VK_LSHIFT)), Some(VK_LSHIFT));
}
