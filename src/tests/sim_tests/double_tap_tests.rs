use super::*;

static DOUBLE_TAP_CFG: &str = r#"{ "layers": [ { "id": "base", "bindings": {
    "65": [
        { "trigger": "tap", "action": { "type": "remap", "keys": [66] } },
        { "trigger": "doubleTap", "action": { "type": "remap", "keys": [67] } }
    ],
    "68": [
        { "trigger": "doubleTap", "action": { "type": "remap", "keys": [69] }, "timingMs": 100 }
    ],
    "70": [
        { "trigger": "tap", "action": { "type": "remap", "keys": [71] } },
        { "trigger": "hold", "action": { "type": "remap", "keys": [17] } },
        { "trigger": "doubleTap", "action": { "type": "remap", "keys": [72] } }
    ]
} } ] }"#;

#[test]
fn double_tap_replaces_tap() {
    let result = simulate(DOUBLE_TAP_CFG, "d:a t:50 u:a t:50 d:a t:50 u:a t:500");
    assert_eq!("t:150ms dn:C up:C", result);
}

#[test]
fn single_tap_waits_for_window_to_close() {
    let result = simulate(DOUBLE_TAP_CFG, "d:a t:50 u:a t:400");
    assert_eq!("t:350ms dn:B up:B", result);
}

#[test]
fn spaced_taps_are_two_taps() {
    let result = simulate(DOUBLE_TAP_CFG, "d:a t:50 u:a t:400 d:a t:50 u:a t:400");
    assert_eq!("t:350ms dn:B up:B t:400ms dn:B up:B", result);
}

#[test]
fn third_tap_starts_over() {
    let result = simulate(
        DOUBLE_TAP_CFG,
        "d:a t:20 u:a t:20 d:a t:20 u:a t:20 d:a t:20 u:a t:400",
    );
    assert_eq!("t:60ms dn:C up:C t:300ms dn:B up:B", result);
}

#[test]
fn per_binding_interval() {
    let result = simulate(DOUBLE_TAP_CFG, "d:d t:10 u:d t:150 d:d t:10 u:d t:150");
    // No tap binding: each lone tap sends D itself once its window closes.
    assert_eq!("t:110ms dn:D up:D t:160ms dn:D up:D", result);
}

#[test]
fn other_key_flushes_pending_tap() {
    let result = simulate(DOUBLE_TAP_CFG, "d:a t:50 u:a t:50 d:z t:10 u:z");
    assert_eq!("t:100ms dn:B up:B dn:Z t:10ms up:Z", result);
}

#[test]
fn hold_after_tap_flushes_pending_tap() {
    let result = simulate(DOUBLE_TAP_CFG, "d:f t:50 u:f t:50 d:f t:300 u:f");
    assert_eq!("t:300ms dn:G up:G dn:Ctrl t:100ms up:Ctrl", result);
}
