use super::*;

static TAP_AND_HOLD_CFG: &str = r#"{ "layers": [ { "id": "base", "bindings": {
    "65": [
        { "trigger": "tap", "action": { "type": "remap", "keys": [66] } },
        { "trigger": "hold", "action": { "type": "remap", "keys": [16] } }
    ],
    "67": [
        { "trigger": "hold", "action": { "type": "remap", "keys": [68] }, "timingMs": 100 }
    ],
    "69": [
        { "trigger": "tap", "action": { "type": "remap", "keys": [70] } }
    ]
} } ] }"#;

#[test]
fn tap_sends_remap_on_release() {
    let result = simulate(TAP_AND_HOLD_CFG, "d:a t:50 u:a t:50");
    assert_eq!("t:50ms dn:B up:B", result);
}

#[test]
fn hold_presses_remap_until_release() {
    let result = simulate(TAP_AND_HOLD_CFG, "d:a t:300 u:a t:50");
    assert_eq!("t:200ms dn:Shift t:100ms up:Shift", result);
}

#[test]
fn release_exactly_at_threshold_is_hold() {
    let result = simulate(TAP_AND_HOLD_CFG, "d:a t:200 u:a");
    assert_eq!("t:200ms dn:Shift up:Shift", result);
}

#[test]
fn per_binding_threshold() {
    let result = simulate(TAP_AND_HOLD_CFG, "d:c t:150 u:c");
    assert_eq!("t:100ms dn:D t:50ms up:D", result);
}

#[test]
fn long_press_of_tap_only_key_is_a_hold() {
    let result = simulate(TAP_AND_HOLD_CFG, "d:e t:1000 u:e t:50 d:e t:50 u:e");
    assert_eq!("t:1100ms dn:F up:F", result);
}

#[test]
fn tap_without_tap_binding_sends_original_key() {
    let result = simulate(TAP_AND_HOLD_CFG, "d:c t:40 u:c");
    assert_eq!("t:40ms dn:C up:C", result);
}

#[test]
fn unbound_key_passes_through() {
    let result = simulate(TAP_AND_HOLD_CFG, "d:z t:10 u:z");
    assert_eq!("pass:dn:Z t:10ms pass:up:Z", result);
}

#[test]
fn injected_events_pass_through() {
    let result = simulate(TAP_AND_HOLD_CFG, "id:a t:300 iu:a");
    assert_eq!("pass:dn:A t:300ms pass:up:A", result);
}

#[test]
fn stray_release_passes_through() {
    let result = simulate(TAP_AND_HOLD_CFG, "u:a");
    assert_eq!("pass:up:A", result);
}

#[test]
fn modifiers_wrap_remapped_keys() {
    let result = simulate(
        r#"{ "layers": [ { "id": "base", "bindings": { "65": [
            { "trigger": "tap", "action": { "type": "remap", "keys": [66, 67],
              "modifiers": { "ctrl": true, "shift": true } } }
        ] } } ] }"#,
        "d:a u:a",
    );
    assert_eq!(
        "dn:Ctrl dn:Shift dn:B dn:C up:C up:B up:Shift up:Ctrl",
        result
    );
}

#[test]
fn explicit_none_swallows_the_key() {
    let result = simulate(
        r#"{ "layers": [ { "id": "base", "bindings": { "65": [
            { "trigger": "tap", "action": { "type": "none" } }
        ] } } ] }"#,
        "d:a t:10 u:a t:10 d:a t:300 u:a",
    );
    assert_eq!("", result);
}

#[test]
fn send_failures_do_not_break_the_hook() {
    let mut k = engine(TAP_AND_HOLD_CFG);
    k.sender.kbd_out.reject_sends = true;
    assert_eq!("", run(&mut k, "d:a t:50 u:a d:a t:250 u:a"));
    assert!(k.sender.pressed_keys().is_empty());
    k.sender.kbd_out.reject_sends = false;
    assert_eq!("t:10ms dn:B up:B", run(&mut k, "d:a t:10 u:a"));
}
