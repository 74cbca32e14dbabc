use super::*;

static REPEAT_CFG: &str = r#"{ "layers": [ { "id": "base", "bindings": {
    "65": [
        { "trigger": "tap", "action": { "type": "remap", "keys": [66] } },
        { "trigger": "hold", "action": { "type": "remap", "keys": [66], "repeat": true,
          "repeatDelayMs": 100, "repeatIntervalMs": 50 } }
    ],
    "67": [
        { "trigger": "hold", "action": { "type": "remap", "keys": [68], "repeat": true,
          "repeatDelayMs": 0, "repeatIntervalMs": 0 } }
    ]
} } ] }"#;

#[test]
fn hold_repeats_until_release() {
    let result = simulate(REPEAT_CFG, "d:a t:400 u:a t:200");
    assert_eq!(
        "t:200ms dn:B up:B t:100ms dn:B up:B t:50ms dn:B up:B t:50ms dn:B up:B",
        result
    );
}

#[test]
fn release_before_hold_is_a_plain_tap() {
    let result = simulate(REPEAT_CFG, "d:a t:100 u:a t:500");
    assert_eq!("t:100ms dn:B up:B", result);
}

#[test]
fn zero_interval_is_clamped() {
    let result = simulate(REPEAT_CFG, "d:c t:203 u:c t:10");
    assert_eq!(
        "t:200ms dn:D up:D t:1ms dn:D up:D t:1ms dn:D up:D t:1ms dn:D up:D",
        result
    );
}

#[test]
fn os_repeats_of_remapped_keys_are_swallowed() {
    let result = simulate(REPEAT_CFG, "d:a r:a r:a t:20 u:a");
    assert_eq!("t:20ms dn:B up:B", result);
}

#[test]
fn os_repeats_of_unbound_keys_pass_through() {
    let result = simulate(REPEAT_CFG, "d:z r:z u:z");
    assert_eq!("pass:dn:Z pass:dn:Z pass:up:Z", result);
}
