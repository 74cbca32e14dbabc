use super::*;
use crate::MAX_MACRO_DEPTH;

static MACRO_CFG: &str = r#"{
    "layers": [ { "id": "base", "bindings": {
        "65": [ { "trigger": "tap", "action": { "type": "macro", "macroId": "hi" } } ],
        "66": [ { "trigger": "tap", "action": { "type": "macro", "macroId": "outer" } } ],
        "67": [ { "trigger": "tap", "action": { "type": "macro", "macroId": "loop" } } ],
        "68": [ { "trigger": "tap", "action": { "type": "macro", "macroId": "ghost" } } ],
        "69": [ { "trigger": "tap", "action": { "type": "delay", "delayMs": 100 } } ]
    } } ],
    "macros": [
        { "id": "hi", "name": "greeting", "actions": [
            { "type": "remap", "keys": [72] },
            { "type": "delay", "delayMs": 50 },
            { "type": "remap", "keys": [73] }
        ] },
        { "id": "outer", "actions": [
            { "type": "remap", "keys": [74] },
            { "type": "macro", "macroId": "hi" },
            { "type": "remap", "keys": [75] }
        ] },
        { "id": "loop", "actions": [
            { "type": "remap", "keys": [76] },
            { "type": "macro", "macroId": "loop" },
            { "type": "remap", "keys": [77] }
        ] }
    ]
}"#;

#[test]
fn steps_run_in_order_with_delays() {
    let result = simulate(MACRO_CFG, "d:a u:a t:100");
    assert_eq!("dn:H up:H t:50ms dn:I up:I", result);
}

#[test]
fn keys_pressed_during_a_delay_are_not_held_back() {
    let result = simulate(MACRO_CFG, "d:a u:a t:10 d:z u:z t:100");
    assert_eq!("dn:H up:H t:10ms pass:dn:Z pass:up:Z t:40ms dn:I up:I", result);
}

#[test]
fn nested_macro_finishes_before_caller_continues() {
    let result = simulate(MACRO_CFG, "d:b u:b t:100");
    assert_eq!("dn:J up:J dn:H up:H t:50ms dn:I up:I dn:K up:K", result);
}

#[test]
fn self_reference_runs_once() {
    let result = simulate(MACRO_CFG, "d:c u:c t:10");
    assert_eq!("dn:L up:L dn:M up:M", result);
}

#[test]
fn unknown_macro_is_a_no_op() {
    let result = simulate(MACRO_CFG, "d:d u:d t:10");
    assert_eq!("", result);
}

#[test]
fn delay_outside_a_macro_is_a_no_op() {
    let result = simulate(MACRO_CFG, "d:e u:e t:200 d:a u:a");
    assert_eq!("t:200ms dn:H up:H", result);
}

#[test]
fn nesting_stops_at_depth_limit() {
    // m0 -> m1 -> ... -> m19, each sending its own key before descending.
    let macros: Vec<String> = (0..20)
        .map(|i| {
            let next = if i < 19 {
                format!(r#", {{ "type": "macro", "macroId": "m{}" }}"#, i + 1)
            } else {
                String::new()
            };
            format!(
                r#"{{ "id": "m{i}", "actions": [ {{ "type": "remap", "keys": [{}] }}{next} ] }}"#,
                0x41 + i
            )
        })
        .collect();
    let cfg = format!(
        r#"{{ "layers": [ {{ "id": "base", "bindings": {{ "112": [
            {{ "trigger": "tap", "action": {{ "type": "macro", "macroId": "m0" }} }} ] }} }} ],
            "macros": [ {} ] }}"#,
        macros.join(", ")
    );
    let result = simulate(&cfg, "d:f1 u:f1");
    let expected: Vec<String> = (0..MAX_MACRO_DEPTH)
        .map(|i| {
            let key = char::from(b'A' + i as u8);
            format!("dn:{key} up:{key}")
        })
        .collect();
    assert_eq!(expected.join(" "), result);
}

#[test]
fn add_macro_rejects_cycles() {
    let mut k = engine(MACRO_CFG);
    let err = k
        .add_macro(MacroDef {
            id: "hi".into(),
            name: "greeting".into(),
            actions: vec![Action::Macro {
                macro_id: "outer".into(),
            }],
        })
        .unwrap_err();
    assert!(err.to_string().contains("hi -> outer -> hi"), "{err}");
    assert_eq!(k.config().get_macro("hi").unwrap().actions.len(), 3);
}

#[test]
fn macro_steps_do_not_interleave_with_repeat() {
    let cfg = r#"{
        "layers": [ { "id": "base", "bindings": {
            "65": [ { "trigger": "hold", "action": { "type": "remap", "keys": [66], "repeat": true,
                      "repeatDelayMs": 100, "repeatIntervalMs": 50 } } ],
            "70": [ { "trigger": "tap", "action": { "type": "macro", "macroId": "xyz" } } ]
        } } ],
        "macros": [ { "id": "xyz", "actions": [
            { "type": "remap", "keys": [88] },
            { "type": "remap", "keys": [89] },
            { "type": "remap", "keys": [90] }
        ] } ]
    }"#;
    let result = simulate(cfg, "d:a t:320 d:f u:f t:100 u:a");
    assert_eq!(
        "t:200ms dn:B up:B t:100ms dn:B up:B \
         t:20ms dn:X up:X dn:Y up:Y dn:Z up:Z \
         t:30ms dn:B up:B t:50ms dn:B up:B",
        result
    );
}
