use super::*;

static INTERRUPT_CFG: &str = r#"{ "layers": [
    { "id": "base", "bindings": {
        "32": [
            { "trigger": "tap", "action": { "type": "remap", "keys": [32] } },
            { "trigger": "hold", "action": { "type": "layerMomentary", "layerId": "nav" } }
        ],
        "65": [
            { "trigger": "hold", "action": { "type": "remap", "keys": [16] } }
        ],
        "83": [
            { "trigger": "tap", "action": { "type": "remap", "keys": [84] } }
        ]
    } },
    { "id": "nav", "bindings": {
        "74": [ { "trigger": "tap", "action": { "type": "remap", "keys": [37] } } ]
    } }
] }"#;

#[test]
fn press_during_pending_momentary_uses_the_layer() {
    let mut k = engine(INTERRUPT_CFG);
    let result = run(&mut k, "d:spc t:50 d:j t:20 u:j t:20 u:spc");
    assert_eq!("t:70ms dn:Left up:Left", result);
    assert_eq!(k.get_layer_stack(), vec!["base"]);
}

#[test]
fn layer_stays_while_held_after_interrupt() {
    let mut k = engine(INTERRUPT_CFG);
    run(&mut k, "d:spc t:10 d:j");
    assert_eq!(k.get_layer_stack(), vec!["base", "nav"]);
    run(&mut k, "u:j t:500");
    assert_eq!(k.get_layer_stack(), vec!["base", "nav"]);
    run(&mut k, "u:spc");
    assert_eq!(k.get_layer_stack(), vec!["base"]);
}

#[test]
fn press_during_pending_remap_holds_the_remap() {
    let result = simulate(INTERRUPT_CFG, "d:a t:50 d:c t:20 u:c t:20 u:a");
    assert_eq!("t:50ms dn:Shift dn:C t:20ms up:C t:20ms up:Shift", result);
}

#[test]
fn interrupted_tap_remap_is_held_then_released() {
    let result = simulate(INTERRUPT_CFG, "d:s t:10 d:z t:10 u:s t:10 u:z");
    assert_eq!("t:10ms dn:T dn:Z t:10ms up:T t:10ms up:Z", result);
}

#[test]
fn interrupts_resolve_in_press_order() {
    let result = simulate(INTERRUPT_CFG, "d:s t:10 d:a t:10 d:z u:z u:a u:s");
    assert_eq!(
        "t:10ms dn:T t:10ms dn:Shift dn:Z up:Z up:Shift up:T",
        result
    );
}

#[test]
fn plain_key_without_pending_keys_is_untouched() {
    let result = simulate(INTERRUPT_CFG, "d:s t:10 u:s d:z t:10 u:z");
    assert_eq!("t:10ms dn:T up:T pass:dn:Z t:10ms pass:up:Z", result);
}
