use super::*;

static LAYER_CFG: &str = r#"{ "layers": [
    { "id": "base", "bindings": {
        "65": [ { "trigger": "tap", "action": { "type": "remap", "keys": [66] } } ],
        "112": [ { "trigger": "tap", "action": { "type": "layerToggle", "layerId": "nav" } } ],
        "32": [ { "trigger": "hold", "action": { "type": "layerMomentary", "layerId": "mods" } } ]
    } },
    { "id": "nav", "bindings": {
        "65": [ { "trigger": "tap", "action": { "type": "remap", "keys": [67] } } ],
        "83": [ { "trigger": "tap", "action": { "type": "none" } } ]
    } },
    { "id": "hold-only", "bindings": {
        "65": [ { "trigger": "hold", "action": { "type": "remap", "keys": [68] } } ]
    } },
    { "id": "mods", "defaultModifiers": { "ctrl": true }, "activeKeys": [16] }
] }"#;

#[test]
fn higher_layer_wins() {
    let mut k = engine(LAYER_CFG);
    k.push_layer("nav").unwrap();
    assert_eq!("dn:C up:C", run(&mut k, "d:a u:a"));
    k.pop_layer("nav");
    assert_eq!("dn:B up:B", run(&mut k, "d:a u:a"));
}

#[test]
fn binding_layer_masks_lower_layers() {
    let mut k = engine(LAYER_CFG);
    k.push_layer("hold-only").unwrap();
    // The top layer binds A for Hold only: a quick press is a tap of A itself, not base's B.
    assert_eq!("t:50ms dn:A up:A", run(&mut k, "d:a t:50 u:a"));
    assert_eq!("t:200ms dn:D t:50ms up:D", run(&mut k, "d:a t:250 u:a"));
    k.pop_layer("hold-only");
    assert_eq!("t:50ms dn:B up:B", run(&mut k, "d:a t:50 u:a"));
}

#[test]
fn none_on_higher_layer_blocks_lower_layer() {
    let mut k = engine(LAYER_CFG);
    k.push_layer("nav").unwrap();
    assert_eq!("", run(&mut k, "d:s u:s"));
    k.pop_layer("nav");
    assert_eq!("pass:dn:S pass:up:S", run(&mut k, "d:s u:s"));
}

#[test]
fn toggle_key_flips_layer() {
    let result = simulate(LAYER_CFG, "d:f1 u:f1 d:a u:a d:f1 u:f1 d:a u:a");
    assert_eq!("dn:C up:C dn:B up:B", result);
}

#[test]
fn momentary_layer_holds_its_modifiers() {
    let mut k = engine(LAYER_CFG);
    assert_eq!("t:200ms dn:Ctrl dn:Shift", run(&mut k, "d:spc t:250"));
    assert_eq!(k.get_layer_stack(), vec!["base", "mods"]);
    assert_eq!("up:Shift up:Ctrl", run(&mut k, "u:spc"));
    assert_eq!(k.get_layer_stack(), vec!["base"]);
}

#[test]
fn bindings_are_fixed_at_key_down() {
    let mut k = engine(LAYER_CFG);
    run(&mut k, "d:a t:10");
    k.push_layer("nav").unwrap();
    assert_eq!("t:10ms dn:B up:B", run(&mut k, "t:10 u:a"));
}

#[test]
fn set_layer_keeps_base_underneath() {
    let mut k = engine(LAYER_CFG);
    k.push_layer("nav").unwrap();
    k.push_layer("hold-only").unwrap();
    k.set_layer("mods").unwrap();
    assert_eq!(k.get_layer_stack(), vec!["base", "mods"]);
    k.set_layer("base").unwrap();
    assert_eq!(k.get_layer_stack(), vec!["base"]);
    assert!(k.set_layer("ghost").is_err());
    assert!(k.push_layer("ghost").is_err());
    assert!(k.toggle_layer("ghost").is_err());
    assert_eq!(k.get_layer_stack(), vec!["base"]);
}

#[test]
fn layer_changes_are_announced() {
    let mut k = engine(LAYER_CFG);
    let (tx, rx) = std::sync::mpsc::sync_channel(16);
    k.set_notifier(Some(tx));
    k.push_layer("nav").unwrap();
    // Pushing an active layer again changes nothing.
    k.push_layer("nav").unwrap();
    k.pop_layer("nav");
    let stacks: Vec<Vec<String>> = rx
        .try_iter()
        .filter_map(|msg| match msg {
            keylayer_tcp_protocol::ServerMessage::LayerChange { stack } => Some(stack),
            _ => None,
        })
        .collect();
    assert_eq!(
        stacks,
        vec![vec!["base".to_string(), "nav".to_string()], vec!["base".to_string()]]
    );
}
