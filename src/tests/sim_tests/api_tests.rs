use super::*;
use keylayer_tcp_protocol::{KeyAction, ServerMessage};

static API_CFG: &str = r#"{ "layers": [
    { "id": "base", "bindings": {
        "65": [ { "trigger": "tap", "action": { "type": "remap", "keys": [66] } } ],
        "32": [ { "trigger": "hold", "action": { "type": "layerMomentary", "layerId": "nav" } } ],
        "83": [ { "trigger": "hold", "action": { "type": "remap", "keys": [16] } } ]
    } },
    { "id": "nav", "defaultModifiers": { "alt": true } }
] }"#;

struct BrokenStore;

impl ConfigStore for BrokenStore {
    fn save(&mut self, _cfg: &RemapConfig) -> keylayer_parser::cfg::Result<()> {
        Err(CfgError::Io {
            path: "keylayer.json".into(),
            source: std::io::Error::other("disk full"),
        })
    }
}

#[test]
fn edits_are_live_and_persisted() {
    let mut k = engine(API_CFG);
    let store = MemoryStore::default();
    k.set_store(Some(Box::new(store.clone())));

    k.add_binding(
        "base",
        90,
        KeyBinding::new(Trigger::Tap, Action::remap(vec![88])),
    )
    .unwrap();
    assert_eq!(store.save_count(), 1);
    assert_eq!("dn:X up:X", run(&mut k, "d:z u:z"));

    k.remove_binding("base", 90, Trigger::Tap).unwrap();
    assert_eq!(store.save_count(), 2);
    assert_eq!("pass:dn:Z pass:up:Z", run(&mut k, "d:z u:z"));

    let saved = store.last_saved().unwrap();
    assert!(saved.layer("base").unwrap().binding(90, Trigger::Tap).is_none());
}

#[test]
fn failed_edits_are_not_persisted() {
    let mut k = engine(API_CFG);
    let store = MemoryStore::default();
    k.set_store(Some(Box::new(store.clone())));

    k.remove_layer("base").unwrap();
    assert!(k.add_layer(Layer::new("nav")).is_err());
    assert!(k.remove_binding("base", 90, Trigger::Tap).is_err());
    assert!(
        k.add_binding("ghost", 90, KeyBinding::new(Trigger::Tap, Action::None))
            .is_err()
    );
    assert_eq!(store.save_count(), 0);
    assert_eq!(k.get_layers(), vec!["base", "nav"]);
}

#[test]
fn save_failure_keeps_the_change() {
    let mut k = engine(API_CFG);
    k.set_store(Some(Box::new(BrokenStore)));
    let err = k
        .add_binding(
            "base",
            90,
            KeyBinding::new(Trigger::Tap, Action::remap(vec![88])),
        )
        .unwrap_err();
    assert!(err.to_string().contains("not saved"), "{err}");
    assert_eq!("dn:X up:X", run(&mut k, "d:z u:z"));
}

#[test]
fn removing_an_active_layer_releases_its_holder() {
    let mut k = engine(API_CFG);
    assert_eq!("t:200ms dn:Alt", run(&mut k, "d:spc t:200"));
    assert_eq!(k.get_layer_stack(), vec!["base", "nav"]);
    k.remove_layer("nav").unwrap();
    assert_eq!(k.get_layer_stack(), vec!["base"]);
    assert_eq!("t:200ms dn:Alt up:Alt", k.sender.kbd_out.outputs.to_ascii());
    assert!(k.sender.pressed_keys().is_empty());
    // The physical release has nothing left to undo.
    assert_eq!("", run(&mut k, "u:spc"));
}

#[test]
fn accessors_report_bindings_and_resolution() {
    let mut k = engine(API_CFG);
    k.add_binding(
        "nav",
        65,
        KeyBinding::new(Trigger::Hold, Action::remap(vec![67])).with_timing(150),
    )
    .unwrap();

    let bindings = k.get_bindings(65);
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0].0, "base");
    assert_eq!(bindings[1].1[0].timing_ms, Some(150));

    assert_eq!(k.get_action(65, Trigger::Hold), None);
    let (layer, _) = k.get_action(65, Trigger::Tap).unwrap();
    assert_eq!(layer, "base");
    k.push_layer("nav").unwrap();
    let (layer, action) = k.get_action(65, Trigger::Hold).unwrap();
    assert_eq!(layer, "nav");
    assert_eq!(action, Action::remap(vec![67]));
    // nav binds 65, so base's tap is masked.
    assert_eq!(k.get_action(65, Trigger::Tap), None);
}

#[test]
fn release_all_lifts_every_synthetic_key() {
    let mut k = engine(API_CFG);
    assert_eq!("t:200ms dn:Shift", run(&mut k, "d:s t:200"));
    k.release_all();
    assert!(k.sender.pressed_keys().is_empty());
    assert_eq!("up:Shift", k.sender.kbd_out.outputs.to_ascii().split(" ").last().unwrap());
}

#[test]
fn reset_returns_to_base() {
    let mut k = engine(API_CFG);
    run(&mut k, "d:spc t:200 d:s t:300");
    assert_eq!(k.get_layer_stack(), vec!["base", "nav"]);
    k.sender.kbd_out.outputs.clear();
    k.reset();
    assert_eq!(k.get_layer_stack(), vec!["base"]);
    assert_eq!("up:Shift up:Alt", k.sender.kbd_out.outputs.to_ascii());
    // Releases after a reset are strays and go back to the OS.
    assert_eq!("pass:up:S pass:up:Space", run(&mut k, "u:s u:spc"));
}

#[test]
fn key_events_are_announced() {
    let mut k = engine(API_CFG);
    let (tx, rx) = std::sync::mpsc::sync_channel(16);
    k.set_notifier(Some(tx));
    run(&mut k, "d:a u:a id:c iu:c");
    let events: Vec<(String, KeyAction)> = rx
        .try_iter()
        .filter_map(|msg| match msg {
            ServerMessage::KeyEvent { key, action, .. } => Some((key, action)),
            _ => None,
        })
        .collect();
    assert_eq!(
        events,
        vec![
            ("A".to_string(), KeyAction::Press),
            ("A".to_string(), KeyAction::Release)
        ]
    );
}
