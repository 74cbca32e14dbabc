use super::*;

static MOUSE_CFG: &str = r#"{
    "layers": [ { "id": "base", "bindings": {
        "65": [ { "trigger": "tap", "action": { "type": "mouseMove", "x": 5, "y": 6 } } ],
        "66": [ { "trigger": "tap", "action": { "type": "cursorReturn", "delayMs": 50 } } ],
        "67": [ { "trigger": "tap", "action": { "type": "macro", "macroId": "click-and-back" } } ],
        "68": [ { "trigger": "tap", "action": { "type": "mouseClick", "x": 1, "y": 2,
                   "button": "right", "clickCount": 2 } } ]
    } } ],
    "macros": [
        { "id": "click-and-back", "actions": [
            { "type": "mouseClick", "x": 10, "y": 20 },
            { "type": "cursorReturn", "delayMs": 100 },
            { "type": "remap", "keys": [13] }
        ] }
    ]
}"#;

#[test]
fn click_moves_then_clicks() {
    let result = simulate(MOUSE_CFG, "d:d u:d");
    assert_eq!("mv:1,2 mdn:Right mup:Right mdn:Right mup:Right", result);
}

#[test]
fn cursor_returns_to_position_before_first_move() {
    let result = simulate(MOUSE_CFG, "d:a u:a d:d u:d d:b u:b t:100");
    assert_eq!(
        "mv:5,6 mv:1,2 mdn:Right mup:Right mdn:Right mup:Right t:50ms mv:0,0",
        result
    );
}

#[test]
fn cursor_return_in_macro_waits_before_next_step() {
    let result = simulate(MOUSE_CFG, "d:c u:c t:200");
    assert_eq!("mv:10,20 mdn:Left mup:Left t:100ms mv:0,0 dn:Enter up:Enter", result);
}

#[test]
fn later_cursor_return_replaces_earlier_one() {
    let result = simulate(MOUSE_CFG, "d:a u:a d:b u:b t:30 d:b u:b t:100");
    assert_eq!("mv:5,6 t:80ms mv:0,0", result);
}

#[test]
fn cursor_return_without_movement_does_nothing() {
    let result = simulate(MOUSE_CFG, "d:b u:b t:100");
    assert_eq!("", result);
}
