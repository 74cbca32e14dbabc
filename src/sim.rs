//! Scripted input for the simulated output backend.
//!
//! A script is whitespace separated `kind:value` tokens:
//!
//! | token       | meaning                                   |
//! |-------------|-------------------------------------------|
//! | `d:a`       | physical press of `a`                     |
//! | `u:a`       | physical release of `a`                   |
//! | `r:a`       | OS auto-repeat of `a`                     |
//! | `id:a`      | injected press of `a`                     |
//! | `iu:a`      | injected release of `a`                   |
//! | `t:50`      | 50ms pass                                 |
//!
//! `↓`, `↑`, `⟳` and `🕐` work in place of `d`, `u`, `r` and `t`. Key names are anything
//! [`str_to_vk`] accepts.

use anyhow::{anyhow, bail, Result};

use keylayer_parser::keys::str_to_vk;

use crate::oskbd::{KeyEvent, KeyValue};
use crate::RemapEngine;

pub fn run_sim(k: &mut RemapEngine, script: &str) -> Result<()> {
    for token in script.split_whitespace() {
        let (kind, val) = token
            .split_once(':')
            .ok_or_else(|| anyhow!("invalid sim token \"{token}\", expected kind:value"))?;
        match kind {
            "t" | "tick" | "🕐" => {
                let ms: u64 = val
                    .parse()
                    .map_err(|_| anyhow!("invalid tick \"{val}\""))?;
                k.tick_ms(ms);
            }
            "d" | "↓" => sim_key(k, val, KeyValue::Press, false)?,
            "u" | "↑" => sim_key(k, val, KeyValue::Release, false)?,
            "r" | "⟳" => sim_key(k, val, KeyValue::Repeat, false)?,
            "id" => sim_key(k, val, KeyValue::Press, true)?,
            "iu" => sim_key(k, val, KeyValue::Release, true)?,
            _ => bail!("unknown sim token kind \"{kind}\" in \"{token}\""),
        }
    }
    Ok(())
}

fn sim_key(k: &mut RemapEngine, name: &str, value: KeyValue, injected: bool) -> Result<()> {
    let code = str_to_vk(name).ok_or_else(|| anyhow!("unknown key name \"{name}\""))?;
    let event = KeyEvent {
        code,
        value,
        injected,
    };
    if !k.handle_input_event(&event)? {
        k.sender.kbd_out.log_passthrough(&event);
    }
    Ok(())
}
