use super::*;

impl RemapConfig {
    /// Lists problems that the engine will treat as no-ops at runtime.
    pub fn check(&self) -> Vec<String> {
        let mut warnings = vec![];
        for layer in &self.layers {
            for (vk, slot) in &layer.bindings {
                for b in slot {
                    let at = format!("layer \"{}\" key {} {}", layer.id, vk_to_str(*vk), b.trigger);
                    self.check_action(&at, &b.action, &mut warnings);
                    if matches!(b.action, Action::LayerMomentary { .. }) && b.trigger != Trigger::Hold {
                        warnings.push(format!("{at}: layerMomentary only runs on hold"));
                    }
                }
            }
        }
        for m in &self.macros {
            let at = format!("macro \"{}\"", m.id);
            for a in &m.actions {
                self.check_action(&at, a, &mut warnings);
                if matches!(a, Action::LayerMomentary { .. }) {
                    warnings.push(format!("{at}: layerMomentary has no effect inside a macro"));
                }
            }
            if let Some(path) = find_macro_cycle(&self.macros, &m.id) {
                warnings.push(format!("{at}: reference cycle {}", path.join(" -> ")));
            }
        }
        warnings
    }

    fn check_action(&self, at: &str, action: &Action, warnings: &mut Vec<String>) {
        if let Some(layer_id) = action.layer_ref() {
            if self.layer(layer_id).is_none() {
                warnings.push(format!("{at}: unknown layer \"{layer_id}\""));
            }
        }
        if let Some(macro_id) = action.macro_ref() {
            if self.get_macro(macro_id).is_none() {
                warnings.push(format!("{at}: unknown macro \"{macro_id}\""));
            }
        }
        if let Action::Remap { keys, modifiers, .. } = action {
            if keys.is_empty() && modifiers.map_or(true, |m| m.is_empty()) {
                warnings.push(format!("{at}: remap sends no keys"));
            }
        }
    }
}

/// Depth-first walk of macro references starting at `start`. Returns the offending chain if
/// `start` can reach itself.
pub fn find_macro_cycle(macros: &[MacroDef], start: &str) -> Option<Vec<String>> {
    fn visit(macros: &[MacroDef], id: &str, start: &str, chain: &mut Vec<String>) -> bool {
        let Some(def) = macros.iter().find(|m| m.id == id) else {
            return false;
        };
        for next in def.actions.iter().filter_map(Action::macro_ref) {
            if next == start {
                chain.push(next.to_string());
                return true;
            }
            if chain.iter().any(|c| c == next) {
                // Cycle not involving `start`; it is reported when walking from its own root.
                continue;
            }
            chain.push(next.to_string());
            if visit(macros, next, start, chain) {
                return true;
            }
            chain.pop();
        }
        false
    }

    let mut chain = vec![start.to_string()];
    visit(macros, start, start, &mut chain).then_some(chain)
}
