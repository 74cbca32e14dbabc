use crate::tests::*;
use crate::{sim::run_sim, RemapEngine};

mod api_tests;
mod double_tap_tests;
mod interrupt_tests;
mod layer_sim_tests;
mod macro_sim_tests;
mod mouse_sim_tests;
mod repeat_sim_tests;
mod tap_hold_tests;

fn engine(cfg: &str) -> RemapEngine {
    init_log();
    RemapEngine::new_from_str(cfg).expect("failed to parse cfg")
}

fn run(k: &mut RemapEngine, sim: &str) -> String {
    k.sender.kbd_out.outputs.clear();
    run_sim(k, sim).expect("valid sim script");
    k.sender.kbd_out.outputs.to_ascii()
}

fn simulate(cfg: &str, sim: &str) -> String {
    run(&mut engine(cfg), sim)
}
