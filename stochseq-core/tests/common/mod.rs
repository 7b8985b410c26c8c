#![allow(dead_code)]
//! Shared fixtures for stochseq-core integration tests.

use stochseq_core::config::Config;
use stochseq_core::{Engine, TickReport};
use stochseq_types::{CurveType, InstrumentRole, Step};

/// Engine built from the embedded configuration with `seed`.
pub fn engine_with_seed(seed: f64) -> Engine {
    let config = Config::from_toml_str(&format!("[engine]\nseed = {:?}\n", seed))
        .expect("seed override parses");
    Engine::new(config)
}

/// Kick at base 0.8 over a flat 0.9 curve with no humanization.
pub fn flat_kick_engine(seed: f64) -> Engine {
    let mut engine = engine_with_seed(seed);
    let trigger = engine.trigger_mut();
    trigger.set_base_probability(InstrumentRole::Kick, 0.8);
    trigger.set_probability_curve(InstrumentRole::Kick, vec![0.9; 16], CurveType::Linear);
    trigger.set_humanization(InstrumentRole::Kick, 0.0);
    engine
}

/// Tick steps `0..n` in order, wrapping on the engine's step count.
pub fn play(engine: &mut Engine, n: Step) -> Vec<TickReport> {
    (0..n).map(|step| engine.tick(step, None)).collect()
}

/// Which steps fired for `role`.
pub fn trigger_pattern(reports: &[TickReport], role: InstrumentRole) -> Vec<bool> {
    reports
        .iter()
        .map(|r| r.decision(role).is_some_and(|d| d.triggered))
        .collect()
}
