//! # stochseq-core
//!
//! Generative engine for a step sequencer: seeded probabilistic triggers,
//! per-step parameter automation over named sections, and timed morphs
//! between section snapshots. Independent of any audio backend or UI.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stochseq_core::config::Config;
//! use stochseq_core::engine::Engine;
//! use stochseq_types::{Easing, InstrumentRole};
//!
//! // 1. Build the engine from embedded defaults plus the user config file
//! let mut engine = Engine::new(Config::load());
//!
//! // 2. Optionally schedule a morph between two sections
//! engine.start_morph("Intro", "Peak", 4, Easing::EaseInOut)?;
//!
//! // 3. Call tick once per step from the playback clock
//! let report = engine.tick(step, None);
//! for role in report.triggered() { /* fire notes */ }
//!
//! // 4. Presets are plain JSON values
//! let preset = engine.export_preset();
//! engine.import_preset(&preset)?;
//! ```
//!
//! ## Module Overview
//!
//! - [`engine`]: `Engine` and `TickReport`, the per-step orchestration
//! - [`trigger`]: `TriggerEngine`: probability, accents, ghosts, velocity
//! - [`morph`]: `MorphEngine`: section snapshots and eased blends
//! - [`persistence`]: JSON preset export and lenient import
//! - [`config`]: TOML configuration loading (embedded + user override)

pub mod config;
pub mod engine;
pub mod morph;
pub mod persistence;
pub mod trigger;

pub use engine::{Engine, TickReport};
