//! # stochseq-types
//!
//! Shared type definitions for the stochseq step engine.
//! This crate contains the data model (automation tracks, sections, probability
//! tracks, morph state) together with the pure curve and layout math that
//! operates on it. Stateful engines live in stochseq-core.

pub mod curve;
pub mod state;

pub use curve::{interpolate, normalize_values, resolve_breakpoints};

// Re-export all state types at crate root for convenience
pub use state::*;

/// Index of one slot in the fixed-length sequencer timeline.
pub type Step = u32;

/// Default number of steps in a pattern.
pub const DEFAULT_STEP_COUNT: usize = 16;

/// Instrument voices the trigger engine decides for.
///
/// Serialized as the lowercase key used in presets (`"kick"`, `"hats"`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentRole {
    Kick,
    Snare,
    Hats,
    Bass,
    Lead,
    Fx,
}

impl InstrumentRole {
    pub const ALL: [InstrumentRole; 6] = [
        InstrumentRole::Kick,
        InstrumentRole::Snare,
        InstrumentRole::Hats,
        InstrumentRole::Bass,
        InstrumentRole::Lead,
        InstrumentRole::Fx,
    ];

    /// Preset key for this role.
    pub fn key(&self) -> &'static str {
        match self {
            InstrumentRole::Kick => "kick",
            InstrumentRole::Snare => "snare",
            InstrumentRole::Hats => "hats",
            InstrumentRole::Bass => "bass",
            InstrumentRole::Lead => "lead",
            InstrumentRole::Fx => "fx",
        }
    }

    /// Parse a preset key. Unknown keys yield `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.key() == key)
    }
}

impl std::fmt::Display for InstrumentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
