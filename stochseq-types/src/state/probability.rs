//! Probability track types for stochastic per-instrument triggering.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::automation::CurveType;
use crate::{InstrumentRole, Step};

/// Probability forced while a pattern lock holds.
pub const PATTERN_LOCK_PROBABILITY: f32 = 0.9;
/// Boost added once an instrument has missed too many steps in a row.
pub const STARVATION_BOOST: f32 = 0.3;
/// Velocity of an unaccented, unghosted trigger before jitter.
pub const BASE_VELOCITY: f32 = 0.8;
pub const MIN_VELOCITY: f32 = 0.1;
pub const MAX_VELOCITY: f32 = 1.0;
/// Peak-to-peak width of the velocity jitter (±10%).
pub const VELOCITY_JITTER: f32 = 0.2;
pub const ACCENT_MULTIPLIER_RANGE: (f32, f32) = (0.1, 3.0);
pub const GHOST_MULTIPLIER_RANGE: (f32, f32) = (0.1, 1.0);
/// Trigger outcomes kept per instrument.
pub const TRIGGER_HISTORY_LEN: usize = 64;

fn unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Stochastic configuration and trigger history for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbabilityTrack {
    /// Scales every curve sample (0.0-1.0)
    pub base_probability: f32,
    /// Addressed as `curve[step % len]`; never empty
    pub probability_curve: Vec<f32>,
    pub curve_type: CurveType,
    /// Width of the symmetric probability jitter (0.0-1.0)
    pub humanization: f32,
    pub accent_probability: f32,
    /// 0.1-3.0
    pub accent_multiplier: f32,
    pub ghost_note_probability: f32,
    /// 0.1-1.0
    pub ghost_multiplier: f32,
    pub pattern_lock: bool,
    /// At least 1
    pub pattern_lock_steps: u32,
    /// Step of the most recent trigger, if any
    pub last_trigger_step: Option<Step>,
    pub consecutive_misses: u32,
    pub max_consecutive_misses: u32,
}

impl Default for ProbabilityTrack {
    fn default() -> Self {
        Self {
            base_probability: 0.5,
            probability_curve: vec![0.5],
            curve_type: CurveType::Linear,
            humanization: 0.1,
            accent_probability: 0.2,
            accent_multiplier: 1.5,
            ghost_note_probability: 0.1,
            ghost_multiplier: 0.3,
            pattern_lock: false,
            pattern_lock_steps: 4,
            last_trigger_step: None,
            consecutive_misses: 0,
            max_consecutive_misses: 3,
        }
    }
}

impl ProbabilityTrack {
    pub fn with_curve(curve: Vec<f32>) -> Self {
        let mut track = Self::default();
        track.set_curve(curve, CurveType::Linear);
        track
    }

    /// Curve sample for `step`, wrapping on the curve's own length.
    pub fn curve_value(&self, step: Step) -> f32 {
        if self.probability_curve.is_empty() {
            return 0.0;
        }
        self.probability_curve[step as usize % self.probability_curve.len()]
    }

    pub fn set_base_probability(&mut self, probability: f32) {
        self.base_probability = unit(probability);
    }

    /// Replace the curve. Samples are clamped; an empty curve becomes `[0.0]`.
    pub fn set_curve(&mut self, curve: Vec<f32>, curve_type: CurveType) {
        self.probability_curve = if curve.is_empty() {
            vec![0.0]
        } else {
            curve.into_iter().map(unit).collect()
        };
        self.curve_type = curve_type;
    }

    pub fn set_humanization(&mut self, amount: f32) {
        self.humanization = unit(amount);
    }

    pub fn set_accent(&mut self, probability: f32, multiplier: f32) {
        self.accent_probability = unit(probability);
        self.accent_multiplier = clamp_multiplier(multiplier, ACCENT_MULTIPLIER_RANGE);
    }

    pub fn set_ghost(&mut self, probability: f32, multiplier: f32) {
        self.ghost_note_probability = unit(probability);
        self.ghost_multiplier = clamp_multiplier(multiplier, GHOST_MULTIPLIER_RANGE);
    }

    pub fn set_pattern_lock(&mut self, enabled: bool, steps: u32) {
        self.pattern_lock = enabled;
        self.pattern_lock_steps = steps.max(1);
    }

    pub fn set_max_consecutive_misses(&mut self, misses: u32) {
        self.max_consecutive_misses = misses;
    }

    /// Record the outcome of an evaluation at `step`.
    pub fn record_outcome(&mut self, step: Step, triggered: bool) {
        if triggered {
            self.last_trigger_step = Some(step);
            self.consecutive_misses = 0;
        } else {
            self.consecutive_misses = self.consecutive_misses.saturating_add(1);
        }
    }

    /// True once the miss counter has reached its limit.
    pub fn is_starving(&self) -> bool {
        self.consecutive_misses >= self.max_consecutive_misses
    }

    /// Forget trigger history while keeping configuration.
    pub fn clear_history(&mut self) {
        self.last_trigger_step = None;
        self.consecutive_misses = 0;
    }
}

fn clamp_multiplier(value: f32, (min, max): (f32, f32)) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    }
}

/// Result of evaluating one instrument at one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDecision {
    pub triggered: bool,
    /// 0.1-1.0; only meaningful when `triggered`
    pub velocity: f32,
    pub is_accent: bool,
    pub is_ghost: bool,
}

impl TriggerDecision {
    /// A non-trigger. Velocity sits at the floor so the range invariant holds.
    pub fn muted() -> Self {
        Self {
            triggered: false,
            velocity: MIN_VELOCITY,
            is_accent: false,
            is_ghost: false,
        }
    }
}

/// One remembered evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerHistoryEntry {
    pub step: Step,
    pub triggered: bool,
}

/// Per-section probability multipliers for each instrument role.
///
/// Sections or roles without an entry use 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionModifiers {
    table: BTreeMap<String, BTreeMap<InstrumentRole, f32>>,
}

impl SectionModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, section: impl Into<String>, role: InstrumentRole, modifier: f32) {
        self.table
            .entry(section.into())
            .or_default()
            .insert(role, modifier.max(0.0));
    }

    pub fn get(&self, section: &str, role: InstrumentRole) -> f32 {
        self.table
            .get(section)
            .and_then(|roles| roles.get(&role))
            .copied()
            .unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_wraps_on_own_length() {
        let track = ProbabilityTrack::with_curve(vec![0.1, 0.2, 0.3]);
        assert_eq!(track.curve_value(0), 0.1);
        assert_eq!(track.curve_value(4), 0.2);
        assert_eq!(track.curve_value(15), 0.1);
    }

    #[test]
    fn setters_clamp() {
        let mut track = ProbabilityTrack::default();
        track.set_base_probability(1.7);
        track.set_humanization(-0.2);
        track.set_accent(2.0, 10.0);
        track.set_ghost(-1.0, 0.0);
        track.set_pattern_lock(true, 0);
        track.set_curve(vec![1.5, -0.5, f32::NAN], CurveType::Sine);

        assert_eq!(track.base_probability, 1.0);
        assert_eq!(track.humanization, 0.0);
        assert_eq!(track.accent_probability, 1.0);
        assert_eq!(track.accent_multiplier, 3.0);
        assert_eq!(track.ghost_note_probability, 0.0);
        assert_eq!(track.ghost_multiplier, 0.1);
        assert_eq!(track.pattern_lock_steps, 1);
        assert_eq!(track.probability_curve, vec![1.0, 0.0, 0.0]);
        assert_eq!(track.curve_type, CurveType::Sine);
    }

    #[test]
    fn empty_curve_becomes_silent() {
        let mut track = ProbabilityTrack::default();
        track.set_curve(Vec::new(), CurveType::Linear);
        assert_eq!(track.probability_curve, vec![0.0]);
    }

    #[test]
    fn record_outcome_tracks_misses() {
        let mut track = ProbabilityTrack::default();
        track.record_outcome(0, false);
        track.record_outcome(1, false);
        track.record_outcome(2, false);
        assert!(track.is_starving());
        track.record_outcome(3, true);
        assert_eq!(track.last_trigger_step, Some(3));
        assert_eq!(track.consecutive_misses, 0);
        assert!(!track.is_starving());
    }

    #[test]
    fn modifiers_default_to_one() {
        let mut mods = SectionModifiers::new();
        mods.set("Intro", InstrumentRole::Lead, 0.1);
        assert_eq!(mods.get("Intro", InstrumentRole::Lead), 0.1);
        assert_eq!(mods.get("Intro", InstrumentRole::Kick), 1.0);
        assert_eq!(mods.get("Outro", InstrumentRole::Lead), 1.0);
    }

    #[test]
    fn track_serializes_camel_case() {
        let json = serde_json::to_value(ProbabilityTrack::default()).unwrap();
        assert!(json.get("baseProbability").is_some());
        assert!(json.get("ghostNoteProbability").is_some());
        assert!(json.get("patternLockSteps").is_some());
    }
}
