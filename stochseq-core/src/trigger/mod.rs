//! Trigger Decision Engine: per-step, per-instrument trigger decisions.
//!
//! Each registered instrument owns a [`ProbabilityTrack`]. For a step the
//! engine computes a probability from the track's curve, pattern lock,
//! starvation boost, section modifier and humanization, then compares a
//! seeded draw against it. Accent, ghost and velocity jitter use their own
//! draw streams.

pub mod rng;

use std::collections::{BTreeMap, VecDeque};

use stochseq_types::{
    CurveType, InstrumentRole, ProbabilityTrack, SectionModifiers, Step, TriggerDecision,
    TriggerHistoryEntry, BASE_VELOCITY, MAX_VELOCITY, MIN_VELOCITY, PATTERN_LOCK_PROBABILITY,
    STARVATION_BOOST, TRIGGER_HISTORY_LEN, VELOCITY_JITTER,
};

use crate::config::{Config, ProbabilitySettings};
use rng::{default_curve, SeededRandom, Stream};

/// Declarative defaults every track is rebuilt from on reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerDefaults {
    pub generic: ProbabilitySettings,
    pub roles: BTreeMap<InstrumentRole, ProbabilitySettings>,
    pub modifiers: SectionModifiers,
    pub entropy: f32,
    pub quantization: u32,
}

impl TriggerDefaults {
    pub fn from_config(config: &Config) -> Self {
        let roles = InstrumentRole::ALL
            .iter()
            .filter_map(|role| {
                config
                    .instrument_settings(*role)
                    .map(|settings| (*role, settings.clone()))
            })
            .collect();
        Self {
            generic: config.probability_defaults().clone(),
            roles,
            modifiers: config.section_modifiers(),
            entropy: config.entropy(),
            quantization: config.quantization(),
        }
    }
}

pub struct TriggerEngine {
    rng: SeededRandom,
    step_count: usize,
    entropy: f32,
    quantization: u32,
    tracks: BTreeMap<InstrumentRole, ProbabilityTrack>,
    history: BTreeMap<InstrumentRole, VecDeque<TriggerHistoryEntry>>,
    defaults: TriggerDefaults,
}

impl TriggerEngine {
    /// Create an engine with every role registered from `defaults`.
    pub fn new(seed: f64, step_count: usize, defaults: TriggerDefaults) -> Self {
        let mut engine = Self {
            rng: SeededRandom::new(seed),
            step_count: step_count.max(1),
            entropy: 0.0,
            quantization: 1,
            tracks: BTreeMap::new(),
            history: BTreeMap::new(),
            defaults,
        };
        engine.reset_to_defaults();
        engine
    }

    /// Default track for `role`: seeded curve, generic settings, then role settings.
    pub fn default_track(&self, role: InstrumentRole) -> ProbabilityTrack {
        let mut track = ProbabilityTrack::default();
        track.set_curve(default_curve(self.step_count, &self.rng), CurveType::Linear);
        self.defaults.generic.apply_to(&mut track);
        if let Some(settings) = self.defaults.roles.get(&role) {
            settings.apply_to(&mut track);
        }
        track
    }

    /// Rebuild every track from defaults and clear all history.
    pub fn reset_to_defaults(&mut self) {
        self.tracks = InstrumentRole::ALL
            .iter()
            .map(|role| (*role, self.default_track(*role)))
            .collect();
        self.history.clear();
        self.set_entropy(self.defaults.entropy);
        self.set_quantization(self.defaults.quantization);
    }

    /// Add or replace the track for `role`.
    pub fn register(&mut self, role: InstrumentRole, track: ProbabilityTrack) {
        self.tracks.insert(role, track);
    }

    /// Remove `role`. Unregistered roles never trigger.
    pub fn unregister(&mut self, role: InstrumentRole) -> Option<ProbabilityTrack> {
        self.history.remove(&role);
        self.tracks.remove(&role)
    }

    pub fn is_registered(&self, role: InstrumentRole) -> bool {
        self.tracks.contains_key(&role)
    }

    pub fn track(&self, role: InstrumentRole) -> Option<&ProbabilityTrack> {
        self.tracks.get(&role)
    }

    /// All registered tracks in role order.
    pub fn tracks(&self) -> impl Iterator<Item = (InstrumentRole, &ProbabilityTrack)> {
        self.tracks.iter().map(|(role, track)| (*role, track))
    }

    /// Most recent outcomes for `role`, oldest first.
    pub fn history(&self, role: InstrumentRole) -> impl Iterator<Item = &TriggerHistoryEntry> {
        self.history.get(&role).into_iter().flatten()
    }

    pub fn defaults(&self) -> &TriggerDefaults {
        &self.defaults
    }

    pub fn seed(&self) -> f64 {
        self.rng.seed()
    }

    pub fn set_seed(&mut self, seed: f64) {
        self.rng = SeededRandom::new(seed);
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Change the pattern length. Existing curves are kept (they wrap on
    /// their own length); default curves for later resets use the new length.
    /// Trigger history is cleared since old step indices may no longer exist.
    pub fn set_step_count(&mut self, step_count: usize) {
        self.step_count = step_count.max(1);
        for track in self.tracks.values_mut() {
            track.clear_history();
        }
        self.history.clear();
    }

    pub fn entropy(&self) -> f32 {
        self.entropy
    }

    pub fn set_entropy(&mut self, entropy: f32) {
        self.entropy = if entropy.is_finite() {
            entropy.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn quantization(&self) -> u32 {
        self.quantization
    }

    pub fn set_quantization(&mut self, quantization: u32) {
        self.quantization = quantization.max(1);
    }

    pub fn set_base_probability(&mut self, role: InstrumentRole, probability: f32) {
        if let Some(track) = self.tracks.get_mut(&role) {
            track.set_base_probability(probability);
        }
    }

    pub fn set_probability_curve(&mut self, role: InstrumentRole, curve: Vec<f32>, curve_type: CurveType) {
        if let Some(track) = self.tracks.get_mut(&role) {
            track.set_curve(curve, curve_type);
        }
    }

    pub fn set_humanization(&mut self, role: InstrumentRole, amount: f32) {
        if let Some(track) = self.tracks.get_mut(&role) {
            track.set_humanization(amount);
        }
    }

    pub fn set_accent_settings(&mut self, role: InstrumentRole, probability: f32, multiplier: f32) {
        if let Some(track) = self.tracks.get_mut(&role) {
            track.set_accent(probability, multiplier);
        }
    }

    pub fn set_ghost_note_settings(&mut self, role: InstrumentRole, probability: f32, multiplier: f32) {
        if let Some(track) = self.tracks.get_mut(&role) {
            track.set_ghost(probability, multiplier);
        }
    }

    pub fn set_pattern_lock(&mut self, role: InstrumentRole, enabled: bool, steps: u32) {
        if let Some(track) = self.tracks.get_mut(&role) {
            track.set_pattern_lock(enabled, steps);
        }
    }

    pub fn set_max_consecutive_misses(&mut self, role: InstrumentRole, misses: u32) {
        if let Some(track) = self.tracks.get_mut(&role) {
            track.set_max_consecutive_misses(misses);
        }
    }

    pub fn set_section_modifier(&mut self, section: &str, role: InstrumentRole, modifier: f32) {
        self.defaults.modifiers.set(section, role, modifier);
    }

    /// Trigger probability for `role` at `step`, in 0.0-1.0.
    ///
    /// Unregistered roles yield 0.0. Does not touch trigger history.
    pub fn calculate_probability(&self, role: InstrumentRole, step: Step, section: Option<&str>) -> f32 {
        let Some(track) = self.tracks.get(&role) else {
            return 0.0;
        };

        let mut probability = track.curve_value(step) * track.base_probability;

        if track.pattern_lock {
            // A track that never fired counts from step -1; so does a last
            // trigger outside the current loop.
            let since = match track
                .last_trigger_step
                .filter(|last| (*last as usize) < self.step_count)
            {
                Some(last) => self.steps_since(last, step),
                None => step.saturating_add(1),
            };
            if since < track.pattern_lock_steps {
                probability = PATTERN_LOCK_PROBABILITY;
            }
        }

        if track.is_starving() {
            probability = (probability + STARVATION_BOOST).min(1.0);
        }

        if let Some(name) = section {
            probability *= self.defaults.modifiers.get(name, role);
        }

        let jitter = (self.rng.draw(Stream::Humanize, step) - 0.5) as f32;
        probability *= 1.0 + jitter * track.humanization;

        if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Roll the trigger for `role` at `step` and record the outcome.
    ///
    /// Steps off the quantization grid and unregistered roles never trigger
    /// and leave history untouched.
    pub fn should_trigger(&mut self, role: InstrumentRole, step: Step, section: Option<&str>) -> bool {
        if !self.tracks.contains_key(&role) || !self.on_grid(step) {
            return false;
        }
        let probability = self.calculate_probability(role, step, section);
        let triggered = self.rng.draw(Stream::Trigger, step) < probability as f64;
        self.record_outcome(role, step, triggered);
        triggered
    }

    /// Velocity and accent/ghost classification for a trigger at `step`.
    ///
    /// Accent is applied before ghost; both may hold for one trigger.
    pub fn trigger_info(&self, role: InstrumentRole, step: Step) -> TriggerDecision {
        let Some(track) = self.tracks.get(&role) else {
            return TriggerDecision::muted();
        };

        let mut velocity = BASE_VELOCITY;
        let mut is_accent = false;
        let mut is_ghost = false;

        if self.rng.draw(Stream::Accent, step) < track.accent_probability as f64 {
            is_accent = true;
            velocity *= track.accent_multiplier;
        }
        if self.rng.draw(Stream::Ghost, step) < track.ghost_note_probability as f64 {
            is_ghost = true;
            velocity *= track.ghost_multiplier;
        }

        let jitter = (self.rng.draw(Stream::Velocity, step) - 0.5) as f32;
        velocity *= 1.0 + jitter * VELOCITY_JITTER;

        TriggerDecision {
            triggered: true,
            velocity: velocity.clamp(MIN_VELOCITY, MAX_VELOCITY),
            is_accent,
            is_ghost,
        }
    }

    /// Full decision for `role` at `step`: roll, then classify if triggered.
    pub fn evaluate(&mut self, role: InstrumentRole, step: Step, section: Option<&str>) -> TriggerDecision {
        if self.should_trigger(role, step, section) {
            let decision = self.trigger_info(role, step);
            log::trace!(
                target: "trigger",
                "{} step {} velocity {:.3} accent={} ghost={}",
                role,
                step,
                decision.velocity,
                decision.is_accent,
                decision.is_ghost
            );
            decision
        } else {
            TriggerDecision::muted()
        }
    }

    /// Record an outcome in the track and the bounded history.
    pub fn record_outcome(&mut self, role: InstrumentRole, step: Step, triggered: bool) {
        let Some(track) = self.tracks.get_mut(&role) else {
            return;
        };
        track.record_outcome(step, triggered);

        let history = self.history.entry(role).or_default();
        history.push_back(TriggerHistoryEntry { step, triggered });
        while history.len() > TRIGGER_HISTORY_LEN {
            history.pop_front();
        }
    }

    fn on_grid(&self, step: Step) -> bool {
        step % self.quantization == 0
    }

    /// Steps elapsed from `last` to `step`, wrapping once around the loop.
    fn steps_since(&self, last: Step, step: Step) -> u32 {
        if step >= last {
            step - last
        } else {
            (step + self.step_count as u32).saturating_sub(last)
        }
    }
}
