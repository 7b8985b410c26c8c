use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use stochseq_types::{
    lerp, CurveType, DynamicsProfile, Easing, HarmonyProfile, InstrumentRole, ProbabilityTrack,
    RhythmProfile, SectionDefinition, SectionModifiers, TrackDefinition, DEFAULT_STEP_COUNT,
};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Seed used when neither file provides a finite one.
pub const DEFAULT_SEED: f64 = 42.0;

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineConfig,
    probability: Option<ProbabilitySettings>,
    instruments: Option<BTreeMap<String, ProbabilitySettings>>,
    tracks: Option<Vec<TrackDefinition>>,
    sections: Option<Vec<SectionConfig>>,
}

#[derive(Deserialize, Default)]
struct EngineConfig {
    step_count: Option<usize>,
    seed: Option<f64>,
    entropy: Option<f32>,
    quantization: Option<u32>,
}

/// Partial probability track settings. Unset fields leave the track alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProbabilitySettings {
    pub base_probability: Option<f32>,
    pub probability_curve: Option<Vec<f32>>,
    pub curve_type: Option<CurveType>,
    pub humanization: Option<f32>,
    pub accent_probability: Option<f32>,
    pub accent_multiplier: Option<f32>,
    pub ghost_note_probability: Option<f32>,
    pub ghost_multiplier: Option<f32>,
    pub pattern_lock: Option<bool>,
    pub pattern_lock_steps: Option<u32>,
    pub max_consecutive_misses: Option<u32>,
}

impl ProbabilitySettings {
    /// Write every set field into `track` through its clamping setters.
    pub fn apply_to(&self, track: &mut ProbabilityTrack) {
        if let Some(p) = self.base_probability {
            track.set_base_probability(p);
        }
        if self.probability_curve.is_some() || self.curve_type.is_some() {
            let curve = self
                .probability_curve
                .clone()
                .unwrap_or_else(|| track.probability_curve.clone());
            track.set_curve(curve, self.curve_type.unwrap_or(track.curve_type));
        }
        if let Some(h) = self.humanization {
            track.set_humanization(h);
        }
        if self.accent_probability.is_some() || self.accent_multiplier.is_some() {
            track.set_accent(
                self.accent_probability.unwrap_or(track.accent_probability),
                self.accent_multiplier.unwrap_or(track.accent_multiplier),
            );
        }
        if self.ghost_note_probability.is_some() || self.ghost_multiplier.is_some() {
            track.set_ghost(
                self.ghost_note_probability.unwrap_or(track.ghost_note_probability),
                self.ghost_multiplier.unwrap_or(track.ghost_multiplier),
            );
        }
        if self.pattern_lock.is_some() || self.pattern_lock_steps.is_some() {
            track.set_pattern_lock(
                self.pattern_lock.unwrap_or(track.pattern_lock),
                self.pattern_lock_steps.unwrap_or(track.pattern_lock_steps),
            );
        }
        if let Some(m) = self.max_consecutive_misses {
            track.set_max_consecutive_misses(m);
        }
    }
}

/// Step-position envelope easing from `from` to `to` across a section.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct InfluenceEnvelope {
    pub from: f32,
    pub to: f32,
}

impl InfluenceEnvelope {
    /// Envelope value at `position` (0.0-1.0 through the pattern).
    pub fn at(&self, position: f32) -> f32 {
        lerp(self.from, self.to, Easing::EaseInOut.apply(position))
    }
}

/// Everything configurable about one named section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SectionConfig {
    pub name: String,
    pub color: String,
    /// Absent means a flat envelope at 1.0
    #[serde(default)]
    pub influence: Option<InfluenceEnvelope>,
    #[serde(default)]
    pub rhythm: RhythmProfile,
    #[serde(default)]
    pub harmony: HarmonyProfile,
    #[serde(default)]
    pub dynamics: DynamicsProfile,
    /// Trigger probability multiplier per instrument key
    #[serde(default)]
    pub instrument_modifiers: BTreeMap<String, f32>,
    /// Automation multiplier per track id
    #[serde(default)]
    pub track_modifiers: BTreeMap<String, f32>,
}

impl SectionConfig {
    pub fn definition(&self) -> SectionDefinition {
        SectionDefinition::new(self.name.clone(), self.color.clone())
    }

    pub fn influence_at(&self, position: f32) -> f32 {
        self.influence.map_or(1.0, |env| env.at(position))
    }

    pub fn track_modifier(&self, track_id: &str) -> f32 {
        self.track_modifiers.get(track_id).copied().unwrap_or(1.0)
    }
}

pub struct Config {
    engine: EngineConfig,
    probability: ProbabilitySettings,
    instruments: BTreeMap<String, ProbabilitySettings>,
    tracks: Vec<TrackDefinition>,
    sections: Vec<SectionConfig>,
}

impl Default for Config {
    /// The embedded defaults, ignoring any user file.
    fn default() -> Self {
        Self::from_file(embedded())
    }
}

impl Config {
    pub fn load() -> Self {
        let mut base = embedded();

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => merge(&mut base, user),
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Self::from_file(base)
    }

    /// Parse `contents` as a user file and merge it over the embedded defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let user: ConfigFile = toml::from_str(contents)?;
        let mut base = embedded();
        merge(&mut base, user);
        Ok(Self::from_file(base))
    }

    fn from_file(file: ConfigFile) -> Self {
        let instruments = file.instruments.unwrap_or_default();
        for key in instruments.keys() {
            if InstrumentRole::from_key(key).is_none() {
                log::warn!(target: "config", "ignoring settings for unknown instrument '{}'", key);
            }
        }
        Config {
            engine: file.engine,
            probability: file.probability.unwrap_or_default(),
            instruments,
            tracks: file.tracks.unwrap_or_default(),
            sections: file.sections.unwrap_or_default(),
        }
    }

    /// Steps per pattern (at least 1).
    pub fn step_count(&self) -> usize {
        self.engine.step_count.unwrap_or(DEFAULT_STEP_COUNT).max(1)
    }

    pub fn seed(&self) -> f64 {
        self.engine
            .seed
            .filter(|s| s.is_finite())
            .unwrap_or(DEFAULT_SEED)
    }

    pub fn entropy(&self) -> f32 {
        self.engine
            .entropy
            .filter(|e| e.is_finite())
            .unwrap_or(0.5)
            .clamp(0.0, 1.0)
    }

    pub fn quantization(&self) -> u32 {
        self.engine.quantization.unwrap_or(1).max(1)
    }

    /// Settings shared by every instrument.
    pub fn probability_defaults(&self) -> &ProbabilitySettings {
        &self.probability
    }

    /// Settings layered over the shared ones for `role`.
    pub fn instrument_settings(&self, role: InstrumentRole) -> Option<&ProbabilitySettings> {
        self.instruments.get(role.key())
    }

    pub fn track_definitions(&self) -> &[TrackDefinition] {
        &self.tracks
    }

    pub fn sections(&self) -> &[SectionConfig] {
        &self.sections
    }

    pub fn section_definitions(&self) -> Vec<SectionDefinition> {
        self.sections.iter().map(SectionConfig::definition).collect()
    }

    /// Per-section instrument multipliers, keyed by role.
    pub fn section_modifiers(&self) -> SectionModifiers {
        let mut modifiers = SectionModifiers::new();
        for section in &self.sections {
            for (key, value) in &section.instrument_modifiers {
                match InstrumentRole::from_key(key) {
                    Some(role) => modifiers.set(section.name.clone(), role, *value),
                    None => log::warn!(
                        target: "config",
                        "section '{}': ignoring modifier for unknown instrument '{}'",
                        section.name,
                        key
                    ),
                }
            }
        }
        modifiers
    }
}

fn embedded() -> ConfigFile {
    toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml")
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stochseq").join("config.toml"))
}

fn merge(base: &mut ConfigFile, user: ConfigFile) {
    merge_engine(&mut base.engine, user.engine);
    if user.probability.is_some() {
        base.probability = user.probability;
    }
    if user.instruments.is_some() {
        base.instruments = user.instruments;
    }
    if user.tracks.is_some() {
        base.tracks = user.tracks;
    }
    if user.sections.is_some() {
        base.sections = user.sections;
    }
}

fn merge_engine(base: &mut EngineConfig, user: EngineConfig) {
    if user.step_count.is_some() {
        base.step_count = user.step_count;
    }
    if user.seed.is_some() {
        base.seed = user.seed;
    }
    if user.entropy.is_some() {
        base.entropy = user.entropy;
    }
    if user.quantization.is_some() {
        base.quantization = user.quantization;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_embedded_config() {
        let config = Config::default();
        assert_eq!(config.step_count(), 16);
        assert_eq!(config.seed(), 42.0);
        assert!((config.entropy() - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.quantization(), 1);
        assert_eq!(config.track_definitions().len(), 8);
        assert_eq!(config.track_definitions()[0].id, "leadFilter");
        let names: Vec<&str> = config.sections().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Intro", "Lift", "Peak", "Break"]);
    }

    #[test]
    fn test_embedded_curves_have_sixteen_steps() {
        let config = Config::default();
        for def in config.track_definitions() {
            assert_eq!(def.curve.len(), 16, "{}", def.id);
        }
    }

    #[test]
    fn test_instrument_settings() {
        let config = Config::default();
        let kick = config.instrument_settings(InstrumentRole::Kick).unwrap();
        assert_eq!(kick.base_probability, Some(0.8));
        assert_eq!(kick.ghost_note_probability, Some(0.05));
        let fx = config.instrument_settings(InstrumentRole::Fx).unwrap();
        assert_eq!(fx.ghost_note_probability, Some(0.0));
        assert_eq!(config.probability_defaults().max_consecutive_misses, Some(3));
    }

    #[test]
    fn test_section_modifiers() {
        let mods = Config::default().section_modifiers();
        assert_eq!(mods.get("Intro", InstrumentRole::Lead), 0.1);
        assert_eq!(mods.get("Break", InstrumentRole::Fx), 0.8);
        assert_eq!(mods.get("Outro", InstrumentRole::Kick), 1.0);
    }

    #[test]
    fn test_influence_envelopes() {
        let config = Config::default();
        let intro = &config.sections()[0];
        assert!((intro.influence_at(0.0) - 0.3).abs() < 1e-6);
        assert!((intro.influence_at(1.0) - 0.8).abs() < 1e-6);
        let peak = &config.sections()[2];
        assert_eq!(peak.influence_at(0.4), 1.0);
        assert_eq!(peak.track_modifier("fxSend"), 0.8);
        assert_eq!(peak.track_modifier("unknown"), 1.0);
    }

    #[test]
    fn test_user_engine_keys_merge_field_by_field() {
        let config = Config::from_toml_str("[engine]\nstep_count = 32\n").unwrap();
        assert_eq!(config.step_count(), 32);
        assert_eq!(config.seed(), 42.0);
        assert_eq!(config.sections().len(), 4);
    }

    #[test]
    fn test_user_tables_replace_defaults() {
        let src = r##"
[[sections]]
name = "A"
color = "#000"

[[sections]]
name = "B"
color = "#fff"

[instruments.kick]
base_probability = 0.1
"##;
        let config = Config::from_toml_str(src).unwrap();
        let names: Vec<&str> = config.sections().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(config.instrument_settings(InstrumentRole::Snare).is_none());
        assert_eq!(config.track_definitions().len(), 8);
    }

    #[test]
    fn test_engine_values_are_sanitized() {
        let config =
            Config::from_toml_str("[engine]\nstep_count = 0\nquantization = 0\nentropy = 4.0\n")
                .unwrap();
        assert_eq!(config.step_count(), 1);
        assert_eq!(config.quantization(), 1);
        assert_eq!(config.entropy(), 1.0);
    }

    #[test]
    fn test_malformed_user_file_is_an_error() {
        assert!(Config::from_toml_str("[engine\nstep_count = ").is_err());
    }

    #[test]
    fn test_settings_apply_through_setters() {
        let settings = ProbabilitySettings {
            base_probability: Some(2.0),
            accent_multiplier: Some(9.0),
            pattern_lock_steps: Some(0),
            ..Default::default()
        };
        let mut track = ProbabilityTrack::default();
        settings.apply_to(&mut track);
        assert_eq!(track.base_probability, 1.0);
        assert_eq!(track.accent_multiplier, 3.0);
        assert_eq!(track.accent_probability, 0.2);
        assert_eq!(track.pattern_lock_steps, 1);
        assert!(!track.pattern_lock);
    }
}
