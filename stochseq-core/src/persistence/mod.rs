//! Preset export/import as plain JSON-compatible values.
//!
//! Export writes every stored field. Import is lenient: a missing or
//! mistyped field falls back to its default and is noted in the
//! [`ImportReport`]; only a document that is not an object, or a random seed
//! that is present but not a number, is rejected. Imports are decoded in
//! full before anything is applied, so a rejection leaves state untouched.

pub(crate) mod decoders;

use serde_json::{json, Map, Value};
use thiserror::Error;

use stochseq_types::{
    AutomationState, InstrumentRole, ProbabilityTrack, RawAutomation, SectionDefinition,
    SectionLayout, TrackDefinition,
};

use crate::trigger::TriggerEngine;
use decoders::{boolean, count, curve_type, number, number_array, trigger_step, Lookup};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ImportError {
    #[error("{what} is not an object")]
    NotAnObject { what: String },
    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

/// What an import did besides succeeding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Instruments whose settings were imported
    pub applied: Vec<InstrumentRole>,
    /// Unknown or unreadable entries that were ignored
    pub skipped: Vec<String>,
    /// Fields that fell back to their default
    pub defaulted: Vec<String>,
}

impl ImportReport {
    /// True when every field was read as written.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.defaulted.is_empty()
    }

    pub(crate) fn note_default(&mut self, field: &str, why: &str) {
        log::warn!(target: "preset", "{}: {}, using default", field, why);
        self.defaulted.push(field.to_string());
    }

    pub(crate) fn skip(&mut self, entry: String) {
        log::warn!(target: "preset", "skipping {}", entry);
        self.skipped.push(entry);
    }
}

// ---------------------------------------------------------------------------
// Probability settings
// ---------------------------------------------------------------------------

fn export_track(track: &ProbabilityTrack) -> Value {
    json!({
        "baseProbability": track.base_probability,
        "probabilityCurve": track.probability_curve,
        "curveType": track.curve_type.name(),
        "humanization": track.humanization,
        "accentProbability": track.accent_probability,
        "accentMultiplier": track.accent_multiplier,
        "ghostNoteProbability": track.ghost_note_probability,
        "ghostMultiplier": track.ghost_multiplier,
        "patternLock": track.pattern_lock,
        "patternLockSteps": track.pattern_lock_steps,
        "maxConsecutiveMisses": track.max_consecutive_misses,
        "lastTriggerStep": track.last_trigger_step.map_or(-1, i64::from),
        "consecutiveMisses": track.consecutive_misses,
    })
}

/// `{ settings: { <role>: {...} }, entropy, quantization, randomSeed }`
pub fn export_probability(engine: &TriggerEngine) -> Value {
    let settings: Map<String, Value> = engine
        .tracks()
        .map(|(role, track)| (role.key().to_string(), export_track(track)))
        .collect();
    json!({
        "settings": settings,
        "entropy": engine.entropy(),
        "quantization": engine.quantization(),
        "randomSeed": engine.seed(),
    })
}

/// Fully decoded probability settings, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityImport {
    tracks: Vec<(InstrumentRole, ProbabilityTrack)>,
    entropy: f32,
    quantization: u32,
    seed: Option<f64>,
}

impl ProbabilityImport {
    pub fn apply(self, engine: &mut TriggerEngine) {
        for (role, track) in self.tracks {
            engine.register(role, track);
        }
        engine.set_entropy(self.entropy);
        engine.set_quantization(self.quantization);
        if let Some(seed) = self.seed {
            engine.set_seed(seed);
        }
    }
}

fn decode_probability_track(
    obj: &Map<String, Value>,
    default: &ProbabilityTrack,
    field: &str,
    report: &mut ImportReport,
) -> ProbabilityTrack {
    let f = |key: &str| format!("{}.{}", field, key);
    let mut track = default.clone();

    if let Some(p) = number(obj, "baseProbability").or_report(&f("baseProbability"), report) {
        track.set_base_probability(p as f32);
    }

    let curve = number_array(obj, "probabilityCurve").or_report(&f("probabilityCurve"), report);
    let law = curve_type(obj, "curveType").or_report(&f("curveType"), report);
    track.set_curve(
        curve.unwrap_or_else(|| default.probability_curve.clone()),
        law.unwrap_or(default.curve_type),
    );

    if let Some(h) = number(obj, "humanization").or_report(&f("humanization"), report) {
        track.set_humanization(h as f32);
    }

    let accent_p = number(obj, "accentProbability").or_report(&f("accentProbability"), report);
    let accent_m = number(obj, "accentMultiplier").or_report(&f("accentMultiplier"), report);
    track.set_accent(
        accent_p.map_or(default.accent_probability, |v| v as f32),
        accent_m.map_or(default.accent_multiplier, |v| v as f32),
    );

    let ghost_p = number(obj, "ghostNoteProbability").or_report(&f("ghostNoteProbability"), report);
    let ghost_m = number(obj, "ghostMultiplier").or_report(&f("ghostMultiplier"), report);
    track.set_ghost(
        ghost_p.map_or(default.ghost_note_probability, |v| v as f32),
        ghost_m.map_or(default.ghost_multiplier, |v| v as f32),
    );

    let lock = boolean(obj, "patternLock").or_report(&f("patternLock"), report);
    let lock_steps = count(obj, "patternLockSteps").or_report(&f("patternLockSteps"), report);
    track.set_pattern_lock(
        lock.unwrap_or(default.pattern_lock),
        lock_steps.unwrap_or(default.pattern_lock_steps),
    );

    if let Some(m) = count(obj, "maxConsecutiveMisses").or_report(&f("maxConsecutiveMisses"), report) {
        track.set_max_consecutive_misses(m);
    }

    // Trigger history is optional; presets written without it start fresh.
    track.last_trigger_step = trigger_step(obj, "lastTriggerStep")
        .optional(&f("lastTriggerStep"), report)
        .flatten();
    track.consecutive_misses = count(obj, "consecutiveMisses")
        .optional(&f("consecutiveMisses"), report)
        .unwrap_or(0);

    track
}

/// Decode probability settings against the engine's defaults.
pub fn decode_probability(
    engine: &TriggerEngine,
    data: &Value,
    report: &mut ImportReport,
) -> Result<ProbabilityImport, ImportError> {
    let root = data.as_object().ok_or_else(|| ImportError::NotAnObject {
        what: "probability".to_string(),
    })?;

    let seed = match number(root, "randomSeed") {
        Lookup::Found(seed) => Some(seed),
        Lookup::Missing => {
            report.note_default("randomSeed", "missing");
            None
        }
        Lookup::Invalid => {
            return Err(ImportError::InvalidField {
                field: "randomSeed".to_string(),
                reason: "expected a finite number".to_string(),
            })
        }
    };

    let mut tracks = Vec::new();
    match root.get("settings") {
        None | Some(Value::Null) => report.note_default("settings", "missing"),
        Some(Value::Object(settings)) => {
            for (key, value) in settings {
                let Some(role) = InstrumentRole::from_key(key) else {
                    report.skip(format!("settings.{}", key));
                    continue;
                };
                let field = format!("settings.{}", key);
                let default = engine.default_track(role);
                let track = match value.as_object() {
                    Some(obj) => decode_probability_track(obj, &default, &field, report),
                    None => {
                        report.note_default(&field, "not an object");
                        default
                    }
                };
                report.applied.push(role);
                tracks.push((role, track));
            }
        }
        Some(_) => {
            return Err(ImportError::NotAnObject {
                what: "settings".to_string(),
            })
        }
    }

    let defaults = engine.defaults();
    let entropy = number(root, "entropy")
        .or_report("entropy", report)
        .map_or(defaults.entropy, |e| e as f32);
    let quantization = count(root, "quantization")
        .or_report("quantization", report)
        .unwrap_or(defaults.quantization);

    Ok(ProbabilityImport {
        tracks,
        entropy,
        quantization,
        seed,
    })
}

/// Decode and apply probability settings in one go.
pub fn import_probability(engine: &mut TriggerEngine, data: &Value) -> Result<ImportReport, ImportError> {
    let mut report = ImportReport::default();
    let staged = decode_probability(engine, data, &mut report)?;
    staged.apply(engine);
    Ok(report)
}

// ---------------------------------------------------------------------------
// Automation and sections
// ---------------------------------------------------------------------------

/// `{ tracks: [...], sections: [...] }`
pub fn export_automation(state: &AutomationState) -> Value {
    let tracks: Vec<Value> = state
        .tracks
        .iter()
        .map(|track| {
            let breakpoints: Vec<Value> = track
                .breakpoints
                .iter()
                .map(|p| json!({ "step": p.step, "value": p.value }))
                .collect();
            json!({
                "id": track.id,
                "label": track.label,
                "color": track.color,
                "values": track.values,
                "curveType": track.curve_type.name(),
                "breakpoints": breakpoints,
            })
        })
        .collect();
    let sections: Vec<Value> = state
        .sections
        .sections()
        .iter()
        .map(|s| {
            json!({
                "name": s.name,
                "color": s.color,
                "start": s.start,
                "end": s.end,
            })
        })
        .collect();
    json!({ "tracks": tracks, "sections": sections })
}

/// Decode an automation document into a normalized state.
pub fn decode_automation(
    data: &Value,
    track_defs: &[TrackDefinition],
    section_defs: &[SectionDefinition],
    step_count: usize,
    report: &mut ImportReport,
) -> Result<AutomationState, ImportError> {
    let root = data.as_object().ok_or_else(|| ImportError::NotAnObject {
        what: "automation".to_string(),
    })?;
    let mut raw = RawAutomation::default();

    match root.get("tracks") {
        None | Some(Value::Null) => report.note_default("automation.tracks", "missing"),
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                let field = format!("automation.tracks[{}]", i);
                match item.as_object() {
                    Some(obj) => {
                        let track = decoders::decode_track(obj, &field, report);
                        if track.id.is_none() {
                            report.skip(format!("{} (no id)", field));
                            continue;
                        }
                        raw.tracks.push(track);
                    }
                    None => report.skip(field),
                }
            }
        }
        Some(_) => report.note_default("automation.tracks", "wrong type"),
    }

    match root.get("sections") {
        None | Some(Value::Null) => report.note_default("automation.sections", "missing"),
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                match item.as_object() {
                    Some(obj) => raw.sections.push(decoders::decode_section(obj)),
                    None => report.skip(format!("automation.sections[{}]", i)),
                }
            }
            if !raw.sections.is_empty()
                && SectionLayout::try_normalized(&raw.sections, step_count, section_defs).is_none()
            {
                report.note_default("automation.sections", "sections do not cover the timeline");
            }
        }
        Some(_) => report.note_default("automation.sections", "wrong type"),
    }

    Ok(AutomationState::normalize(&raw, track_defs, section_defs, step_count))
}

/// Decode an automation document, returning the state and what was defaulted.
pub fn import_automation(
    data: &Value,
    track_defs: &[TrackDefinition],
    section_defs: &[SectionDefinition],
    step_count: usize,
) -> Result<(AutomationState, ImportReport), ImportError> {
    let mut report = ImportReport::default();
    let state = decode_automation(data, track_defs, section_defs, step_count, &mut report)?;
    Ok((state, report))
}
