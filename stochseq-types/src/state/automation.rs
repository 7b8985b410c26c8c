//! Automation track types for per-step continuous parameters.

use serde::{Deserialize, Serialize};

use super::section::{RawSection, SectionDefinition, SectionLayout};
use crate::curve::{normalize_values, resolve_breakpoints};
use crate::Step;

/// Colour used when neither the import nor a definition provides one.
pub const FALLBACK_TRACK_COLOR: &str = "#49a9ff";

/// Interpolation law between neighbouring samples or breakpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveType {
    /// Linear interpolation (default)
    Linear,
    /// Slow start, fast finish (t²)
    Exponential,
    /// Fast start, slow finish (√t)
    Logarithmic,
    /// Sinusoidal ease-in-out
    Sine,
    /// Cubic Bezier with control points at 25%/75% of the span
    Bezier,
}

impl Default for CurveType {
    fn default() -> Self {
        Self::Linear
    }
}

impl CurveType {
    pub const ALL: [CurveType; 5] = [
        CurveType::Linear,
        CurveType::Exponential,
        CurveType::Logarithmic,
        CurveType::Sine,
        CurveType::Bezier,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CurveType::Linear => "linear",
            CurveType::Exponential => "exponential",
            CurveType::Logarithmic => "logarithmic",
            CurveType::Sine => "sine",
            CurveType::Bezier => "bezier",
        }
    }

    /// Parse a preset tag. Unknown tags yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

/// A sparse control point on an automation track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub step: Step,
    /// Normalized value (0.0-1.0)
    pub value: f32,
}

impl Breakpoint {
    pub fn new(step: Step, value: f32) -> Self {
        Self {
            step,
            value: if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }
}

/// Declarative description of an automation track, used at engine start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDefinition {
    pub id: String,
    pub label: String,
    pub color: String,
    /// Base curve, resampled to the session step count
    #[serde(default)]
    pub curve: Vec<f32>,
    #[serde(default)]
    pub curve_type: CurveType,
}

/// One continuous parameter with a value per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationTrack {
    pub id: String,
    pub label: String,
    /// Display colour, passed through untouched
    pub color: String,
    /// One normalized value (0.0-1.0) per step
    pub values: Vec<f32>,
    #[serde(default)]
    pub curve_type: CurveType,
    /// Sorted by step, unique steps
    #[serde(default)]
    pub breakpoints: Vec<Breakpoint>,
}

impl AutomationTrack {
    pub fn from_definition(def: &TrackDefinition, step_count: usize) -> Self {
        Self {
            id: def.id.clone(),
            label: def.label.clone(),
            color: def.color.clone(),
            values: normalize_values(&def.curve, step_count, def.curve_type),
            curve_type: def.curve_type,
            breakpoints: Vec::new(),
        }
    }

    pub fn step_count(&self) -> usize {
        self.values.len()
    }

    /// Value at `step`, or 0.0 when the step is outside the track.
    pub fn value(&self, step: Step) -> f32 {
        self.values.get(step as usize).copied().unwrap_or(0.0)
    }

    /// Set one step's value. Out-of-range steps are ignored.
    pub fn set_value(&mut self, step: Step, value: f32) {
        if let Some(slot) = self.values.get_mut(step as usize) {
            *slot = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
        }
    }

    /// Replace all values, resampling to the track's current length.
    pub fn set_values(&mut self, values: &[f32]) {
        self.values = normalize_values(values, self.step_count(), self.curve_type);
    }

    /// Insert a breakpoint, replacing any existing one at the same step.
    pub fn add_breakpoint(&mut self, step: Step, value: f32) {
        self.breakpoints.retain(|p| p.step != step);
        let pos = self
            .breakpoints
            .iter()
            .position(|p| p.step > step)
            .unwrap_or(self.breakpoints.len());
        self.breakpoints.insert(pos, Breakpoint::new(step, value));
    }

    /// Remove the breakpoint at `step`. Returns true if one was removed.
    pub fn remove_breakpoint(&mut self, step: Step) -> bool {
        let before = self.breakpoints.len();
        self.breakpoints.retain(|p| p.step != step);
        self.breakpoints.len() != before
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    /// Re-render `values` from the breakpoints using the track's curve law.
    pub fn apply_breakpoints(&mut self) {
        self.values = resolve_breakpoints(&self.breakpoints, self.step_count(), self.curve_type);
    }

    /// Resample to a new step count. Breakpoints past the end are dropped.
    pub fn resize(&mut self, step_count: usize) {
        self.values = normalize_values(&self.values, step_count, self.curve_type);
        self.breakpoints.retain(|p| (p.step as usize) < step_count);
    }
}

/// Loosely-typed track as read from an external document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTrack {
    pub id: Option<String>,
    pub label: Option<String>,
    pub color: Option<String>,
    pub values: Option<Vec<f32>>,
    pub curve_type: Option<CurveType>,
    pub breakpoints: Vec<Breakpoint>,
}

/// Loosely-typed automation document: tracks plus sections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAutomation {
    pub tracks: Vec<RawTrack>,
    pub sections: Vec<RawSection>,
}

/// All automation tracks and the section layout of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationState {
    pub tracks: Vec<AutomationTrack>,
    pub sections: SectionLayout,
}

impl AutomationState {
    /// Build tracks and sections from their definitions.
    pub fn from_definitions(
        tracks: &[TrackDefinition],
        sections: &[SectionDefinition],
        step_count: usize,
    ) -> Self {
        Self {
            tracks: tracks
                .iter()
                .map(|def| AutomationTrack::from_definition(def, step_count))
                .collect(),
            sections: SectionLayout::with_definitions(step_count, sections),
        }
    }

    /// Rebuild state from an imported document, filling gaps from definitions.
    ///
    /// Tracks without an id are dropped. Defined tracks missing from the
    /// document are appended from defaults. The result is ordered by
    /// definition order, with unknown ids after them alphabetically.
    pub fn normalize(
        raw: &RawAutomation,
        track_defs: &[TrackDefinition],
        section_defs: &[SectionDefinition],
        step_count: usize,
    ) -> Self {
        let defaults = Self::from_definitions(track_defs, section_defs, step_count);
        let mut tracks: Vec<AutomationTrack> = Vec::new();

        for raw_track in &raw.tracks {
            let Some(id) = raw_track.id.as_deref().filter(|id| !id.is_empty()) else {
                continue;
            };
            if tracks.iter().any(|t| t.id == id) {
                continue;
            }
            let def = track_defs.iter().find(|d| d.id == id);
            let curve_type = raw_track
                .curve_type
                .or(def.map(|d| d.curve_type))
                .unwrap_or_default();
            let base_values: &[f32] = match &raw_track.values {
                Some(v) if !v.is_empty() => v,
                _ => def.map(|d| d.curve.as_slice()).unwrap_or(&[]),
            };
            let mut track = AutomationTrack {
                id: id.to_string(),
                label: raw_track
                    .label
                    .clone()
                    .or_else(|| def.map(|d| d.label.clone()))
                    .unwrap_or_else(|| id.to_string()),
                color: raw_track
                    .color
                    .clone()
                    .or_else(|| def.map(|d| d.color.clone()))
                    .unwrap_or_else(|| FALLBACK_TRACK_COLOR.to_string()),
                values: normalize_values(base_values, step_count, curve_type),
                curve_type,
                breakpoints: Vec::new(),
            };
            for point in &raw_track.breakpoints {
                if (point.step as usize) < step_count {
                    track.add_breakpoint(point.step, point.value);
                }
            }
            tracks.push(track);
        }

        for default_track in defaults.tracks {
            if !tracks.iter().any(|t| t.id == default_track.id) {
                tracks.push(default_track);
            }
        }

        let order = |id: &str| track_defs.iter().position(|d| d.id == id);
        tracks.sort_by(|a, b| match (order(&a.id), order(&b.id)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });

        let sections = if raw.sections.is_empty() {
            defaults.sections
        } else {
            SectionLayout::normalized(&raw.sections, step_count, section_defs)
        };

        Self { tracks, sections }
    }

    pub fn step_count(&self) -> usize {
        self.sections.step_count()
    }

    pub fn track(&self, id: &str) -> Option<&AutomationTrack> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_mut(&mut self, id: &str) -> Option<&mut AutomationTrack> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// Value of track `id` at `step`; 0.0 for unknown tracks.
    pub fn value_at(&self, id: &str, step: Step) -> f32 {
        self.track(id).map_or(0.0, |t| t.value(step))
    }

    /// Resample every track and re-partition sections for a new step count.
    pub fn resize(&mut self, step_count: usize, section_defs: &[SectionDefinition]) {
        for track in &mut self.tracks {
            track.resize(step_count);
        }
        self.sections.repartition(step_count, section_defs);
    }
}
