//! Section layout: named contiguous regions partitioning the step timeline.

use serde::{Deserialize, Serialize};

use crate::Step;

/// Name of the single section produced when no definitions exist.
pub const LOOP_SECTION_NAME: &str = "Loop";
const LOOP_SECTION_COLOR: &str = "rgba(255, 255, 255, 0.04)";

/// A named span of steps, `start..=end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    /// Display colour, passed through untouched
    pub color: String,
    pub start: Step,
    pub end: Step,
}

impl Section {
    pub fn contains(&self, step: Step) -> bool {
        step >= self.start && step <= self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }
}

/// Declarative section entry: what a region is called and how it looks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDefinition {
    pub name: String,
    pub color: String,
}

impl SectionDefinition {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

/// Externally supplied section bounds, possibly for a different step count.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSection {
    pub name: Option<String>,
    pub color: Option<String>,
    pub start: f64,
    pub end: f64,
}

/// Split `step_count` steps evenly across the definitions.
///
/// Each region gets `step_count / n` steps and the first `step_count % n`
/// regions get one more. At most `step_count` definitions are used; with none
/// the whole timeline becomes a single `Loop` section.
pub fn create_default_layout(step_count: usize, definitions: &[SectionDefinition]) -> Vec<Section> {
    if step_count == 0 {
        return Vec::new();
    }
    let definitions = &definitions[..definitions.len().min(step_count)];
    if definitions.is_empty() {
        return vec![Section {
            name: LOOP_SECTION_NAME.to_string(),
            color: LOOP_SECTION_COLOR.to_string(),
            start: 0,
            end: (step_count - 1) as Step,
        }];
    }

    let count = definitions.len();
    let base_len = step_count / count;
    let remainder = step_count % count;
    let last_step = step_count - 1;

    let mut cursor = 0usize;
    definitions
        .iter()
        .enumerate()
        .map(|(index, def)| {
            let extra = usize::from(index < remainder);
            let len = (base_len + extra).max(1);
            let start = cursor;
            let mut end = start + len - 1;
            if index == count - 1 || end >= last_step {
                end = last_step;
            }
            cursor = end + 1;
            Section {
                name: def.name.clone(),
                color: def.color.clone(),
                start: start as Step,
                end: end as Step,
            }
        })
        .collect()
}

/// Rescale external sections onto `step_count` steps.
///
/// Bounds are scaled proportionally to the largest supplied end, rounded,
/// clamped into the timeline and pushed forward so regions never overlap. The
/// first region is pinned to step 0 and the last to the final step. The
/// result is not validated; see [`SectionLayout::try_normalized`].
pub fn normalize_sections(
    raw: &[RawSection],
    step_count: usize,
    definitions: &[SectionDefinition],
) -> Vec<Section> {
    let default_layout = create_default_layout(step_count, definitions);
    if step_count == 0 {
        return default_layout;
    }

    let mut sanitized: Vec<&RawSection> = raw
        .iter()
        .filter(|s| s.start.is_finite() && s.end.is_finite())
        .collect();
    if sanitized.is_empty() {
        return default_layout;
    }
    sanitized.sort_by(|a, b| a.start.total_cmp(&b.start));

    let max_end = sanitized.iter().fold(0.0f64, |max, s| max.max(s.end));
    let source_span = max_end.max(1.0);
    let target_max = (step_count - 1) as f64;

    let mut last_end: i64 = -1;
    let mut normalized: Vec<Section> = sanitized
        .iter()
        .enumerate()
        .map(|(index, section)| {
            let def = section
                .name
                .as_deref()
                .and_then(|name| definitions.iter().find(|d| d.name == name));
            let fallback = &default_layout[index % default_layout.len()];

            let scaled_start = (section.start / source_span * target_max).round();
            let scaled_end = (section.end / source_span * target_max).round();
            let mut start = scaled_start.clamp(0.0, target_max) as i64;
            let mut end = scaled_end.clamp(0.0, target_max) as i64;
            start = start.max(last_end + 1).min(target_max as i64);
            if end < start {
                end = start;
            }
            last_end = end;

            Section {
                name: section.name.clone().unwrap_or_else(|| fallback.name.clone()),
                color: section
                    .color
                    .clone()
                    .or_else(|| def.map(|d| d.color.clone()))
                    .unwrap_or_else(|| fallback.color.clone()),
                start: start as Step,
                end: end as Step,
            }
        })
        .collect();

    if let Some(first) = normalized.first_mut() {
        first.start = 0;
    }
    if let Some(last) = normalized.last_mut() {
        last.end = target_max as Step;
    }
    normalized
}

/// A validated partition of the timeline into sections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionLayout {
    sections: Vec<Section>,
}

impl SectionLayout {
    /// Default even layout for the given definitions.
    pub fn with_definitions(step_count: usize, definitions: &[SectionDefinition]) -> Self {
        Self {
            sections: create_default_layout(step_count, definitions),
        }
    }

    /// Normalize external sections; `None` when they cannot cover the timeline.
    pub fn try_normalized(
        raw: &[RawSection],
        step_count: usize,
        definitions: &[SectionDefinition],
    ) -> Option<Self> {
        let layout = Self {
            sections: normalize_sections(raw, step_count, definitions),
        };
        layout.covers_timeline(step_count).then_some(layout)
    }

    /// Normalize external sections, re-deriving the default layout if invalid.
    pub fn normalized(
        raw: &[RawSection],
        step_count: usize,
        definitions: &[SectionDefinition],
    ) -> Self {
        Self::try_normalized(raw, step_count, definitions)
            .unwrap_or_else(|| Self::with_definitions(step_count, definitions))
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Number of steps covered (last end + 1).
    pub fn step_count(&self) -> usize {
        self.sections.last().map_or(0, |s| s.end as usize + 1)
    }

    /// The section containing `step`.
    pub fn lookup(&self, step: Step) -> Option<&Section> {
        self.sections.iter().find(|s| s.contains(step))
    }

    pub fn by_name(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// True if every step in `0..step_count` belongs to exactly one section.
    pub fn covers_timeline(&self, step_count: usize) -> bool {
        if step_count == 0 {
            return self.sections.is_empty();
        }
        let mut expected_start: Step = 0;
        for section in &self.sections {
            if section.start != expected_start || section.end < section.start {
                return false;
            }
            expected_start = section.end + 1;
        }
        expected_start as usize == step_count
    }

    /// Recompute the layout for a new step count from scratch.
    ///
    /// Current section names and colours are kept and re-spread evenly;
    /// an empty layout falls back to `definitions`.
    pub fn repartition(&mut self, step_count: usize, definitions: &[SectionDefinition]) {
        let current: Vec<SectionDefinition> = self
            .sections
            .iter()
            .map(|s| SectionDefinition::new(s.name.clone(), s.color.clone()))
            .collect();
        let source = if current.is_empty() { definitions } else { &current };
        *self = Self::with_definitions(step_count, source);
    }
}
