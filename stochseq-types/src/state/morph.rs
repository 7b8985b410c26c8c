//! Pattern morph types: easing laws, morph state and section snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Blend `a` toward `b`. Exact at both ends: `lerp(a, b, 0) == a`, `lerp(a, b, 1) == b`.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Easing law mapping linear morph progress to blend amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    Linear,
    EaseInOut,
    EaseIn,
    EaseOut,
    Sine,
    Exponential,
    Logarithmic,
    /// Smoothstep, `3t² - 2t³`
    Bezier,
}

impl Default for Easing {
    fn default() -> Self {
        Self::EaseInOut
    }
}

impl Easing {
    pub const ALL: [Easing; 8] = [
        Easing::Linear,
        Easing::EaseInOut,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::Sine,
        Easing::Exponential,
        Easing::Logarithmic,
        Easing::Bezier,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::EaseInOut => "easeInOut",
            Easing::EaseIn => "easeIn",
            Easing::EaseOut => "easeOut",
            Easing::Sine => "sine",
            Easing::Exponential => "exponential",
            Easing::Logarithmic => "logarithmic",
            Easing::Bezier => "bezier",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.id() == id)
    }

    /// Apply the law to `t`, clamped to 0.0-1.0 first.
    pub fn apply(&self, t: f32) -> f32 {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        match self {
            Easing::Linear => t,
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseIn | Easing::Exponential => t * t,
            Easing::EaseOut => t * (2.0 - t),
            Easing::Sine => (1.0 - (t * std::f32::consts::PI).cos()) / 2.0,
            Easing::Logarithmic => t.sqrt(),
            Easing::Bezier => 3.0 * t * t - 2.0 * t * t * t,
        }
    }
}

/// Lifecycle of a morph: Idle → Morphing → Complete → Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MorphPhase {
    #[default]
    Idle,
    Morphing,
    Complete,
}

/// Current morph between two named sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MorphState {
    pub source_section: Option<String>,
    pub target_section: Option<String>,
    /// Local progress (0.0-1.0)
    pub progress: f32,
    pub duration_steps: u32,
    pub easing: Easing,
    pub phase: MorphPhase,
}

impl Default for MorphState {
    fn default() -> Self {
        Self {
            source_section: None,
            target_section: None,
            progress: 0.0,
            duration_steps: 4,
            easing: Easing::default(),
            phase: MorphPhase::Idle,
        }
    }
}

impl MorphState {
    pub fn is_active(&self) -> bool {
        self.phase == MorphPhase::Morphing
    }

    pub fn eased_progress(&self) -> f32 {
        self.easing.apply(self.progress)
    }
}

/// Rhythmic character of a section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RhythmProfile {
    pub density: f32,
    pub complexity: f32,
    pub syncopation: f32,
}

impl Default for RhythmProfile {
    fn default() -> Self {
        Self {
            density: 0.5,
            complexity: 0.5,
            syncopation: 0.5,
        }
    }
}

impl RhythmProfile {
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            density: lerp(self.density, other.density, t),
            complexity: lerp(self.complexity, other.complexity, t),
            syncopation: lerp(self.syncopation, other.syncopation, t),
        }
    }
}

/// Harmonic character of a section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarmonyProfile {
    pub tension: f32,
    pub movement: f32,
    pub consonance: f32,
}

impl Default for HarmonyProfile {
    fn default() -> Self {
        Self {
            tension: 0.5,
            movement: 0.5,
            consonance: 0.5,
        }
    }
}

impl HarmonyProfile {
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            tension: lerp(self.tension, other.tension, t),
            movement: lerp(self.movement, other.movement, t),
            consonance: lerp(self.consonance, other.consonance, t),
        }
    }
}

/// Envelope character of a section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicsProfile {
    pub attack: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for DynamicsProfile {
    fn default() -> Self {
        Self {
            attack: 0.5,
            sustain: 0.5,
            release: 0.5,
        }
    }
}

impl DynamicsProfile {
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            attack: lerp(self.attack, other.attack, t),
            sustain: lerp(self.sustain, other.sustain, t),
            release: lerp(self.release, other.release, t),
        }
    }
}

/// Precomputed multi-track pattern for one section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionSnapshot {
    /// Automation curve per track id
    pub automation: BTreeMap<String, Vec<f32>>,
    pub rhythm: RhythmProfile,
    pub harmony: HarmonyProfile,
    pub dynamics: DynamicsProfile,
}

impl SectionSnapshot {
    /// Blend toward `target` by `t`.
    ///
    /// Tracks present on only one side pass through unchanged, as do samples
    /// past the end of the shorter curve.
    pub fn interpolate(&self, target: &SectionSnapshot, t: f32) -> SectionSnapshot {
        let mut automation = BTreeMap::new();
        for (id, source_values) in &self.automation {
            let blended = match target.automation.get(id) {
                Some(target_values) => blend_curves(source_values, target_values, t),
                None => source_values.clone(),
            };
            automation.insert(id.clone(), blended);
        }
        for (id, target_values) in &target.automation {
            automation
                .entry(id.clone())
                .or_insert_with(|| target_values.clone());
        }

        SectionSnapshot {
            automation,
            rhythm: self.rhythm.lerp(&target.rhythm, t),
            harmony: self.harmony.lerp(&target.harmony, t),
            dynamics: self.dynamics.lerp(&target.dynamics, t),
        }
    }
}

fn blend_curves(source: &[f32], target: &[f32], t: f32) -> Vec<f32> {
    let len = source.len().max(target.len());
    (0..len)
        .map(|i| match (source.get(i), target.get(i)) {
            (Some(&a), Some(&b)) => lerp(a, b, t),
            (Some(&a), None) => a,
            (None, Some(&b)) => b,
            (None, None) => 0.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easings_fix_endpoints() {
        for easing in Easing::ALL {
            assert_eq!(easing.apply(0.0), 0.0, "{:?}", easing);
            assert_eq!(easing.apply(1.0), 1.0, "{:?}", easing);
        }
    }

    #[test]
    fn easings_stay_in_unit_range() {
        for easing in Easing::ALL {
            for i in 0..=100 {
                let v = easing.apply(i as f32 / 100.0);
                assert!((0.0..=1.0).contains(&v), "{:?} {}", easing, v);
            }
            assert_eq!(easing.apply(-3.0), 0.0);
            assert_eq!(easing.apply(7.0), 1.0);
        }
    }

    #[test]
    fn ease_in_out_is_continuous_at_midpoint() {
        let below = Easing::EaseInOut.apply(0.499_999);
        let above = Easing::EaseInOut.apply(0.5);
        assert!((below - above).abs() < 1e-4);
        assert!((Easing::EaseInOut.apply(0.25) - 0.125).abs() < 1e-6);
        assert!((Easing::EaseOut.apply(0.5) - 0.75).abs() < 1e-6);
        assert!((Easing::Sine.apply(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn easing_ids_roundtrip() {
        for easing in Easing::ALL {
            assert_eq!(Easing::from_id(easing.id()), Some(easing));
        }
        assert_eq!(Easing::from_id("bounce"), None);
    }

    fn snapshot(values: &[(&str, Vec<f32>)], density: f32) -> SectionSnapshot {
        SectionSnapshot {
            automation: values
                .iter()
                .map(|(id, v)| (id.to_string(), v.clone()))
                .collect(),
            rhythm: RhythmProfile {
                density,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn interpolate_is_exact_at_bounds() {
        let a = snapshot(&[("cut", vec![0.1, 0.37, 0.93])], 0.3);
        let b = snapshot(&[("cut", vec![0.7, 0.11, 0.29])], 0.9);
        assert_eq!(a.interpolate(&b, 0.0), a);
        assert_eq!(a.interpolate(&b, 1.0), b);
        let mid = a.interpolate(&b, 0.5);
        assert!((mid.rhythm.density - 0.6).abs() < 1e-6);
        assert!((mid.automation["cut"][0] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn one_sided_tracks_pass_through() {
        let a = snapshot(&[("cut", vec![0.2]), ("only_a", vec![0.4, 0.4])], 0.5);
        let b = snapshot(&[("cut", vec![0.6, 0.8]), ("only_b", vec![0.9])], 0.5);
        let mid = a.interpolate(&b, 0.5);
        assert_eq!(mid.automation["only_a"], vec![0.4, 0.4]);
        assert_eq!(mid.automation["only_b"], vec![0.9]);
        // Missing sample on the shorter side passes through too
        assert_eq!(mid.automation["cut"].len(), 2);
        assert!((mid.automation["cut"][0] - 0.4).abs() < 1e-6);
        assert_eq!(mid.automation["cut"][1], 0.8);
    }
}
