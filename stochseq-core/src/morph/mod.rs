//! Pattern Morph Engine: timed blends between section snapshots.
//!
//! Lifecycle is Idle → Morphing → Complete → Idle. While idle the engine
//! reports the snapshot of the section under the playhead. While morphing it
//! blends source toward target by the eased local progress. Once complete it
//! reports the target until the next update returns it to idle.

pub mod snapshot;
mod tests;

use std::collections::BTreeMap;

use thiserror::Error;

use stochseq_types::{AutomationState, Easing, MorphPhase, MorphState, SectionSnapshot, TrackDefinition};

use crate::config::SectionConfig;
use snapshot::build_snapshots;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MorphError {
    #[error("unknown section '{0}'")]
    UnknownSection(String),
    #[error("morph duration must be at least one step")]
    ZeroDuration,
}

/// One-shot signal emitted by the update that completes a morph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphCompleted {
    pub source: String,
    pub target: String,
}

/// Read-only view of a running morph.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphVisualization {
    pub source_section: String,
    pub target_section: String,
    pub progress: f32,
    pub eased_progress: f32,
}

pub struct MorphEngine {
    state: MorphState,
    snapshots: BTreeMap<String, SectionSnapshot>,
    /// Section names in configuration order; the first is the idle fallback
    order: Vec<String>,
}

impl MorphEngine {
    pub fn new(sections: &[SectionConfig], tracks: &[TrackDefinition], step_count: usize) -> Self {
        Self {
            state: MorphState::default(),
            snapshots: build_snapshots(sections, tracks, step_count),
            order: sections.iter().map(|s| s.name.clone()).collect(),
        }
    }

    /// Recompute every snapshot, e.g. after a step count change.
    ///
    /// A morph whose sections no longer exist is cancelled.
    pub fn rebuild(&mut self, sections: &[SectionConfig], tracks: &[TrackDefinition], step_count: usize) {
        self.snapshots = build_snapshots(sections, tracks, step_count);
        self.order = sections.iter().map(|s| s.name.clone()).collect();
        let still_valid = [&self.state.source_section, &self.state.target_section]
            .into_iter()
            .flatten()
            .all(|name| self.snapshots.contains_key(name));
        if !still_valid {
            log::warn!(target: "morph", "morph sections vanished on rebuild, cancelling");
            self.reset_morph();
        }
    }

    pub fn state(&self) -> &MorphState {
        &self.state
    }

    pub fn phase(&self) -> MorphPhase {
        self.state.phase
    }

    pub fn is_morphing(&self) -> bool {
        self.state.is_active()
    }

    pub fn section_names(&self) -> &[String] {
        &self.order
    }

    /// Begin morphing from `source` to `target` over `duration_steps`.
    ///
    /// On error the current state is left untouched.
    pub fn start_morph(
        &mut self,
        source: &str,
        target: &str,
        duration_steps: u32,
        easing: Easing,
    ) -> Result<(), MorphError> {
        for name in [source, target] {
            if !self.snapshots.contains_key(name) {
                return Err(MorphError::UnknownSection(name.to_string()));
            }
        }
        if duration_steps == 0 {
            return Err(MorphError::ZeroDuration);
        }

        log::info!(
            target: "morph",
            "morphing {} -> {} over {} steps ({})",
            source,
            target,
            duration_steps,
            easing.id()
        );
        self.state = MorphState {
            source_section: Some(source.to_string()),
            target_section: Some(target.to_string()),
            progress: 0.0,
            duration_steps,
            easing,
            phase: MorphPhase::Morphing,
        };
        Ok(())
    }

    /// Advance with global progress through the pattern (0.0-1.0).
    ///
    /// Local progress is `(global * duration) mod 1`. The morph completes once
    /// `floor(global * duration)` reaches the duration, and only that update
    /// returns the completion event. An update while complete returns to idle.
    pub fn update_morph(&mut self, global_progress: f32) -> Option<MorphCompleted> {
        match self.state.phase {
            MorphPhase::Idle => None,
            MorphPhase::Complete => {
                self.state = MorphState::default();
                None
            }
            MorphPhase::Morphing => {
                let global = if global_progress.is_finite() {
                    global_progress.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let duration = self.state.duration_steps as f32;
                let scaled = global * duration;
                self.state.progress = scaled % 1.0;

                if scaled.floor() >= duration {
                    self.state.phase = MorphPhase::Complete;
                    self.state.progress = 1.0;
                    let completed = MorphCompleted {
                        source: self.state.source_section.clone().unwrap_or_default(),
                        target: self.state.target_section.clone().unwrap_or_default(),
                    };
                    log::info!(target: "morph", "morph complete: {}", completed.target);
                    return Some(completed);
                }
                None
            }
        }
    }

    /// Snapshot for the current morph state.
    ///
    /// Idle returns the snapshot of `playhead_section`, falling back to the
    /// first configured section. `None` only when no sections exist.
    pub fn morphed_snapshot(&self, playhead_section: Option<&str>) -> Option<SectionSnapshot> {
        let source = self.state.source_section.as_deref().and_then(|n| self.snapshots.get(n));
        let target = self.state.target_section.as_deref().and_then(|n| self.snapshots.get(n));

        match (self.state.phase, source, target) {
            (MorphPhase::Morphing, Some(source), Some(target)) => {
                Some(source.interpolate(target, self.state.eased_progress()))
            }
            (MorphPhase::Complete, _, Some(target)) => Some(target.clone()),
            _ => self.current_section_snapshot(playhead_section).cloned(),
        }
    }

    fn current_section_snapshot(&self, playhead_section: Option<&str>) -> Option<&SectionSnapshot> {
        playhead_section
            .and_then(|name| self.snapshots.get(name))
            .or_else(|| self.order.first().and_then(|name| self.snapshots.get(name)))
    }

    /// Write the morphed curves into automation tracks with matching ids.
    ///
    /// Returns the number of tracks written.
    pub fn apply_morphed_snapshot(&self, automation: &mut AutomationState, playhead_section: Option<&str>) -> usize {
        let Some(snapshot) = self.morphed_snapshot(playhead_section) else {
            return 0;
        };
        let mut written = 0;
        for track in &mut automation.tracks {
            if let Some(values) = snapshot.automation.get(&track.id) {
                track.set_values(values);
                written += 1;
            }
        }
        written
    }

    /// The precomputed snapshot of a section.
    pub fn snapshot_preview(&self, section: &str) -> Option<&SectionSnapshot> {
        self.snapshots.get(section)
    }

    /// Source, target and progress of a running morph.
    pub fn visualization(&self) -> Option<MorphVisualization> {
        if !self.is_morphing() {
            return None;
        }
        Some(MorphVisualization {
            source_section: self.state.source_section.clone()?,
            target_section: self.state.target_section.clone()?,
            progress: self.state.progress,
            eased_progress: self.state.eased_progress(),
        })
    }

    /// Cancel any morph immediately.
    pub fn reset_morph(&mut self) {
        self.state = MorphState::default();
    }
}
