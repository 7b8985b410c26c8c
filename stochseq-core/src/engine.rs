//! Tick orchestration. The playback clock calls [`Engine::tick`] once per
//! step; everything for that step happens synchronously inside the call.

use serde_json::{json, Value};

use stochseq_types::{
    AutomationState, Easing, InstrumentRole, MorphPhase, SectionLayout, Step, TriggerDecision,
};

use crate::config::Config;
use crate::morph::{MorphCompleted, MorphEngine, MorphError};
use crate::persistence::{
    decode_automation, decode_probability, export_automation, export_probability, ImportError,
    ImportReport,
};
use crate::trigger::{TriggerDefaults, TriggerEngine};

/// Everything decided for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub step: Step,
    /// Section the step was evaluated in, if any
    pub section: Option<String>,
    /// Automation value per track id, in track order
    pub automation: Vec<(String, f32)>,
    /// One decision per registered instrument, in role order
    pub decisions: Vec<(InstrumentRole, TriggerDecision)>,
    /// Set on the tick that finished a morph
    pub morph_completed: Option<MorphCompleted>,
}

impl TickReport {
    pub fn decision(&self, role: InstrumentRole) -> Option<&TriggerDecision> {
        self.decisions.iter().find(|(r, _)| *r == role).map(|(_, d)| d)
    }

    pub fn value(&self, track_id: &str) -> Option<f32> {
        self.automation
            .iter()
            .find(|(id, _)| id == track_id)
            .map(|(_, v)| *v)
    }

    /// Instruments that fired on this step.
    pub fn triggered(&self) -> impl Iterator<Item = InstrumentRole> + '_ {
        self.decisions
            .iter()
            .filter(|(_, d)| d.triggered)
            .map(|(role, _)| *role)
    }
}

pub struct Engine {
    config: Config,
    step_count: usize,
    automation: AutomationState,
    trigger: TriggerEngine,
    morph: MorphEngine,
    last_step: Option<Step>,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        let step_count = config.step_count();
        let automation = AutomationState::from_definitions(
            config.track_definitions(),
            &config.section_definitions(),
            step_count,
        );
        let trigger = TriggerEngine::new(
            config.seed(),
            step_count,
            TriggerDefaults::from_config(&config),
        );
        let morph = MorphEngine::new(config.sections(), config.track_definitions(), step_count);
        log::debug!(
            target: "engine",
            "engine ready: {} steps, {} tracks, {} sections, seed {}",
            step_count,
            automation.tracks.len(),
            automation.sections.len(),
            config.seed()
        );
        Self {
            config,
            step_count,
            automation,
            trigger,
            morph,
            last_step: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn automation(&self) -> &AutomationState {
        &self.automation
    }

    /// Mutable access for automation edits (values, breakpoints).
    pub fn automation_mut(&mut self) -> &mut AutomationState {
        &mut self.automation
    }

    pub fn sections(&self) -> &SectionLayout {
        &self.automation.sections
    }

    pub fn trigger(&self) -> &TriggerEngine {
        &self.trigger
    }

    pub fn trigger_mut(&mut self) -> &mut TriggerEngine {
        &mut self.trigger
    }

    pub fn morph(&self) -> &MorphEngine {
        &self.morph
    }

    pub fn start_morph(
        &mut self,
        source: &str,
        target: &str,
        duration_steps: u32,
        easing: Easing,
    ) -> Result<(), MorphError> {
        self.morph.start_morph(source, target, duration_steps, easing)?;
        // The next tick starts the blend; it must not read as a wrap.
        self.last_step = None;
        Ok(())
    }

    pub fn reset_morph(&mut self) {
        self.morph.reset_morph();
    }

    /// Evaluate one step.
    ///
    /// Order is fixed: resolve the section, advance the morph, write morphed
    /// curves, sample automation, then evaluate instruments in role order.
    /// `section` overrides the layout lookup when given. Steps past the end of
    /// the pattern wrap.
    pub fn tick(&mut self, step: Step, section: Option<&str>) -> TickReport {
        let step_count = self.step_count as u32;
        let step = step % step_count;

        let section = section
            .map(str::to_string)
            .or_else(|| self.automation.sections.lookup(step).map(|s| s.name.clone()));

        let mut morph_completed = None;
        if self.morph.phase() != MorphPhase::Idle {
            // A playhead that did not advance has wrapped: the loop is over.
            let wrapped = self.last_step.is_some_and(|last| step <= last);
            let global = if wrapped && self.morph.is_morphing() {
                1.0
            } else {
                step as f32 / step_count as f32
            };
            morph_completed = self.morph.update_morph(global);
            if self.morph.phase() != MorphPhase::Idle {
                self.morph
                    .apply_morphed_snapshot(&mut self.automation, section.as_deref());
            }
        }

        let automation = self
            .automation
            .tracks
            .iter()
            .map(|track| (track.id.clone(), track.value(step)))
            .collect();

        let mut decisions = Vec::with_capacity(InstrumentRole::ALL.len());
        for role in InstrumentRole::ALL {
            if self.trigger.is_registered(role) {
                decisions.push((role, self.trigger.evaluate(role, step, section.as_deref())));
            }
        }

        self.last_step = Some(step);
        log::trace!(
            target: "engine",
            "tick {} section {:?}: {} triggers",
            step,
            section,
            decisions.iter().filter(|(_, d)| d.triggered).count()
        );

        TickReport {
            step,
            section,
            automation,
            decisions,
            morph_completed,
        }
    }

    /// Change the pattern length, recomputing tracks, sections and snapshots
    /// from scratch.
    pub fn set_step_count(&mut self, step_count: usize) {
        let step_count = step_count.max(1);
        if step_count == self.step_count {
            return;
        }
        log::debug!(target: "engine", "step count {} -> {}", self.step_count, step_count);
        self.step_count = step_count;
        self.automation
            .resize(step_count, &self.config.section_definitions());
        self.trigger.set_step_count(step_count);
        self.morph.rebuild(
            self.config.sections(),
            self.config.track_definitions(),
            step_count,
        );
        self.last_step = None;
    }

    /// Rebuild everything from configuration.
    pub fn reset_to_defaults(&mut self) {
        self.automation = AutomationState::from_definitions(
            self.config.track_definitions(),
            &self.config.section_definitions(),
            self.step_count,
        );
        // Default curves are drawn from the seed, so restore it first.
        self.trigger.set_seed(self.config.seed());
        self.trigger.reset_to_defaults();
        self.morph.reset_morph();
        self.last_step = None;
    }

    /// `{ probability, automation: { tracks, sections } }`
    pub fn export_preset(&self) -> Value {
        json!({
            "probability": export_probability(&self.trigger),
            "automation": export_automation(&self.automation),
        })
    }

    /// Import a preset. Nothing is applied unless the whole document decodes.
    pub fn import_preset(&mut self, data: &Value) -> Result<ImportReport, ImportError> {
        let root = data.as_object().ok_or_else(|| ImportError::NotAnObject {
            what: "preset".to_string(),
        })?;
        let mut report = ImportReport::default();

        let probability = match root.get("probability") {
            None | Some(Value::Null) => {
                report.note_default("probability", "missing");
                None
            }
            Some(value) => Some(decode_probability(&self.trigger, value, &mut report)?),
        };
        let automation = match root.get("automation") {
            None | Some(Value::Null) => {
                report.note_default("automation", "missing");
                None
            }
            Some(value) => Some(decode_automation(
                value,
                self.config.track_definitions(),
                &self.config.section_definitions(),
                self.step_count,
                &mut report,
            )?),
        };

        if let Some(staged) = probability {
            staged.apply(&mut self.trigger);
        }
        if let Some(state) = automation {
            self.automation = state;
        }
        self.last_step = None;

        log::info!(
            target: "preset",
            "imported preset: {} instruments, {} defaulted, {} skipped",
            report.applied.len(),
            report.defaulted.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}
