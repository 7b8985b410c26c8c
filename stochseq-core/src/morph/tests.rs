#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::morph::*;
    use stochseq_types::AutomationState;

    fn engine_with(config: &Config) -> MorphEngine {
        MorphEngine::new(config.sections(), config.track_definitions(), config.step_count())
    }

    fn engine() -> MorphEngine {
        engine_with(&Config::default())
    }

    #[test]
    fn test_snapshots_for_every_section() {
        let engine = engine();
        assert_eq!(engine.section_names(), &["Intro", "Lift", "Peak", "Break"]);
        for name in engine.section_names() {
            let snapshot = engine.snapshot_preview(name).unwrap();
            assert_eq!(snapshot.automation.len(), 8);
            for values in snapshot.automation.values() {
                assert_eq!(values.len(), 16);
                assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
            }
        }
        assert!(engine.snapshot_preview("Outro").is_none());
    }

    #[test]
    fn test_snapshot_shaping() {
        let engine = engine();
        let intro = &engine.snapshot_preview("Intro").unwrap().automation["leadFilter"];
        // base * track modifier * influence envelope
        assert!((intro[0] - 0.1 * 0.3 * 0.3).abs() < 1e-6);
        assert!((intro[15] - 1.0 * 0.3 * 0.8).abs() < 1e-6);

        let peak = engine.snapshot_preview("Peak").unwrap();
        assert!((peak.automation["leadFilter"][4] - 0.32).abs() < 1e-6);
        assert!((peak.rhythm.density - 1.0).abs() < 1e-6);
        assert!((peak.dynamics.release - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_start_rejects_unknown_sections() {
        let mut engine = engine();
        assert_eq!(
            engine.start_morph("Intro", "Outro", 4, Easing::Linear),
            Err(MorphError::UnknownSection("Outro".to_string()))
        );
        assert_eq!(
            engine.start_morph("Intro", "Peak", 0, Easing::Linear),
            Err(MorphError::ZeroDuration)
        );
        assert_eq!(engine.phase(), MorphPhase::Idle);
    }

    #[test]
    fn test_failed_start_keeps_running_morph() {
        let mut engine = engine();
        engine.start_morph("Intro", "Peak", 4, Easing::Linear).unwrap();
        engine.update_morph(0.1);
        let before = engine.state().clone();
        assert!(engine.start_morph("Nope", "Peak", 4, Easing::Linear).is_err());
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_morph_boundaries_are_exact() {
        let mut engine = engine();
        let intro = engine.snapshot_preview("Intro").unwrap().clone();
        let peak = engine.snapshot_preview("Peak").unwrap().clone();

        engine.start_morph("Intro", "Peak", 4, Easing::EaseInOut).unwrap();
        assert_eq!(engine.morphed_snapshot(Some("Lift")), Some(intro));

        let completed = engine.update_morph(1.0);
        assert_eq!(
            completed,
            Some(MorphCompleted {
                source: "Intro".to_string(),
                target: "Peak".to_string()
            })
        );
        assert_eq!(engine.phase(), MorphPhase::Complete);
        assert_eq!(engine.morphed_snapshot(Some("Lift")), Some(peak));
    }

    #[test]
    fn test_local_progress_wraps_per_duration() {
        let mut engine = engine();
        engine.start_morph("Intro", "Peak", 4, Easing::Linear).unwrap();
        assert!(engine.update_morph(0.3).is_none());
        assert!((engine.state().progress - 0.2).abs() < 1e-5);
        assert!(engine.update_morph(0.5).is_none());
        assert!(engine.state().progress.abs() < 1e-6);
        assert!(engine.is_morphing());
    }

    #[test]
    fn test_midway_snapshot_blends() {
        let mut engine = engine();
        engine.start_morph("Intro", "Peak", 1, Easing::Linear).unwrap();
        engine.update_morph(0.5);
        let intro = engine.snapshot_preview("Intro").unwrap().clone();
        let peak = engine.snapshot_preview("Peak").unwrap().clone();
        let mid = engine.morphed_snapshot(None).unwrap();
        let expected = (intro.rhythm.density + peak.rhythm.density) / 2.0;
        assert!((mid.rhythm.density - expected).abs() < 1e-6);
        let a = intro.automation["fxSend"][3];
        let b = peak.automation["fxSend"][3];
        assert!((mid.automation["fxSend"][3] - (a + b) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_completion_fires_once_then_idles() {
        let mut engine = engine();
        engine.start_morph("Lift", "Break", 2, Easing::Sine).unwrap();
        assert!(engine.update_morph(1.0).is_some());
        assert!(engine.update_morph(1.0).is_none());
        assert_eq!(engine.phase(), MorphPhase::Idle);
        assert!(engine.update_morph(1.0).is_none());
    }

    #[test]
    fn test_idle_follows_playhead() {
        let engine = engine();
        let brk = engine.snapshot_preview("Break").unwrap().clone();
        let intro = engine.snapshot_preview("Intro").unwrap().clone();
        assert_eq!(engine.morphed_snapshot(Some("Break")), Some(brk));
        assert_eq!(engine.morphed_snapshot(None), Some(intro.clone()));
        assert_eq!(engine.morphed_snapshot(Some("Nowhere")), Some(intro));
    }

    #[test]
    fn test_visualization() {
        let mut engine = engine();
        assert!(engine.visualization().is_none());
        engine.start_morph("Intro", "Lift", 1, Easing::EaseInOut).unwrap();
        engine.update_morph(0.25);
        let vis = engine.visualization().unwrap();
        assert_eq!(vis.source_section, "Intro");
        assert_eq!(vis.target_section, "Lift");
        assert!((vis.progress - 0.25).abs() < 1e-6);
        assert!((vis.eased_progress - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_reset_is_immediate() {
        let mut engine = engine();
        engine.start_morph("Intro", "Lift", 4, Easing::Linear).unwrap();
        engine.update_morph(0.6);
        engine.reset_morph();
        assert_eq!(engine.state(), &MorphState::default());
        assert!(engine.visualization().is_none());
    }

    #[test]
    fn test_apply_writes_matching_tracks() {
        let config = Config::default();
        let mut engine = engine_with(&config);
        let mut automation = AutomationState::from_definitions(
            config.track_definitions(),
            &config.section_definitions(),
            config.step_count(),
        );
        engine.start_morph("Break", "Peak", 4, Easing::Linear).unwrap();
        let written = engine.apply_morphed_snapshot(&mut automation, None);
        assert_eq!(written, 8);
        let brk = engine.snapshot_preview("Break").unwrap();
        assert_eq!(
            automation.track("reverbDecay").unwrap().values,
            brk.automation["reverbDecay"]
        );
    }

    #[test]
    fn test_rebuild_for_new_step_count() {
        let config = Config::default();
        let mut engine = engine_with(&config);
        engine.start_morph("Intro", "Peak", 4, Easing::Linear).unwrap();
        engine.rebuild(config.sections(), config.track_definitions(), 32);
        assert!(engine.is_morphing());
        let peak = engine.snapshot_preview("Peak").unwrap();
        assert!(peak.automation.values().all(|v| v.len() == 32));
    }

    #[test]
    fn test_rebuild_cancels_orphaned_morph() {
        let config = Config::default();
        let mut engine = engine_with(&config);
        engine.start_morph("Intro", "Break", 4, Easing::Linear).unwrap();
        engine.rebuild(&config.sections()[..2], config.track_definitions(), 16);
        assert_eq!(engine.phase(), MorphPhase::Idle);
    }
}
