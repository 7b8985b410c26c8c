//! Morphs driven through the tick loop.

mod common;

use common::engine_with_seed;
use stochseq_core::morph::MorphError;
use stochseq_types::{Easing, MorphPhase};

#[test]
fn test_morph_boundaries_match_snapshots_exactly() {
    let mut engine = engine_with_seed(42.0);
    let intro = engine.morph().snapshot_preview("Intro").cloned().unwrap();
    let peak = engine.morph().snapshot_preview("Peak").cloned().unwrap();

    engine.start_morph("Intro", "Peak", 2, Easing::Sine).unwrap();
    assert_eq!(engine.morph().morphed_snapshot(None), Some(intro.clone()));

    for step in 0..16 {
        engine.tick(step, None);
    }
    let report = engine.tick(0, None);
    assert!(report.morph_completed.is_some());
    assert_eq!(engine.morph().phase(), MorphPhase::Complete);
    assert_eq!(engine.morph().morphed_snapshot(None), Some(peak.clone()));
    for track in &engine.automation().tracks {
        assert_eq!(track.values, peak.automation[&track.id], "{}", track.id);
    }
}

#[test]
fn test_completion_fires_once() {
    let mut engine = engine_with_seed(42.0);
    engine.start_morph("Lift", "Break", 1, Easing::Linear).unwrap();
    let completions = (0..48u32)
        .filter_map(|step| engine.tick(step, None).morph_completed)
        .count();
    assert_eq!(completions, 1);
    assert_eq!(engine.morph().phase(), MorphPhase::Idle);
}

#[test]
fn test_progress_moves_within_each_loop() {
    let mut engine = engine_with_seed(42.0);
    engine.start_morph("Intro", "Break", 2, Easing::Linear).unwrap();
    engine.tick(0, None);
    engine.tick(4, None);
    let view = engine.morph().visualization().unwrap();
    assert_eq!(view.source_section, "Intro");
    assert_eq!(view.target_section, "Break");
    assert!((view.progress - 0.5).abs() < 1e-6);
    assert!((view.eased_progress - 0.5).abs() < 1e-6);
}

#[test]
fn test_reset_cancels_without_touching_automation() {
    let mut engine = engine_with_seed(42.0);
    engine.start_morph("Intro", "Peak", 4, Easing::EaseIn).unwrap();
    engine.tick(0, None);
    engine.tick(1, None);
    let written = engine.automation().clone();
    engine.reset_morph();
    assert_eq!(engine.morph().phase(), MorphPhase::Idle);
    assert!(engine.morph().visualization().is_none());
    engine.tick(2, None);
    assert_eq!(engine.automation(), &written);
}

#[test]
fn test_bad_requests_are_rejected() {
    let mut engine = engine_with_seed(42.0);
    assert_eq!(
        engine.start_morph("Intro", "Outro", 4, Easing::Linear),
        Err(MorphError::UnknownSection("Outro".to_string()))
    );
    assert_eq!(
        engine.start_morph("Intro", "Peak", 0, Easing::Linear),
        Err(MorphError::ZeroDuration)
    );
    assert_eq!(engine.morph().phase(), MorphPhase::Idle);
}

#[test]
fn test_morph_survives_step_count_change() {
    let mut engine = engine_with_seed(42.0);
    engine.start_morph("Intro", "Peak", 2, Easing::Linear).unwrap();
    engine.set_step_count(32);
    let peak = engine.morph().snapshot_preview("Peak").unwrap();
    assert!(peak.automation.values().all(|curve| curve.len() == 32));
    assert!(engine.morph().is_morphing());
    engine.tick(0, None);
    assert!(engine.automation().tracks.iter().all(|t| t.values.len() == 32));
}
