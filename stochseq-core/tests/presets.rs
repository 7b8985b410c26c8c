//! Preset export/import through the engine.

mod common;

use common::{engine_with_seed, play};
use serde_json::json;
use stochseq_core::persistence::ImportError;
use stochseq_types::InstrumentRole;

#[test]
fn test_preset_reproduces_playback() {
    let mut source = engine_with_seed(99.0);
    source.trigger_mut().set_pattern_lock(InstrumentRole::Hats, true, 2);
    source.trigger_mut().set_entropy(0.75);
    source.automation_mut().tracks[1].set_value(0, 0.0);
    let preset = source.export_preset();
    let expected = play(&mut source, 32);

    let mut target = engine_with_seed(1.0);
    let report = target.import_preset(&preset).unwrap();
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(target.trigger().seed(), 99.0);
    assert_eq!(target.trigger().entropy(), 0.75);
    assert_eq!(play(&mut target, 32), expected);
}

#[test]
fn test_preset_survives_json_text() {
    let source = engine_with_seed(42.0);
    let text = serde_json::to_string_pretty(&source.export_preset()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();

    let mut target = engine_with_seed(42.0);
    target.import_preset(&parsed).unwrap();
    assert_eq!(target.export_preset(), source.export_preset());
}

#[test]
fn test_sections_from_preset_are_kept() {
    let mut engine = engine_with_seed(42.0);
    let preset = json!({
        "probability": { "settings": {}, "randomSeed": 42.0 },
        "automation": {
            "tracks": [],
            "sections": [
                { "name": "Verse", "color": "#123456", "start": 0, "end": 7 },
                { "name": "Chorus", "color": "#654321", "start": 8, "end": 15 },
            ],
        },
    });
    engine.import_preset(&preset).unwrap();
    let names: Vec<&str> = engine.sections().sections().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Verse", "Chorus"]);
    assert_eq!(engine.tick(9, None).section.as_deref(), Some("Chorus"));
}

#[test]
fn test_malformed_fields_degrade_gracefully() {
    let mut engine = engine_with_seed(42.0);
    let preset = json!({
        "probability": {
            "settings": {
                "kick": { "baseProbability": "full", "humanization": 2.0 },
                "theremin": {},
            },
            "quantization": -3,
            "randomSeed": 42.0,
        },
        "automation": { "tracks": "none", "sections": [] },
    });
    let report = engine.import_preset(&preset).unwrap();
    assert_eq!(report.applied, vec![InstrumentRole::Kick]);
    assert!(report.skipped.contains(&"settings.theremin".to_string()));
    assert!(report.defaulted.contains(&"settings.kick.baseProbability".to_string()));
    assert!(report.defaulted.contains(&"quantization".to_string()));
    assert!(report.defaulted.contains(&"automation.tracks".to_string()));

    let kick = engine.trigger().track(InstrumentRole::Kick).unwrap();
    assert_eq!(kick.humanization, 1.0);
    assert_eq!(engine.trigger().quantization(), 1);
    assert_eq!(engine.automation().tracks.len(), 8);
}

#[test]
fn test_non_object_preset_is_rejected() {
    let mut engine = engine_with_seed(42.0);
    assert_eq!(
        engine.import_preset(&json!("preset")),
        Err(ImportError::NotAnObject {
            what: "preset".to_string()
        })
    );
}
