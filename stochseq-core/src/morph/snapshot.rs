use std::collections::BTreeMap;

use stochseq_types::{normalize_values, SectionSnapshot, TrackDefinition};

use crate::config::SectionConfig;

/// Precompute the snapshot of one section.
///
/// Every track's base curve is resampled to `step_count`, then each sample is
/// scaled by the section's track modifier and its influence envelope at that
/// step's position through the pattern.
pub fn build_snapshot(
    section: &SectionConfig,
    tracks: &[TrackDefinition],
    step_count: usize,
) -> SectionSnapshot {
    let span = step_count.saturating_sub(1).max(1) as f32;
    let automation = tracks
        .iter()
        .map(|def| {
            let modifier = section.track_modifier(&def.id);
            let values = normalize_values(&def.curve, step_count, def.curve_type)
                .into_iter()
                .enumerate()
                .map(|(i, value)| {
                    let influence = section.influence_at(i as f32 / span);
                    (value * modifier * influence).clamp(0.0, 1.0)
                })
                .collect();
            (def.id.clone(), values)
        })
        .collect();

    SectionSnapshot {
        automation,
        rhythm: section.rhythm,
        harmony: section.harmony,
        dynamics: section.dynamics,
    }
}

/// Snapshots for every configured section, keyed by name.
pub fn build_snapshots(
    sections: &[SectionConfig],
    tracks: &[TrackDefinition],
    step_count: usize,
) -> BTreeMap<String, SectionSnapshot> {
    sections
        .iter()
        .map(|section| (section.name.clone(), build_snapshot(section, tracks, step_count)))
        .collect()
}
