//! Curve laws and per-step resampling for automation values.
//!
//! All functions here are pure and allocation-bounded by the requested step
//! count. Output values are always finite and inside `0.0..=1.0`.

use crate::state::automation::{Breakpoint, CurveType};

/// Interpolate from `a` to `b` at position `t` (0.0-1.0) using `curve`.
pub fn interpolate(a: f32, b: f32, t: f32, curve: CurveType) -> f32 {
    match curve {
        CurveType::Linear => a + (b - a) * t,
        CurveType::Exponential => a + (b - a) * (t * t),
        CurveType::Logarithmic => a + (b - a) * t.sqrt(),
        CurveType::Sine => {
            let shaped = (t * std::f32::consts::PI - std::f32::consts::FRAC_PI_2).sin() * 0.5 + 0.5;
            a + (b - a) * shaped
        }
        CurveType::Bezier => {
            let p1 = a + (b - a) * 0.25;
            let p2 = a + (b - a) * 0.75;
            cubic_bezier(a, p1, p2, b, t)
        }
    }
}

fn cubic_bezier(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    let tt = t * t;
    let uu = u * u;
    uu * u * p0 + 3.0 * uu * t * p1 + 3.0 * u * tt * p2 + tt * t * p3
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Resample `values` to exactly `step_count` samples.
///
/// Empty input yields zeros, a single value is broadcast, an input of the
/// right length passes through (clamped). Anything else maps target index `i`
/// to source position `i / (step_count - 1) * (len - 1)` and interpolates the
/// two neighbouring samples with `curve`.
pub fn normalize_values(values: &[f32], step_count: usize, curve: CurveType) -> Vec<f32> {
    if step_count == 0 {
        return Vec::new();
    }
    if values.is_empty() {
        return vec![0.0; step_count];
    }

    let sanitized: Vec<f32> = values.iter().copied().map(sanitize).collect();

    if sanitized.len() == 1 {
        return vec![sanitized[0]; step_count];
    }
    if sanitized.len() == step_count {
        return sanitized;
    }

    let last_index = sanitized.len() - 1;
    if step_count == 1 {
        return vec![sanitized[last_index]];
    }

    (0..step_count)
        .map(|i| {
            let position = i as f64 / (step_count - 1) as f64;
            let scaled = position * last_index as f64;
            let lower = scaled.floor() as usize;
            let upper = (scaled.ceil() as usize).min(last_index);
            if lower == upper {
                return sanitized[lower];
            }
            let ratio = (scaled - lower as f64) as f32;
            interpolate(sanitized[lower], sanitized[upper], ratio, curve).clamp(0.0, 1.0)
        })
        .collect()
}

/// Render sparse breakpoints into one value per step.
///
/// Breakpoints must be sorted by step. Steps before the first or after the
/// last breakpoint hold that breakpoint's value.
pub fn resolve_breakpoints(points: &[Breakpoint], step_count: usize, curve: CurveType) -> Vec<f32> {
    match points {
        [] => vec![0.0; step_count],
        [only] => vec![sanitize(only.value); step_count],
        _ => (0..step_count)
            .map(|i| {
                let step = i as u32;
                let before = points.iter().rev().find(|p| p.step <= step);
                let after = points.iter().find(|p| p.step >= step);
                let value = match (before, after) {
                    (Some(b), Some(a)) if b.step == a.step => b.value,
                    (Some(b), Some(a)) => {
                        let t = (step - b.step) as f32 / (a.step - b.step) as f32;
                        interpolate(b.value, a.value, t, curve)
                    }
                    (Some(b), None) => b.value,
                    (None, Some(a)) => a.value,
                    (None, None) => 0.0,
                };
                sanitize(value)
            })
            .collect(),
    }
}
