use serde_json::{Map, Value};

use stochseq_types::{Breakpoint, CurveType, RawSection, RawTrack};

use super::ImportReport;

/// Result of looking up one field in a loosely-typed object.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Lookup<T> {
    Missing,
    Invalid,
    Found(T),
}

impl<T> Lookup<T> {
    /// The found value, or `None` after noting the fallback in `report`.
    pub(crate) fn or_report(self, field: &str, report: &mut ImportReport) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Missing => {
                report.note_default(field, "missing");
                None
            }
            Lookup::Invalid => {
                report.note_default(field, "wrong type");
                None
            }
        }
    }

    /// Like `or_report`, but a missing field is not worth noting.
    pub(crate) fn optional(self, field: &str, report: &mut ImportReport) -> Option<T> {
        match self {
            Lookup::Missing => None,
            other => other.or_report(field, report),
        }
    }
}

pub(crate) fn number(obj: &Map<String, Value>, key: &str) -> Lookup<f64> {
    match obj.get(key) {
        None | Some(Value::Null) => Lookup::Missing,
        Some(v) => v
            .as_f64()
            .filter(|n| n.is_finite())
            .map_or(Lookup::Invalid, Lookup::Found),
    }
}

/// Non-negative whole number. Fractions truncate; negatives are invalid.
pub(crate) fn count(obj: &Map<String, Value>, key: &str) -> Lookup<u32> {
    match number(obj, key) {
        Lookup::Found(n) if n >= 0.0 => Lookup::Found(n as u32),
        Lookup::Found(_) => Lookup::Invalid,
        Lookup::Missing => Lookup::Missing,
        Lookup::Invalid => Lookup::Invalid,
    }
}

pub(crate) fn boolean(obj: &Map<String, Value>, key: &str) -> Lookup<bool> {
    match obj.get(key) {
        None | Some(Value::Null) => Lookup::Missing,
        Some(Value::Bool(b)) => Lookup::Found(*b),
        Some(_) => Lookup::Invalid,
    }
}

pub(crate) fn string<'a>(obj: &'a Map<String, Value>, key: &str) -> Lookup<&'a str> {
    match obj.get(key) {
        None | Some(Value::Null) => Lookup::Missing,
        Some(Value::String(s)) => Lookup::Found(s.as_str()),
        Some(_) => Lookup::Invalid,
    }
}

/// Array of numbers. Non-numeric elements read as 0.0.
pub(crate) fn number_array(obj: &Map<String, Value>, key: &str) -> Lookup<Vec<f32>> {
    match obj.get(key) {
        None | Some(Value::Null) => Lookup::Missing,
        Some(Value::Array(items)) => Lookup::Found(
            items
                .iter()
                .map(|v| v.as_f64().filter(|n| n.is_finite()).unwrap_or(0.0) as f32)
                .collect(),
        ),
        Some(_) => Lookup::Invalid,
    }
}

pub(crate) fn curve_type(obj: &Map<String, Value>, key: &str) -> Lookup<CurveType> {
    match string(obj, key) {
        Lookup::Found(name) => CurveType::from_name(name).map_or(Lookup::Invalid, Lookup::Found),
        Lookup::Missing => Lookup::Missing,
        Lookup::Invalid => Lookup::Invalid,
    }
}

/// `lastTriggerStep`: a non-negative step, or -1/null for "never".
pub(crate) fn trigger_step(obj: &Map<String, Value>, key: &str) -> Lookup<Option<u32>> {
    match number(obj, key) {
        Lookup::Found(n) if n >= 0.0 => Lookup::Found(Some(n as u32)),
        Lookup::Found(_) => Lookup::Found(None),
        Lookup::Missing => Lookup::Missing,
        Lookup::Invalid => Lookup::Invalid,
    }
}

pub(crate) fn decode_track(obj: &Map<String, Value>, field: &str, report: &mut ImportReport) -> RawTrack {
    let mut breakpoints: Vec<Breakpoint> = Vec::new();
    match obj.get("breakpoints") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                let point = item.as_object().and_then(|p| {
                    match (count(p, "step"), number(p, "value")) {
                        (Lookup::Found(step), Lookup::Found(value)) => {
                            Some(Breakpoint::new(step, value as f32))
                        }
                        _ => None,
                    }
                });
                match point {
                    Some(point) => breakpoints.push(point),
                    None => report.skip(format!("{}.breakpoints[{}]", field, i)),
                }
            }
        }
        Some(_) => report.note_default(&format!("{}.breakpoints", field), "wrong type"),
    }

    RawTrack {
        id: string(obj, "id")
            .optional(&format!("{}.id", field), report)
            .map(str::to_string),
        label: string(obj, "label")
            .optional(&format!("{}.label", field), report)
            .map(str::to_string),
        color: string(obj, "color")
            .optional(&format!("{}.color", field), report)
            .map(str::to_string),
        values: number_array(obj, "values").optional(&format!("{}.values", field), report),
        curve_type: curve_type(obj, "curveType").optional(&format!("{}.curveType", field), report),
        breakpoints,
    }
}

/// Section bounds that are missing or non-numeric read as NaN and are
/// dropped during normalization.
pub(crate) fn decode_section(obj: &Map<String, Value>) -> RawSection {
    let bound = |key: &str| match number(obj, key) {
        Lookup::Found(n) => n,
        _ => f64::NAN,
    };
    let text = |key: &str| match string(obj, key) {
        Lookup::Found(s) => Some(s.to_string()),
        _ => None,
    };
    RawSection {
        name: text("name"),
        color: text("color"),
        start: bound("start"),
        end: bound("end"),
    }
}
