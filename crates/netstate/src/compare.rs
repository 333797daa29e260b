//! Desired-vs-actual comparison
//!
//! Lenient levels only check that every desired key exists with an equal
//! value. A level carrying `_mode: strict` additionally reports keys that
//! only exist in the actual state.

use crate::error::{Error, Result};
use crate::types::{
    ActualState, ComplianceEntry, ComplianceReport, DesiredState, MODE_KEY, PresentEntry,
    STRICT_MODE, StateMap,
};
use serde_json::Value;

/// Compare every command of a desired state against the actual state
///
/// Commands with an empty desired value are ignored. Commands whose shape
/// cannot be compared are recorded as skipped and excluded from the
/// aggregate verdict.
pub fn compliance_report(desired: &DesiredState, actual: &ActualState) -> ComplianceReport {
    let mut report = ComplianceReport::new();
    let empty = Value::Object(StateMap::new());

    for (command, expected) in desired {
        if is_empty_desired(expected) {
            log::debug!("No desired state for '{command}', skipping");
            continue;
        }

        let Value::Object(expected) = expected else {
            log::warn!(
                "Desired state for '{command}' is a {}, skipping",
                kind(expected)
            );
            report.skip(
                command,
                format!("unsupported desired shape: {}", kind(expected)),
            );
            continue;
        };

        let observed = actual.get(command).unwrap_or(&empty);
        match compare_state(expected, observed) {
            Ok(entry) => {
                log::debug!("'{command}' complies: {}", entry.complies);
                report.insert(command, entry);
            }
            Err(e) => {
                log::warn!("Cannot compare '{command}': {e}");
                report.skip(command, e.to_string());
            }
        }
    }

    report
}

/// Compare one command's desired mapping against its actual value
pub fn compare_state(desired: &StateMap, actual: &Value) -> Result<ComplianceEntry> {
    match actual {
        Value::Object(actual) => Ok(compare_map(desired, actual)),
        Value::Null => Ok(compare_map(desired, &StateMap::new())),
        other => Err(Error::UnsupportedShape(format!(
            "actual state is a {}",
            kind(other)
        ))),
    }
}

fn compare_map(desired: &StateMap, actual: &StateMap) -> ComplianceEntry {
    let mut entry = ComplianceEntry::default();

    for (key, expected) in desired {
        if key == MODE_KEY {
            continue;
        }
        match actual.get(key) {
            Some(observed) => {
                entry
                    .present
                    .insert(key.clone(), compare_value(expected, observed));
            }
            None => entry.missing.push(key.clone()),
        }
    }

    if is_strict(desired) {
        entry.extra = actual
            .keys()
            .filter(|key| *key != MODE_KEY && !desired.contains_key(*key))
            .cloned()
            .collect();
    }

    entry.complies = entry.missing.is_empty()
        && entry.extra.is_empty()
        && entry.present.values().all(|p| p.complies);
    entry
}

fn compare_value(expected: &Value, observed: &Value) -> PresentEntry {
    if let (Value::Object(expected), Value::Object(observed)) = (expected, observed) {
        let nested = compare_map(expected, observed);
        return if nested.complies {
            PresentEntry::matched(true)
        } else {
            PresentEntry::nested_failure(nested)
        };
    }

    if values_match(expected, observed) {
        PresentEntry::matched(false)
    } else {
        PresentEntry::mismatch(expected, observed)
    }
}

fn values_match(expected: &Value, observed: &Value) -> bool {
    match (expected, observed) {
        (Value::Object(e), Value::Object(o)) => compare_map(e, o).complies,
        (Value::Array(e), Value::Array(o)) => {
            e.len() == o.len() && e.iter().zip(o).all(|(e, o)| values_match(e, o))
        }
        _ => scalars_match(expected, observed),
    }
}

// YAML input yields numbers where device output yields strings
fn scalars_match(expected: &Value, observed: &Value) -> bool {
    if expected == observed {
        return true;
    }
    match (scalar_text(expected), scalar_text(observed)) {
        (Some(e), Some(o)) => e == o,
        _ => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_strict(level: &StateMap) -> bool {
    level.get(MODE_KEY).and_then(Value::as_str) == Some(STRICT_MODE)
}

/// Whether a desired value carries nothing to compare
pub fn is_empty_desired(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.keys().all(|key| key == MODE_KEY),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
