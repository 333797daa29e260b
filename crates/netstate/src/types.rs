//! Core types for desired-vs-actual state validation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Nested state mapping, keyed in insertion order
pub type StateMap = serde_json::Map<String, Value>;

/// Command string -> expected nested structure
pub type DesiredState = StateMap;

/// Command string -> canonical structure produced by a formatter
pub type ActualState = StateMap;

/// Reserved key selecting the comparison mode of one nesting level
pub const MODE_KEY: &str = "_mode";

/// Value of [`MODE_KEY`] that also flags actual-only keys
pub const STRICT_MODE: &str = "strict";

/// Comparison result for one key that exists on both sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentEntry {
    /// Whether the actual value satisfies the desired one
    pub complies: bool,
    /// Whether both sides were mappings and were compared key by key
    pub nested: bool,
    /// Desired value of a scalar mismatch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<Value>,
    /// Actual value of a scalar mismatch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<Value>,
    /// Per-key results of a failed nested mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub present: Option<BTreeMap<String, PresentEntry>>,
    /// Desired keys absent from a failed nested mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
    /// Actual-only keys of a failed strict nested mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Vec<String>>,
}

impl PresentEntry {
    /// Entry for a key whose value matched
    pub fn matched(nested: bool) -> Self {
        Self {
            complies: true,
            nested,
            expected_value: None,
            actual_value: None,
            present: None,
            missing: None,
            extra: None,
        }
    }

    /// Entry for a value that differs, recording both sides
    pub fn mismatch(expected: &Value, actual: &Value) -> Self {
        Self {
            complies: false,
            nested: false,
            expected_value: Some(expected.clone()),
            actual_value: Some(actual.clone()),
            present: None,
            missing: None,
            extra: None,
        }
    }

    /// Entry for a nested mapping that failed, carrying its detail
    pub fn nested_failure(entry: ComplianceEntry) -> Self {
        Self {
            complies: false,
            nested: true,
            expected_value: None,
            actual_value: None,
            present: Some(entry.present),
            missing: Some(entry.missing),
            extra: Some(entry.extra),
        }
    }
}

/// Comparison result for one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceEntry {
    /// Whether the command's actual state satisfies the desired one
    pub complies: bool,
    /// Results for desired keys found in the actual state
    #[serde(default)]
    pub present: BTreeMap<String, PresentEntry>,
    /// Desired keys absent from the actual state
    #[serde(default)]
    pub missing: Vec<String>,
    /// Actual-only keys of a strict level
    #[serde(default)]
    pub extra: Vec<String>,
}

impl Default for ComplianceEntry {
    fn default() -> Self {
        Self {
            complies: true,
            present: BTreeMap::new(),
            missing: Vec::new(),
            extra: Vec::new(),
        }
    }
}

/// Marker recorded for a command whose comparison could not run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    /// Always `true`, marks the entry kind on disk
    pub skipped: bool,
    /// Why the comparison could not run
    pub reason: String,
}

/// Top-level report fields that commands share a namespace with
const RESERVED_KEYS: [&str; 2] = ["complies", "skipped"];

/// Per-command entry of a [`ComplianceReport`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandReport {
    /// Comparison could not run
    Skipped(SkippedEntry),
    /// Comparison ran
    Compared(ComplianceEntry),
}

impl CommandReport {
    /// Skipped entries count as compliant for aggregation
    pub fn complies(&self) -> bool {
        match self {
            Self::Skipped(_) => true,
            Self::Compared(entry) => entry.complies,
        }
    }

    /// Whether the comparison could not run
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Aggregate report for one device
///
/// Serializes as `{"complies": .., "skipped": [..], "<command>": {..}, ..}`,
/// which is also the on-disk report format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// AND over every compared command
    pub complies: bool,
    /// Commands whose comparison could not run, in encounter order
    #[serde(default)]
    pub skipped: Vec<String>,
    /// Per-command entries, flattened next to the fields above
    #[serde(flatten)]
    pub commands: BTreeMap<String, CommandReport>,
}

impl Default for ComplianceReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ComplianceReport {
    /// Empty report, vacuously compliant
    pub fn new() -> Self {
        Self {
            complies: true,
            skipped: Vec::new(),
            commands: BTreeMap::new(),
        }
    }

    /// Whether `command` would collide with a top-level report field
    pub fn is_reserved(command: &str) -> bool {
        RESERVED_KEYS.contains(&command)
    }

    /// Record a compared command
    ///
    /// A command named like a report field cannot be stored and is
    /// recorded as skipped instead.
    pub fn insert(&mut self, command: impl Into<String>, entry: ComplianceEntry) {
        let command = command.into();
        if Self::is_reserved(&command) {
            log::warn!("Command '{command}' clashes with a report field, skipping");
            self.skip(command, "command name clashes with a report field");
            return;
        }
        self.complies &= entry.complies;
        self.commands.insert(command, CommandReport::Compared(entry));
    }

    /// Record a command whose comparison could not run
    ///
    /// Reserved command names only appear in `skipped`.
    pub fn skip(&mut self, command: impl Into<String>, reason: impl Into<String>) {
        let command = command.into();
        if !self.skipped.contains(&command) {
            self.skipped.push(command.clone());
        }
        if Self::is_reserved(&command) {
            return;
        }
        self.commands.insert(
            command,
            CommandReport::Skipped(SkippedEntry {
                skipped: true,
                reason: reason.into(),
            }),
        );
    }

    /// Fold a newer report into this one
    ///
    /// `skipped` is unioned, `complies` is ANDed and per-command entries
    /// are overwritten by the newer report.
    pub fn merge(&mut self, newer: Self) {
        for command in newer.skipped {
            if !self.skipped.contains(&command) {
                self.skipped.push(command);
            }
        }
        self.complies &= newer.complies;
        self.commands.extend(newer.commands);
    }

    /// Entry for one command
    pub fn get(&self, command: &str) -> Option<&CommandReport> {
        self.commands.get(command)
    }

    /// Number of commands that were actually compared
    pub fn compared(&self) -> usize {
        self.commands.values().filter(|c| !c.is_skipped()).count()
    }

    /// Whether no command was recorded
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
