//! Per-device validation pipeline
//!
//! desired state -> show commands -> formatted actual state -> compliance
//! report -> optional report file.

use crate::compare::{compliance_report, is_empty_desired};
use crate::error::Result;
use crate::formatter::FormatterRegistry;
use crate::report::ReportStore;
use crate::transport::Transport;
use crate::types::{ActualState, ComplianceReport, DesiredState, StateMap};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// Outcome of validating one device
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// Every compared command complies
    Complies {
        report: ComplianceReport,
        report_path: Option<PathBuf>,
    },
    /// At least one compared command does not comply
    Violations {
        report: ComplianceReport,
        report_path: Option<PathBuf>,
    },
    /// The input produced no desired state for the device; nothing was run
    NoDesiredState,
}

impl ValidationResult {
    pub fn failed(&self) -> bool {
        !matches!(self, Self::Complies { .. })
    }

    pub fn report(&self) -> Option<&ComplianceReport> {
        match self {
            Self::Complies { report, .. } | Self::Violations { report, .. } => Some(report),
            Self::NoDesiredState => None,
        }
    }

    pub fn report_path(&self) -> Option<&Path> {
        match self {
            Self::Complies { report_path, .. } | Self::Violations { report_path, .. } => {
                report_path.as_deref()
            }
            Self::NoDesiredState => None,
        }
    }

    /// Human-readable result text
    ///
    /// A failing report is rendered in full as pretty JSON.
    pub fn message(&self) -> String {
        match self {
            Self::Complies { report_path, .. } => {
                let mut text =
                    "Validation report complies, desired_state and actual_state match.".to_string();
                if let Some(path) = report_path {
                    text.push_str(&format!(
                        "\nThe report can be viewed using: cat {} | python -m json.tool",
                        path.display()
                    ));
                }
                text
            }
            Self::Violations { report, .. } => serde_json::to_string_pretty(report)
                .unwrap_or_else(|e| format!("unprintable report: {e}")),
            Self::NoDesiredState => "No validations were performed as no desired_state was \
                                     generated, check input file and template"
                .to_string(),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Runs the validation pipeline against devices through a [`Transport`]
pub struct Validator<'a> {
    transport: &'a dyn Transport,
    formatters: &'a FormatterRegistry,
    store: Option<ReportStore>,
}

fn is_comparable(expected: &Value) -> bool {
    expected.is_object() && !is_empty_desired(expected)
}

impl<'a> Validator<'a> {
    pub fn new(transport: &'a dyn Transport, formatters: &'a FormatterRegistry) -> Self {
        Self {
            transport,
            formatters,
            store: None,
        }
    }

    /// Persist every report into `store`
    pub fn with_store(mut self, store: ReportStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Raw output of every comparable desired command
    ///
    /// Commands whose desired value is empty or not a mapping are never
    /// sent, since their output could not be compared.
    pub fn discover(&self, host: &str, desired: &DesiredState) -> Result<StateMap> {
        let mut raw = StateMap::new();
        for (command, expected) in desired {
            if !is_comparable(expected) {
                log::debug!("{host}: '{command}' has nothing to compare, not sending");
                continue;
            }
            log::debug!("{host}: running '{command}'");
            let output = self.transport.send_command(host, command)?;
            raw.insert(command.clone(), Value::String(output));
        }
        Ok(raw)
    }

    /// Gather and format the actual state for every comparable desired command
    pub fn actual_state(
        &self,
        host: &str,
        platform: &str,
        desired: &DesiredState,
    ) -> Result<ActualState> {
        let raw = self.discover(host, desired)?;
        Ok(raw
            .into_iter()
            .map(|(command, output)| {
                let formatted = self.formatters.format(platform, &command, output.as_str());
                (command, Value::Object(formatted))
            })
            .collect())
    }

    /// Validate one device
    ///
    /// `name` identifies the device in report file names, `host` is the
    /// address handed to the transport.
    pub fn validate(
        &self,
        name: &str,
        host: &str,
        platform: &str,
        desired: &DesiredState,
    ) -> Result<ValidationResult> {
        if desired.is_empty() {
            log::warn!("{name}: no desired state, skipping");
            return Ok(ValidationResult::NoDesiredState);
        }
        let actual = self.actual_state(host, platform, desired)?;
        self.evaluate(name, desired, &actual)
    }

    /// Compare already-gathered state and persist the report
    pub fn evaluate(
        &self,
        name: &str,
        desired: &DesiredState,
        actual: &ActualState,
    ) -> Result<ValidationResult> {
        let report = compliance_report(desired, actual);
        let report_path = match &self.store {
            Some(store) => Some(store.write(name, &report)?),
            None => None,
        };

        log::info!(
            "{name}: {} command(s) compared, {} skipped, complies: {}",
            report.compared(),
            report.skipped.len(),
            report.complies
        );

        Ok(if report.complies {
            ValidationResult::Complies {
                report,
                report_path,
            }
        } else {
            ValidationResult::Violations {
                report,
                report_path,
            }
        })
    }
}
