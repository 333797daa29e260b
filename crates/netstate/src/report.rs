//! Compliance report persistence
//!
//! One JSON file per host and run minute:
//! `{directory}/{host}_compliance_report_{YYYYMMDD-HH:MM}.json`.
//! Writing to an existing file merges into it instead of replacing it.

use crate::error::{Error, Result};
use crate::types::ComplianceReport;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H:%M";

/// Directory of per-host compliance report files
#[derive(Debug, Clone)]
pub struct ReportStore {
    directory: PathBuf,
}

impl ReportStore {
    /// Create a store rooted at `directory`, expanding `~` and env vars
    pub fn new(directory: &str) -> Self {
        let expanded = shellexpand::full(directory)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| directory.to_string());
        Self {
            directory: PathBuf::from(expanded),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the report file for `host` at time `at`
    pub fn report_path(&self, host: &str, at: DateTime<Local>) -> PathBuf {
        self.directory.join(format!(
            "{host}_compliance_report_{}.json",
            at.format(TIMESTAMP_FORMAT)
        ))
    }

    /// Merge `report` into the file for `host` at the current minute
    pub fn write(&self, host: &str, report: &ComplianceReport) -> Result<PathBuf> {
        self.write_at(host, report, Local::now())
    }

    /// Merge `report` into the file for `host` at time `at`
    ///
    /// Returns the path written.
    pub fn write_at(
        &self,
        host: &str,
        report: &ComplianceReport,
        at: DateTime<Local>,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory).map_err(|source| Error::ReportIo {
            path: self.directory.clone(),
            source,
        })?;

        let path = self.report_path(host, at);
        let merged = match Self::load(&path)? {
            Some(mut existing) => {
                log::debug!("Merging into existing report {}", path.display());
                existing.merge(report.clone());
                existing
            }
            None => report.clone(),
        };

        let content = serde_json::to_string_pretty(&merged)?;
        fs::write(&path, content).map_err(|source| Error::ReportIo {
            path: path.clone(),
            source,
        })?;

        log::info!("Wrote compliance report {}", path.display());
        Ok(path)
    }

    /// Load a report file, or `None` if it does not exist
    pub fn load(path: &Path) -> Result<Option<ComplianceReport>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|source| Error::ReportIo {
            path: path.to_path_buf(),
            source,
        })?;
        let report = serde_json::from_str(&content).map_err(|source| Error::ReportParse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CommandReport, ComplianceEntry};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 42).unwrap()
    }

    fn report(command: &str, complies: bool) -> ComplianceReport {
        let mut report = ComplianceReport::new();
        report.insert(
            command,
            ComplianceEntry {
                complies,
                ..ComplianceEntry::default()
            },
        );
        report
    }

    #[test]
    fn test_report_path_format() {
        let store = ReportStore::new("/var/reports");
        assert_eq!(
            store.report_path("core-sw1", at()),
            PathBuf::from("/var/reports/core-sw1_compliance_report_20240309-14:05.json")
        );
    }

    #[test]
    fn test_new_expands_tilde() {
        let store = ReportStore::new("~/reports");
        assert!(!store.directory().to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_write_creates_directory_and_file() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("reports");
        let store = ReportStore::new(&dir.to_string_lossy());

        let path = store.write_at("sw1", &report("show ip ospf neighbor", true), at()).unwrap();

        assert!(path.exists());
        let loaded = ReportStore::load(&path).unwrap().unwrap();
        assert!(loaded.complies);
        assert!(loaded.get("show ip ospf neighbor").is_some());
    }

    #[test]
    fn test_merge_true_then_false() {
        let temp = TempDir::new().unwrap();
        let store = ReportStore::new(&temp.path().to_string_lossy());

        let mut first = report("show ip ospf neighbor", true);
        first.skip("show version", "unsupported desired shape: list");
        store.write_at("sw1", &first, at()).unwrap();

        let mut second = report("show etherchannel summary", false);
        second.skip("show clock", "unsupported desired shape: string");
        let path = store.write_at("sw1", &second, at()).unwrap();

        let merged = ReportStore::load(&path).unwrap().unwrap();
        assert!(!merged.complies);
        assert_eq!(merged.skipped, vec!["show version", "show clock"]);
        assert!(merged.get("show ip ospf neighbor").is_some());
        assert!(merged.get("show etherchannel summary").is_some());
    }

    #[test]
    fn test_newer_entry_overwrites_command() {
        let temp = TempDir::new().unwrap();
        let store = ReportStore::new(&temp.path().to_string_lossy());

        store.write_at("sw1", &report("cmd", false), at()).unwrap();
        let path = store.write_at("sw1", &report("cmd", true), at()).unwrap();

        let merged = ReportStore::load(&path).unwrap().unwrap();
        // Entry is replaced, aggregate stays false
        assert!(merged.get("cmd").is_some_and(CommandReport::complies));
        assert!(!merged.complies);
    }

    #[test]
    fn test_different_hosts_use_different_files() {
        let temp = TempDir::new().unwrap();
        let store = ReportStore::new(&temp.path().to_string_lossy());

        let a = store.write_at("sw1", &report("cmd", true), at()).unwrap();
        let b = store.write_at("sw2", &report("cmd", false), at()).unwrap();

        assert_ne!(a, b);
        assert!(ReportStore::load(&a).unwrap().unwrap().complies);
    }

    #[test]
    fn test_malformed_existing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let store = ReportStore::new(&temp.path().to_string_lossy());
        fs::write(store.report_path("sw1", at()), "not json").unwrap();

        let err = store.write_at("sw1", &report("cmd", true), at()).unwrap_err();
        assert!(matches!(err, Error::ReportParse { .. }));
    }

    #[test]
    fn test_load_missing_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(ReportStore::load(&temp.path().join("absent.json")).unwrap().is_none());
    }
}
