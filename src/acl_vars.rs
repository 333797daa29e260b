//! ACL variable file loading and validation
//!
//! ```yaml
//! acl:
//!   - name: MGMT_ACCESS
//!     ace:
//!       - remark: Jump hosts
//!       - permit: 10.17.10.0/24
//!       - permit: 10.10.109.10
//!       - deny: any
//! ```
//!
//! All problems in the file are collected and reported together.

use aclkit::{Ace, Acl, Action, Address};
use anyhow::{Result, bail};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything wrong with an ACL variable file
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AclVarErrors {
    /// File-level problems
    pub file: Vec<String>,
    /// ACE problems per ACL name
    pub aces: BTreeMap<String, Vec<String>>,
}

impl AclVarErrors {
    pub fn is_empty(&self) -> bool {
        self.file.is_empty() && self.aces.values().all(Vec::is_empty)
    }
}

impl fmt::Display for AclVarErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines: Vec<String> = self.file.iter().map(|e| format!("AclError: {e}")).collect();
        for (name, errors) in &self.aces {
            if errors.is_empty() {
                continue;
            }
            lines.push(format!("AceError: '{name}' has the following ACE errors:"));
            lines.extend(errors.iter().map(|e| format!("  - {e}")));
        }
        f.write_str(&lines.join("\n"))
    }
}

/// Find the variable file as given, then relative to `base`
pub fn locate(filename: &Path, base: &Path) -> Result<PathBuf> {
    if filename.exists() {
        return Ok(filename.to_path_buf());
    }
    let candidate = base.join(filename);
    if candidate.exists() {
        return Ok(candidate);
    }
    bail!(
        "Cannot find file '{}' or '{}', check that it exists",
        filename.display(),
        candidate.display()
    )
}

/// Locate, read and validate an ACL variable file
pub fn load(filename: &Path, base: &Path) -> Result<Vec<Acl>> {
    let path = locate(filename, base)?;
    let content = fs::read_to_string(&path)?;
    log::debug!("Loaded ACL variables from {}", path.display());
    match parse(&content) {
        Ok(acls) => Ok(acls),
        Err(errors) => bail!("{} is invalid:\n{errors}", path.display()),
    }
}

/// Validate and convert ACL variables
pub fn parse(yaml: &str) -> std::result::Result<Vec<Acl>, AclVarErrors> {
    let mut errors = AclVarErrors::default();

    let document: Value = match serde_yaml::from_str(yaml) {
        Ok(value) => value,
        Err(e) => {
            errors.file.push(format!("not valid YAML: {e}"));
            return Err(errors);
        }
    };

    let Some(Value::Sequence(entries)) = document.get("acl") else {
        errors
            .file
            .push("Top level dict 'acl' does not exist or is not a list".to_string());
        return Err(errors);
    };

    let mut acls = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = entry.get("name").and_then(Value::as_str);
        let aces = entry.get("ace").and_then(Value::as_sequence);
        let (Some(name), Some(aces)) = (name, aces) else {
            let label = name.map_or_else(String::new, |n| format!(" {n}"));
            errors.file.push(format!(
                "ACL name is missing or the{label} ACE dictionary is not a list"
            ));
            continue;
        };

        let mut ace_errors = Vec::new();
        let entries = aces
            .iter()
            .filter_map(|ace| match parse_ace(ace) {
                Ok(ace) => Some(ace),
                Err(e) => {
                    ace_errors.push(e);
                    None
                }
            })
            .collect();

        if !ace_errors.is_empty() {
            errors.aces.entry(name.to_string()).or_default().extend(ace_errors);
        }
        acls.push(Acl::new(name, entries));
    }

    if errors.is_empty() { Ok(acls) } else { Err(errors) }
}

fn parse_ace(ace: &Value) -> std::result::Result<Ace, String> {
    let Some(mapping) = ace.as_mapping().filter(|m| m.len() == 1) else {
        return Err(format!("ACE entry '{}' is not a dictionary", describe(ace)));
    };
    let Some((key, value)) = mapping.iter().next() else {
        return Err("ACE entry is empty".to_string());
    };
    let key = key.as_str().unwrap_or_default();
    let value = scalar(value);

    match key {
        "remark" => Ok(Ace::remark(value)),
        "permit" | "deny" => {
            let action: Action = key.parse().map_err(|e: aclkit::Error| e.to_string())?;
            let source = Address::parse(&value)
                .map_err(|_| format!("{value} is not a valid IP address"))?;
            Ok(Ace::rule(action, source))
        }
        other => Err(format!(
            "{other} is not valid, options are 'remark', 'permit' or 'deny'"
        )),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => describe(other),
    }
}

fn describe(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
