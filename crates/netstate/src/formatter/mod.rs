//! Actual-state formatters
//!
//! A formatter turns the raw text a device returns for one command into a
//! canonical nested mapping that can be compared against desired state.
//! Formatters are looked up by platform tag and a command pattern.

pub mod ios;

use crate::error::Result;
use crate::types::{ActualState, StateMap};
use regex::Regex;
use serde_json::Value;

/// Function converting raw command output into a canonical mapping
pub type FormatFn = dyn Fn(&str) -> StateMap + Send + Sync;

struct FormatterEntry {
    platforms: Vec<String>,
    pattern: Regex,
    format: Box<FormatFn>,
}

impl FormatterEntry {
    fn matches(&self, platform: &str, command: &str) -> bool {
        self.platforms.iter().any(|p| p == platform) && self.pattern.is_match(command)
    }
}

/// Registry of formatters keyed by (platform tag, command pattern)
///
/// Entries are tried in registration order; the first match wins.
pub struct FormatterRegistry {
    entries: Vec<FormatterEntry>,
}

impl FormatterRegistry {
    /// Empty registry with no formatters
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registry preloaded with the built-in platform formatters
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        ios::register(&mut registry)?;
        Ok(registry)
    }

    /// Register a formatter for the given platforms and command regex
    pub fn register<F>(&mut self, platforms: &[&str], pattern: &str, format: F) -> Result<()>
    where
        F: Fn(&str) -> StateMap + Send + Sync + 'static,
    {
        let pattern = Regex::new(pattern)?;
        log::debug!("Registered formatter {} for {platforms:?}", pattern.as_str());
        self.entries.push(FormatterEntry {
            platforms: platforms.iter().map(|p| (*p).to_string()).collect(),
            pattern,
            format: Box::new(format),
        });
        Ok(())
    }

    /// Whether a formatter exists for this platform and command
    pub fn supports(&self, platform: &str, command: &str) -> bool {
        self.entries.iter().any(|e| e.matches(platform, command))
    }

    /// Format the output of one command
    ///
    /// Empty or absent output and unknown (platform, command) pairs both
    /// yield an empty mapping.
    pub fn format(&self, platform: &str, command: &str, output: Option<&str>) -> StateMap {
        let Some(output) = output.filter(|o| !o.trim().is_empty()) else {
            return StateMap::new();
        };
        match self.entries.iter().find(|e| e.matches(platform, command)) {
            Some(entry) => (entry.format)(output),
            None => {
                log::debug!("No formatter for '{command}' on {platform}");
                StateMap::new()
            }
        }
    }

    /// Build the actual state from (command, raw output) pairs
    pub fn actual_state<'a, I>(&self, platform: &str, outputs: I) -> ActualState
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        outputs
            .into_iter()
            .map(|(command, output)| {
                let formatted = self.format(platform, command, Some(output));
                (command.to_string(), Value::Object(formatted))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> FormatterRegistry {
        FormatterRegistry::builtin().unwrap()
    }

    #[test]
    fn test_builtin_covers_ios_family() {
        let registry = registry();
        assert!(registry.supports("ios", "show ip ospf neighbor"));
        assert!(registry.supports("iosxe", "show etherchannel summary"));
        assert!(registry.supports("ios", "show ip access-lists TEST_SSH_ACCESS"));
        assert!(!registry.supports("nxos", "show ip ospf neighbor"));
        assert!(!registry.supports("ios", "show clock"));
    }

    #[test]
    fn test_unknown_combination_yields_empty_mapping() {
        let registry = registry();
        assert!(registry.format("asa", "show run ssh", Some("ssh 10.0.0.0 255.0.0.0 mgmt")).is_empty());
        assert!(registry.format("ios", "show clock", Some("*10:00:00 UTC")).is_empty());
    }

    #[test]
    fn test_empty_output_yields_empty_mapping() {
        let registry = registry();
        assert!(registry.format("ios", "show ip ospf neighbor", None).is_empty());
        assert!(registry.format("ios", "show ip ospf neighbor", Some("  \n")).is_empty());
    }

    #[test]
    fn test_register_custom_formatter() {
        let mut registry = FormatterRegistry::new();
        registry
            .register(&["nxos"], r"^show hostname$", |output| {
                let mut map = StateMap::new();
                map.insert("hostname".to_string(), json!(output.trim()));
                map
            })
            .unwrap();

        let state = registry.format("nxos", "show hostname", Some("n9k-1\n"));
        assert_eq!(state.get("hostname"), Some(&json!("n9k-1")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_bad_pattern() {
        let mut registry = FormatterRegistry::new();
        assert!(registry.register(&["ios"], "show (", |_| StateMap::new()).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_actual_state_keys_by_command() {
        let registry = registry();
        let output = "Neighbor ID     Pri   State           Dead Time   Address         Interface\n\
                      2.2.2.2           1   FULL/BDR        00:00:31    10.1.1.2        Vlan2\n";
        let actual = registry.actual_state(
            "ios",
            [("show ip ospf neighbor", output), ("show clock", "10:00")],
        );

        assert_eq!(
            actual.get("show ip ospf neighbor"),
            Some(&json!({"2.2.2.2": {"state": "FULL"}}))
        );
        assert_eq!(actual.get("show clock"), Some(&json!({})));
    }
}
