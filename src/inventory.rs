//! Static YAML inventory and host filters
//!
//! `hosts.yml`:
//!
//! ```yaml
//! core-sw1:
//!   hostname: 10.10.10.1
//!   groups: [ios]
//!   data:
//!     Infra_Location: DC1
//!     Infra_Logical_Location: Core
//!     type: switch
//!     IOSVersion: 16.12.4
//! ```
//!
//! `groups.yml` maps group name to `{platform, data}`. A host without its
//! own platform takes its first group's.

use crate::cli::FilterArgs;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const LOCATION_KEY: &str = "Infra_Location";
const LOGICAL_KEY: &str = "Infra_Logical_Location";
const TYPE_KEY: &str = "type";
const VERSION_KEY: &str = "IOSVersion";

#[derive(Debug, Clone, Default, Deserialize)]
struct HostEntry {
    hostname: Option<String>,
    #[serde(default)]
    groups: Vec<String>,
    platform: Option<String>,
    #[serde(default)]
    data: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GroupEntry {
    platform: Option<String>,
    #[serde(default)]
    data: BTreeMap<String, serde_yaml::Value>,
}

/// One inventory host with group data folded in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Host {
    pub name: String,
    /// Address used to reach the device
    pub hostname: String,
    pub groups: Vec<String>,
    pub platform: Option<String>,
    /// Host data over group data, values as strings
    pub data: BTreeMap<String, String>,
}

impl Host {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    hosts: Vec<Host>,
}

impl Inventory {
    /// Load hosts and groups files; a missing groups file means no groups
    pub fn load(hosts_file: &Path, groups_file: &Path) -> Result<Self> {
        let hosts = fs::read_to_string(hosts_file)
            .with_context(|| format!("Could not read inventory {}", hosts_file.display()))?;
        let groups = if groups_file.exists() {
            fs::read_to_string(groups_file)
                .with_context(|| format!("Could not read inventory {}", groups_file.display()))?
        } else {
            log::debug!("No groups file at {}", groups_file.display());
            String::new()
        };
        Self::parse(&hosts, &groups)
    }

    pub fn parse(hosts_yaml: &str, groups_yaml: &str) -> Result<Self> {
        let hosts: BTreeMap<String, Option<HostEntry>> =
            parse_optional(hosts_yaml).context("Invalid hosts file")?;
        let groups: BTreeMap<String, Option<GroupEntry>> =
            parse_optional(groups_yaml).context("Invalid groups file")?;

        let hosts = hosts
            .into_iter()
            .map(|(name, entry)| build_host(name, entry.unwrap_or_default(), &groups))
            .collect();
        Ok(Self { hosts })
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Hosts matching every filter
    pub fn filter(&self, filters: &HostFilter) -> Vec<Host> {
        self.hosts
            .iter()
            .filter(|host| filters.matches(host))
            .cloned()
            .collect()
    }
}

fn parse_optional<T: serde::de::DeserializeOwned + Default>(yaml: &str) -> Result<T> {
    if yaml.trim().is_empty() {
        return Ok(T::default());
    }
    let value: Option<T> = serde_yaml::from_str(yaml)?;
    Ok(value.unwrap_or_default())
}

fn build_host(
    name: String,
    entry: HostEntry,
    groups: &BTreeMap<String, Option<GroupEntry>>,
) -> Host {
    let group_entries: Vec<&GroupEntry> = entry
        .groups
        .iter()
        .filter_map(|g| groups.get(g).and_then(Option::as_ref))
        .collect();

    // later groups are weaker, host data wins over all
    let mut data = BTreeMap::new();
    for group in group_entries.iter().rev() {
        data.extend(stringify(&group.data));
    }
    data.extend(stringify(&entry.data));

    let platform = entry
        .platform
        .or_else(|| group_entries.first().and_then(|g| g.platform.clone()));

    Host {
        hostname: entry.hostname.unwrap_or_else(|| name.clone()),
        name,
        groups: entry.groups,
        platform,
        data,
    }
}

fn stringify(data: &BTreeMap<String, serde_yaml::Value>) -> BTreeMap<String, String> {
    data.iter()
        .filter_map(|(key, value)| {
            let text = match value {
                serde_yaml::Value::String(s) => s.clone(),
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key.clone(), text))
        })
        .collect()
}

// ============================================================================
// Filters
// ============================================================================

/// Host predicates, combined with AND; empty fields match everything
#[derive(Debug, Clone, Default)]
pub struct HostFilter {
    pub name_contains: Option<String>,
    pub groups: Vec<String>,
    pub locations: Vec<String>,
    pub logical: Vec<String>,
    pub types: Vec<String>,
    pub version_contains: Option<String>,
}

impl From<&FilterArgs> for HostFilter {
    fn from(args: &FilterArgs) -> Self {
        Self {
            name_contains: args.hostname.clone(),
            groups: args.group.clone(),
            locations: args.location.clone(),
            logical: args.logical.clone(),
            types: args.device_type.clone(),
            version_contains: args.sw_version.clone(),
        }
    }
}

impl HostFilter {
    pub fn matches(&self, host: &Host) -> bool {
        contains(Some(&host.name), self.name_contains.as_deref())
            && (self.groups.is_empty() || host.groups.iter().any(|g| self.groups.contains(g)))
            && any_of(host.get(LOCATION_KEY), &self.locations)
            && any_of(host.get(LOGICAL_KEY), &self.logical)
            && any_of(host.get(TYPE_KEY), &self.types)
            && contains(host.get(VERSION_KEY), self.version_contains.as_deref())
    }

    /// Filter values, for display
    pub fn describe(&self) -> Vec<String> {
        let mut parts = Vec::new();
        parts.extend(self.name_contains.iter().cloned());
        parts.extend(self.groups.iter().cloned());
        parts.extend(self.locations.iter().cloned());
        parts.extend(self.logical.iter().cloned());
        parts.extend(self.types.iter().cloned());
        parts.extend(self.version_contains.iter().cloned());
        parts
    }
}

fn any_of(value: Option<&str>, wanted: &[String]) -> bool {
    wanted.is_empty() || value.is_some_and(|v| wanted.iter().any(|w| w == v))
}

fn contains<S: AsRef<str>>(value: Option<S>, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => value.is_some_and(|v| v.as_ref().contains(needle)),
    }
}
