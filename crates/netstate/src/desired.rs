//! Desired-state construction
//!
//! An input document lists validation features per host, per group and
//! for all devices:
//!
//! ```yaml
//! hosts:
//!   core-sw1:
//!     ospf: { nbrs: [192.168.255.1, 2.2.2.2] }
//! groups:
//!   access:
//!     port_channel: { Po3: { mode: LACP, members: [Gi0/15, Gi0/16] } }
//! all:
//!   acl:
//!     - name: TEST_SSH_ACCESS
//!       ace: [{ permit: 10.17.10.0/24 }, { deny: any }]
//! ```
//!
//! Each feature is rendered into commands by a [`FeatureRegistry`] builder.
//! For one device the sections are applied host, then group, then all, so
//! later sections overwrite command keys produced by earlier ones.

use crate::error::{Error, Result};
use crate::types::{DesiredState, MODE_KEY, STRICT_MODE, StateMap};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// Feature name -> feature variables
pub type FeatureSet = StateMap;

/// Parsed desired-state input document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesiredDocument {
    #[serde(default)]
    pub hosts: Option<BTreeMap<String, Option<FeatureSet>>>,
    #[serde(default)]
    pub groups: Option<BTreeMap<String, Option<FeatureSet>>>,
    #[serde(default)]
    pub all: Option<FeatureSet>,
}

impl DesiredDocument {
    /// Build a document from an already-parsed value
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(_) => {
                serde_json::from_value(value).map_err(|e| Error::Document(e.to_string()))
            }
            _ => Err(Error::Document(
                "expected a mapping with 'hosts', 'groups' or 'all'".to_string(),
            )),
        }
    }

    /// Feature sets that apply to a device, in merge order
    ///
    /// Only the device's first group is consulted.
    pub fn sections_for<'a>(&'a self, host: &str, groups: &[String]) -> Vec<&'a FeatureSet> {
        let host_set = self
            .hosts
            .as_ref()
            .and_then(|hosts| hosts.get(host))
            .and_then(Option::as_ref);
        let group_set = groups.first().and_then(|group| {
            self.groups
                .as_ref()
                .and_then(|sets| sets.get(group))
                .and_then(Option::as_ref)
        });

        [host_set, group_set, self.all.as_ref()]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Builder turning feature variables into a desired-state fragment
pub type BuildFn = dyn Fn(&Value) -> Result<DesiredState> + Send + Sync;

/// Registry of desired-state feature builders
///
/// Features whose name starts with `show ` are taken literally as a command
/// with its expected structure and need no builder.
pub struct FeatureRegistry {
    builders: BTreeMap<String, Box<BuildFn>>,
}

impl FeatureRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// Registry with the built-in `ospf`, `acl` and `port_channel` builders
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("ospf", build_ospf);
        registry.register("acl", build_acl);
        registry.register("port_channel", build_port_channel);
        registry
    }

    pub fn register<F>(&mut self, feature: &str, build: F)
    where
        F: Fn(&Value) -> Result<DesiredState> + Send + Sync + 'static,
    {
        self.builders.insert(feature.to_string(), Box::new(build));
    }

    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }

    /// Render one feature into its desired-state fragment
    pub fn render(&self, feature: &str, vars: &Value) -> Result<DesiredState> {
        if let Some(build) = self.builders.get(feature) {
            return build(vars);
        }
        if feature.starts_with("show ") {
            let mut fragment = DesiredState::new();
            fragment.insert(feature.to_string(), vars.clone());
            return Ok(fragment);
        }
        Err(Error::UnknownFeature(feature.to_string()))
    }

    /// Build the merged desired state for one device
    ///
    /// An empty result means the document has nothing for this device.
    pub fn build(
        &self,
        document: &DesiredDocument,
        host: &str,
        groups: &[String],
    ) -> Result<DesiredState> {
        let mut desired = DesiredState::new();
        for section in document.sections_for(host, groups) {
            for (feature, vars) in section {
                let fragment = self.render(feature, vars)?;
                log::debug!("{host}: feature '{feature}' -> {} command(s)", fragment.len());
                desired.extend(fragment);
            }
        }
        Ok(desired)
    }
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// Built-in builders
// ============================================================================

fn strict_level() -> StateMap {
    let mut level = StateMap::new();
    level.insert(MODE_KEY.to_string(), json!(STRICT_MODE));
    level
}

fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `{nbrs: [rid, ..]}` -> strict `show ip ospf neighbor`, every neighbor FULL
fn build_ospf(vars: &Value) -> Result<DesiredState> {
    let nbrs = vars
        .get("nbrs")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::feature_vars("ospf", "'nbrs' must be a list of router IDs"))?;

    let mut neighbors = strict_level();
    for nbr in nbrs {
        let rid = scalar_key(nbr)
            .ok_or_else(|| Error::feature_vars("ospf", format!("invalid router ID {nbr}")))?;
        neighbors.insert(rid, json!({ "state": "FULL" }));
    }

    let mut desired = DesiredState::new();
    desired.insert("show ip ospf neighbor".to_string(), Value::Object(neighbors));
    Ok(desired)
}

/// `[{name, ace}]` -> strict `show ip access-lists <name>` per ACL
fn build_acl(vars: &Value) -> Result<DesiredState> {
    let acls = vars
        .as_array()
        .ok_or_else(|| Error::feature_vars("acl", "expected a list of ACLs"))?;

    let mut desired = DesiredState::new();
    for acl in acls {
        let name = acl
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::feature_vars("acl", "every ACL needs a string 'name'"))?;
        let entries = acl.get("ace").and_then(Value::as_array).ok_or_else(|| {
            Error::feature_vars("acl", format!("ACL '{name}' needs an 'ace' list"))
        })?;

        let mut level = strict_level();
        let mut seq = 10;
        for entry in entries {
            let (action, addr) = entry
                .as_object()
                .and_then(|map| map.iter().next())
                .ok_or_else(|| {
                    Error::feature_vars("acl", format!("ACL '{name}' has a malformed entry"))
                })?;
            if action == "remark" {
                continue;
            }
            if action != "permit" && action != "deny" {
                return Err(Error::feature_vars(
                    "acl",
                    format!("ACL '{name}' has unknown action '{action}'"),
                ));
            }
            let src = canonical_address(addr).ok_or_else(|| {
                Error::feature_vars("acl", format!("ACL '{name}' has invalid address {addr}"))
            })?;
            level.insert(
                seq.to_string(),
                json!({ "action": action, "protocol": "ip", "src": src, "dst": "any" }),
            );
            seq += 10;
        }
        desired.insert(format!("show ip access-lists {name}"), Value::Object(level));
    }
    Ok(desired)
}

/// `any`, `A.B.C.D` or `A.B.C.D/N` in the canonical form the formatter emits
fn canonical_address(value: &Value) -> Option<String> {
    let text = value.as_str()?.trim();
    if text == "any" {
        return Some(text.to_string());
    }
    if text.contains('/') {
        return text.parse::<Ipv4Net>().ok().map(|net| net.to_string());
    }
    text.parse::<Ipv4Addr>().ok().map(|addr| format!("{addr}/32"))
}

/// `{po: {mode, members: [intf, ..]}}` -> `show etherchannel summary`
///
/// Every port-channel is expected in use with all members bundled.
fn build_port_channel(vars: &Value) -> Result<DesiredState> {
    let channels = vars.as_object().ok_or_else(|| {
        Error::feature_vars("port_channel", "expected a mapping of port-channels")
    })?;

    let mut summary = StateMap::new();
    for (po, settings) in channels {
        let mode = settings.get("mode").and_then(Value::as_str).unwrap_or("on");
        let members = settings
            .get("members")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Error::feature_vars("port_channel", format!("'{po}' needs a 'members' list"))
            })?;

        let mut member_level = strict_level();
        for member in members {
            let intf = scalar_key(member).ok_or_else(|| {
                Error::feature_vars("port_channel", format!("'{po}' has invalid member {member}"))
            })?;
            member_level.insert(intf, json!({ "mbr_status": "P" }));
        }

        summary.insert(
            po.clone(),
            json!({
                "status": "U",
                "protocol": channel_protocol(mode),
                "members": Value::Object(member_level),
            }),
        );
    }

    let mut desired = DesiredState::new();
    desired.insert("show etherchannel summary".to_string(), Value::Object(summary));
    Ok(desired)
}

/// Protocol column of `show etherchannel summary` for a channel-group mode
fn channel_protocol(mode: &str) -> String {
    match mode.to_ascii_lowercase().as_str() {
        "active" | "passive" | "lacp" => "LACP".to_string(),
        "desirable" | "auto" | "pagp" => "PAgP".to_string(),
        "on" => "-".to_string(),
        _ => mode.to_string(),
    }
}
