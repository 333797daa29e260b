//! Core types for ACL reconciliation.

use crate::error::{Error, Result};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Device platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Cisco IOS and IOS-XE
    #[serde(alias = "iosxe", alias = "ios-xe", alias = "cisco_ios")]
    Ios,
    /// Cisco NX-OS
    #[serde(alias = "cisco_nxos")]
    Nxos,
    /// Cisco ASA
    #[serde(alias = "cisco_asa")]
    Asa,
}

impl Platform {
    /// All supported platforms.
    pub const ALL: [Self; 3] = [Self::Ios, Self::Nxos, Self::Asa];

    /// Canonical platform tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Nxos => "nxos",
            Self::Asa => "asa",
        }
    }

    /// Whether the platform configures named ACL objects.
    ///
    /// ASA management access is a flat list of `ssh`/`http` lines instead.
    pub fn has_acl_objects(&self) -> bool {
        !matches!(self, Self::Asa)
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ios" | "iosxe" | "ios-xe" | "cisco_ios" => Ok(Self::Ios),
            "nxos" | "cisco_nxos" => Ok(Self::Nxos),
            "asa" | "cisco_asa" => Ok(Self::Asa),
            _ => Err(Error::UnknownPlatform(s.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// How an address is written in device configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// `10.1.1.0 0.0.0.255` (IOS)
    Wildcard,
    /// `10.1.1.0 255.255.255.0` (ASA)
    Mask,
    /// `10.1.1.0/24` (NX-OS)
    Prefix,
}

/// Source or destination of an ACE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    /// Matches every address
    Any,
    /// Network or host (`/32`)
    Net(Ipv4Net),
}

impl Address {
    /// Parse `any`, `A.B.C.D` (a host) or `A.B.C.D/N`.
    ///
    /// Host bits are kept as written.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "any" {
            return Ok(Self::Any);
        }
        if s.contains('/') {
            return s
                .parse::<Ipv4Net>()
                .map(Self::Net)
                .map_err(|_| Error::InvalidAddress(s.to_string()));
        }
        s.parse::<Ipv4Addr>()
            .ok()
            .and_then(|addr| Ipv4Net::new(addr, 32).ok())
            .map(Self::Net)
            .ok_or_else(|| Error::InvalidAddress(s.to_string()))
    }

    /// Whether this is a single host.
    pub fn is_host(&self) -> bool {
        matches!(self, Self::Net(net) if net.prefix_len() == 32)
    }

    /// Render in the given encoding.
    ///
    /// Hosts render as `host A.B.C.D` in wildcard and mask encodings.
    pub fn render(&self, encoding: Encoding) -> String {
        match self {
            Self::Any => "any".to_string(),
            Self::Net(net) if self.is_host() && encoding != Encoding::Prefix => {
                format!("host {}", net.addr())
            }
            Self::Net(net) => match encoding {
                Encoding::Wildcard => format!("{} {}", net.addr(), net.hostmask()),
                Encoding::Mask => format!("{} {}", net.addr(), net.netmask()),
                Encoding::Prefix => net.to_string(),
            },
        }
    }

    /// Address and mask pair, with `any` as `0.0.0.0 0.0.0.0`.
    pub fn address_mask(&self) -> String {
        match self {
            Self::Any => "0.0.0.0 0.0.0.0".to_string(),
            Self::Net(net) => format!("{} {}", net.addr(), net.netmask()),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Encoding::Prefix))
    }
}

/// Permit or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Allow matching traffic
    Permit,
    /// Drop matching traffic
    Deny,
}

impl Action {
    /// Keyword used in configuration.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Permit => "permit",
            Self::Deny => "deny",
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "permit" => Ok(Self::Permit),
            "deny" => Ok(Self::Deny),
            other => Err(Error::InvalidAction(other.to_string())),
        }
    }
}

/// One access control entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ace {
    /// Free-text comment line
    Remark(String),
    /// Filtering rule
    Rule {
        /// Permit or deny
        action: Action,
        /// Protocol keyword, e.g. `ip` or `tcp`
        protocol: String,
        /// Source address
        source: Address,
        /// Destination address
        destination: Address,
        /// Destination port or ICMP type qualifier, e.g. `eq 22`
        port: Option<String>,
    },
}

impl Ace {
    /// `ip` rule from `source` to any destination.
    pub fn rule(action: Action, source: Address) -> Self {
        Self::Rule {
            action,
            protocol: "ip".to_string(),
            source,
            destination: Address::Any,
            port: None,
        }
    }

    /// Remark entry.
    pub fn remark(text: impl Into<String>) -> Self {
        Self::Remark(text.into())
    }

    /// Entry body (without sequence number) in the given encoding.
    pub fn render(&self, encoding: Encoding) -> String {
        match self {
            Self::Remark(text) => format!("remark {text}"),
            Self::Rule {
                action,
                protocol,
                source,
                destination,
                port,
            } => {
                let mut line = format!(
                    "{} {protocol} {} {}",
                    action.keyword(),
                    source.render(encoding),
                    destination.render(encoding)
                );
                if let Some(port) = port {
                    line.push(' ');
                    line.push_str(port);
                }
                line
            }
        }
    }
}

/// Named, ordered access control list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    /// ACL name
    pub name: String,
    /// Entries in evaluation order
    pub entries: Vec<Ace>,
}

impl Acl {
    /// Create an ACL.
    pub fn new(name: impl Into<String>, entries: Vec<Ace>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Permit rules, in order.
    pub fn permitted_sources(&self) -> impl Iterator<Item = &Address> {
        self.entries.iter().filter_map(|ace| match ace {
            Ace::Rule {
                action: Action::Permit,
                source,
                ..
            } => Some(source),
            _ => None,
        })
    }
}

/// One ACL (or ASA access list) as ordered configuration lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigBlock {
    lines: Vec<String>,
}

impl ConfigBlock {
    /// Build a block from lines.
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Build a block from raw device text, dropping blank lines and
    /// trailing whitespace.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Lines in order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// First line, if any.
    pub fn header(&self) -> Option<&str> {
        self.lines.first().map(String::as_str)
    }

    /// Whether the block has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for ConfigBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}
