//! Line diff between backed-up and desired ACL blocks.
//!
//! Blocks are paired by position. Both sides are normalized the same way
//! before diffing, so device output indentation and spacing never show up
//! as changes.

use crate::error::{Error, Result};
use crate::types::{ConfigBlock, Platform};
use similar::{Algorithm, ChangeTag, TextDiff};
use std::fmt;

/// Text shown when no pair has changes.
pub const NO_DIFFERENCES: &str = "No differences between configurations";

/// Normalize one configuration line.
///
/// Leading indentation collapses to a single space, interior runs of
/// whitespace collapse to one space and trailing whitespace is removed.
/// Blank lines yield `None`.
pub fn normalize_line(line: &str) -> Option<String> {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    if line.starts_with(char::is_whitespace) {
        Some(format!(" {collapsed}"))
    } else {
        Some(collapsed)
    }
}

/// Normalized, non-blank lines of a block.
pub fn normalize(block: &ConfigBlock) -> Vec<String> {
    block
        .lines()
        .iter()
        .filter_map(|line| normalize_line(line))
        .collect()
}

/// Differences for one backup/desired pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffBlock {
    /// ACL name line, empty for platforms without ACL objects
    pub header: String,
    /// Lines only on the device
    pub removed: Vec<String>,
    /// Lines only in the desired block
    pub added: Vec<String>,
}

impl DiffBlock {
    /// Whether the pair had no differences.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

impl fmt::Display for DiffBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::with_capacity(1 + self.removed.len() + self.added.len());
        if !self.header.is_empty() {
            lines.push(self.header.clone());
        }
        lines.extend(self.removed.iter().map(|l| format!("- {l}")));
        lines.extend(self.added.iter().map(|l| format!("+ {l}")));
        f.write_str(&lines.join("\n"))
    }
}

/// Result of diffing all pairs for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclDiff {
    /// Every pair matched
    NoDifferences,
    /// Non-empty blocks, in pair order
    Changes(Vec<DiffBlock>),
}

impl AclDiff {
    /// Whether anything needs to change.
    pub fn has_changes(&self) -> bool {
        matches!(self, Self::Changes(_))
    }

    /// Changed blocks (empty when there are no differences).
    pub fn blocks(&self) -> &[DiffBlock] {
        match self {
            Self::NoDifferences => &[],
            Self::Changes(blocks) => blocks,
        }
    }
}

impl fmt::Display for AclDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDifferences => f.write_str(NO_DIFFERENCES),
            Self::Changes(blocks) => {
                let rendered: Vec<String> = blocks.iter().map(ToString::to_string).collect();
                f.write_str(&rendered.join("\n\n"))
            }
        }
    }
}

/// Diff one pair using Myers' algorithm.
///
/// `header` is shown above the changes. If the header line itself would be
/// added (the ACL does not exist on the device) that addition is dropped.
pub fn diff_pair(header: &str, backup: &ConfigBlock, desired: &ConfigBlock) -> DiffBlock {
    let old = normalize(backup);
    let new = normalize(desired);
    let old_refs: Vec<&str> = old.iter().map(String::as_str).collect();
    let new_refs: Vec<&str> = new.iter().map(String::as_str).collect();

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_slices(&old_refs, &new_refs);

    let mut removed = Vec::new();
    let mut added = Vec::new();
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Delete => removed.push(change.value().to_string()),
            ChangeTag::Insert => added.push(change.value().to_string()),
            ChangeTag::Equal => {}
        }
    }

    if let Some(header_line) = normalize_line(header) {
        if let Some(pos) = added.iter().position(|line| *line == header_line) {
            added.remove(pos);
        }
    }

    DiffBlock {
        header: header.trim_end().to_string(),
        removed,
        added,
    }
}

/// Diff backup blocks against desired blocks, paired by position.
pub fn diff(platform: Platform, backup: &[ConfigBlock], desired: &[ConfigBlock]) -> Result<AclDiff> {
    if backup.len() != desired.len() {
        return Err(Error::PairingMismatch {
            backup: backup.len(),
            desired: desired.len(),
        });
    }

    let blocks: Vec<DiffBlock> = backup
        .iter()
        .zip(desired)
        .map(|(old, new)| {
            let header = if platform.has_acl_objects() {
                new.header().unwrap_or_default()
            } else {
                ""
            };
            diff_pair(header, old, new)
        })
        .filter(|block| !block.is_empty())
        .collect();

    log::debug!("{platform}: {} of {} block(s) changed", blocks.len(), desired.len());

    if blocks.is_empty() {
        Ok(AclDiff::NoDifferences)
    } else {
        Ok(AclDiff::Changes(blocks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SSH_ACL: &str = "ip access-list extended UTEST_SSH_ACCESS\n remark MGMT Access - VLAN810\n permit ip 172.17.10.0 0.0.0.255 any\n remark Citrix Access\n permit ip host 10.10.109.10 any\n deny ip any any";
    const SNMP_ACL: &str = "ip access-list extended UTEST_SNMP_ACCESS\n deny ip host 10.10.209.11 any\n permit ip any any";

    fn blocks(texts: &[&str]) -> Vec<ConfigBlock> {
        texts.iter().map(|t| ConfigBlock::from_text(t)).collect()
    }

    #[test]
    fn test_normalize_line() {
        assert_eq!(
            normalize_line("   permit ip   any    any  "),
            Some(" permit ip any any".to_string())
        );
        assert_eq!(
            normalize_line("ip access-list extended X"),
            Some("ip access-list extended X".to_string())
        );
        assert_eq!(normalize_line("  \t "), None);
    }

    #[test]
    fn test_identical_pairs_yield_no_differences() {
        let backup = blocks(&[SSH_ACL, SNMP_ACL]);
        let result = diff(Platform::Ios, &backup, &backup).unwrap();
        assert_eq!(result, AclDiff::NoDifferences);
        assert_eq!(result.to_string(), NO_DIFFERENCES);
    }

    #[test]
    fn test_device_spacing_is_not_a_difference() {
        let device = "\nip access-list extended UTEST_SNMP_ACCESS\n    deny   ip host 10.10.209.11 any\n    permit ip any any\n";
        let result = diff(Platform::Ios, &blocks(&[device]), &blocks(&[SNMP_ACL])).unwrap();
        assert!(!result.has_changes());
    }

    #[test]
    fn test_one_ace_difference() {
        let desired = "ip access-list extended UTEST_SNMP_ACCESS\n deny ip host 10.10.209.11 any\n deny tcp any any";
        let result = diff(Platform::Ios, &blocks(&[SNMP_ACL]), &blocks(&[desired])).unwrap();

        let changed = result.blocks();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].header, "ip access-list extended UTEST_SNMP_ACCESS");
        assert_eq!(changed[0].removed, vec![" permit ip any any"]);
        assert_eq!(changed[0].added, vec![" deny tcp any any"]);
        assert_eq!(
            result.to_string(),
            "ip access-list extended UTEST_SNMP_ACCESS\n-  permit ip any any\n+  deny tcp any any"
        );
    }

    #[test]
    fn test_removed_lines_precede_added_lines() {
        let desired = "ip access-list extended UTEST_SSH_ACCESS\n remark MGMT Access - VLAN810\n deny ip host 1.1.1.1 any\n permit ip 172.17.10.0 0.0.0.255 any\n remark Citrix Access\n permit ip host 10.10.109.10 any";
        let result = diff(Platform::Ios, &blocks(&[SSH_ACL]), &blocks(&[desired])).unwrap();

        let block = &result.blocks()[0];
        assert_eq!(block.removed, vec![" deny ip any any"]);
        assert_eq!(block.added, vec![" deny ip host 1.1.1.1 any"]);
    }

    #[test]
    fn test_unchanged_pairs_are_excluded() {
        let desired_snmp = "ip access-list extended UTEST_SNMP_ACCESS\n permit ip any any";
        let result = diff(
            Platform::Ios,
            &blocks(&[SSH_ACL, SNMP_ACL]),
            &blocks(&[SSH_ACL, desired_snmp]),
        )
        .unwrap();

        assert_eq!(result.blocks().len(), 1);
        assert_eq!(
            result.blocks()[0].header,
            "ip access-list extended UTEST_SNMP_ACCESS"
        );
    }

    #[test]
    fn test_blocks_separated_by_blank_line() {
        let desired_ssh = "ip access-list extended UTEST_SSH_ACCESS\n deny ip any any";
        let desired_snmp = "ip access-list extended UTEST_SNMP_ACCESS\n permit ip any any";
        let result = diff(
            Platform::Ios,
            &blocks(&[SSH_ACL, SNMP_ACL]),
            &blocks(&[desired_ssh, desired_snmp]),
        )
        .unwrap();

        let text = result.to_string();
        assert_eq!(text.matches("\n\n").count(), 1);
        assert!(text.starts_with("ip access-list extended UTEST_SSH_ACCESS\n- "));
    }

    #[test]
    fn test_missing_acl_suppresses_header_addition() {
        let result = diff(Platform::Ios, &blocks(&[""]), &blocks(&[SNMP_ACL])).unwrap();

        let block = &result.blocks()[0];
        assert_eq!(block.header, "ip access-list extended UTEST_SNMP_ACCESS");
        assert!(block.removed.is_empty());
        assert_eq!(
            block.added,
            vec![" deny ip host 10.10.209.11 any", " permit ip any any"]
        );
    }

    #[test]
    fn test_asa_blocks_have_empty_header() {
        let backup = blocks(&[
            "ssh 10.17.10.0 255.255.255.0 mgmt",
            "http 10.17.10.0 255.255.255.0 mgmt",
        ]);
        let desired = blocks(&[
            "ssh 10.17.10.0 255.255.255.0 mgmt\nssh 10.1.1.1 255.255.255.255 mgmt",
            "http 10.17.10.0 255.255.255.0 mgmt",
        ]);
        let result = diff(Platform::Asa, &backup, &desired).unwrap();

        let block = &result.blocks()[0];
        assert_eq!(block.header, "");
        assert_eq!(block.added, vec!["ssh 10.1.1.1 255.255.255.255 mgmt"]);
        assert_eq!(result.to_string(), "+ ssh 10.1.1.1 255.255.255.255 mgmt");
    }

    #[test]
    fn test_pairing_mismatch() {
        let err = diff(Platform::Ios, &blocks(&[SSH_ACL]), &blocks(&[SSH_ACL, SNMP_ACL]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PairingMismatch {
                backup: 1,
                desired: 2
            }
        ));
    }
}
