//! Per-platform ACL rendering and command sets.
//!
//! | Platform | Desired block | Backup command | Delete command |
//! |---|---|---|---|
//! | IOS/IOS-XE | `ip access-list extended NAME` + wildcard entries | `show run \| sec access-list extended NAME_` | `no ip access-list extended NAME` |
//! | NX-OS | `ip access-list NAME` + numbered prefix entries | `show run \| sec 'ip access-list NAME'` | `no ip access-list NAME` |
//! | ASA | `ssh`/`http` lines from the first ACL's permits | `show run ssh`, `show run http` | none (lines are negated) |

use crate::types::{Acl, ConfigBlock, Encoding, Platform};

/// Default ASA management interface name.
pub const DEFAULT_ASA_INTERFACE: &str = "mgmt";

/// ASA services whose access lines are managed.
pub const ASA_SERVICES: [&str; 2] = ["ssh", "http"];

/// Renders ACLs into platform configuration.
#[derive(Debug, Clone)]
pub struct Renderer {
    asa_interface: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DEFAULT_ASA_INTERFACE)
    }
}

impl Renderer {
    /// Create a renderer using `asa_interface` for ASA access lines.
    pub fn new(asa_interface: impl Into<String>) -> Self {
        Self {
            asa_interface: asa_interface.into(),
        }
    }

    /// Desired configuration blocks for a platform, in backup-command order.
    pub fn render(&self, platform: Platform, acls: &[Acl]) -> Vec<ConfigBlock> {
        match platform {
            Platform::Ios => acls.iter().map(render_ios).collect(),
            Platform::Nxos => acls.iter().map(render_nxos).collect(),
            Platform::Asa => self.render_asa(acls),
        }
    }

    // ASA has one access list per service, built from the first ACL only
    fn render_asa(&self, acls: &[Acl]) -> Vec<ConfigBlock> {
        let sources: Vec<String> = acls
            .first()
            .map(|acl| acl.permitted_sources().map(|a| a.address_mask()).collect())
            .unwrap_or_default();

        ASA_SERVICES
            .iter()
            .map(|service| {
                ConfigBlock::new(
                    sources
                        .iter()
                        .map(|source| format!("{service} {source} {}", self.asa_interface))
                        .collect(),
                )
            })
            .collect()
    }
}

fn render_ios(acl: &Acl) -> ConfigBlock {
    let mut lines = vec![format!("ip access-list extended {}", acl.name)];
    lines.extend(
        acl.entries
            .iter()
            .map(|ace| format!(" {}", ace.render(Encoding::Wildcard))),
    );
    ConfigBlock::new(lines)
}

// NX-OS numbers every entry, remarks included
fn render_nxos(acl: &Acl) -> ConfigBlock {
    let mut lines = vec![format!("ip access-list {}", acl.name)];
    lines.extend(
        acl.entries
            .iter()
            .zip((10..).step_by(10))
            .map(|(ace, seq)| format!("  {seq} {}", ace.render(Encoding::Prefix))),
    );
    ConfigBlock::new(lines)
}

/// Commands whose outputs form the backup blocks.
pub fn show_commands(platform: Platform, acls: &[Acl]) -> Vec<String> {
    match platform {
        // trailing `_` anchors the name in the IOS section filter
        Platform::Ios => acls
            .iter()
            .map(|acl| format!("show run | sec access-list extended {}_", acl.name))
            .collect(),
        Platform::Nxos => acls
            .iter()
            .map(|acl| format!("show run | sec 'ip access-list {}'", acl.name))
            .collect(),
        Platform::Asa => ASA_SERVICES
            .iter()
            .map(|service| format!("show run {service}"))
            .collect(),
    }
}

/// Commands removing the named ACL objects, or `None` when the platform
/// has no ACL objects to delete.
pub fn delete_commands(platform: Platform, acls: &[Acl]) -> Option<Vec<String>> {
    match platform {
        Platform::Ios => Some(
            acls.iter()
                .map(|acl| format!("no ip access-list extended {}", acl.name))
                .collect(),
        ),
        Platform::Nxos => Some(
            acls.iter()
                .map(|acl| format!("no ip access-list {}", acl.name))
                .collect(),
        ),
        Platform::Asa => None,
    }
}

/// Everything the controller needs for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclPlan {
    /// Target platform
    pub platform: Platform,
    /// Desired configuration blocks
    pub desired: Vec<ConfigBlock>,
    /// Backup commands, one per desired block
    pub show: Vec<String>,
    /// Deletion commands for ACL objects
    pub delete: Option<Vec<String>>,
}

impl AclPlan {
    /// Render and derive commands for `platform`.
    pub fn build(renderer: &Renderer, platform: Platform, acls: &[Acl]) -> Self {
        let plan = Self {
            platform,
            desired: renderer.render(platform, acls),
            show: show_commands(platform, acls),
            delete: delete_commands(platform, acls),
        };
        log::debug!(
            "{platform}: {} desired block(s), {} backup command(s)",
            plan.desired.len(),
            plan.show.len()
        );
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ace, Action, Address};

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    fn acls() -> Vec<Acl> {
        vec![
            Acl::new(
                "UTEST_SSH_ACCESS",
                vec![
                    Ace::remark("MGMT Access - VLAN810"),
                    Ace::rule(Action::Permit, addr("172.17.10.0/24")),
                    Ace::remark("Citrix Access"),
                    Ace::rule(Action::Permit, addr("10.10.109.10")),
                    Ace::rule(Action::Deny, Address::Any),
                ],
            ),
            Acl::new(
                "UTEST_SNMP_ACCESS",
                vec![
                    Ace::rule(Action::Deny, addr("10.10.209.11")),
                    Ace::rule(Action::Permit, Address::Any),
                ],
            ),
        ]
    }

    fn texts(blocks: &[ConfigBlock]) -> Vec<String> {
        blocks.iter().map(ConfigBlock::text).collect()
    }

    #[test]
    fn test_render_ios() {
        let blocks = Renderer::default().render(Platform::Ios, &acls());
        assert_eq!(
            texts(&blocks),
            vec![
                "ip access-list extended UTEST_SSH_ACCESS\n remark MGMT Access - VLAN810\n permit ip 172.17.10.0 0.0.0.255 any\n remark Citrix Access\n permit ip host 10.10.109.10 any\n deny ip any any",
                "ip access-list extended UTEST_SNMP_ACCESS\n deny ip host 10.10.209.11 any\n permit ip any any",
            ]
        );
    }

    #[test]
    fn test_render_nxos() {
        let blocks = Renderer::default().render(Platform::Nxos, &acls());
        assert_eq!(
            texts(&blocks),
            vec![
                "ip access-list UTEST_SSH_ACCESS\n  10 remark MGMT Access - VLAN810\n  20 permit ip 172.17.10.0/24 any\n  30 remark Citrix Access\n  40 permit ip 10.10.109.10/32 any\n  50 deny ip any any",
                "ip access-list UTEST_SNMP_ACCESS\n  10 deny ip 10.10.209.11/32 any\n  20 permit ip any any",
            ]
        );
    }

    #[test]
    fn test_render_asa_uses_first_acl_permits() {
        let blocks = Renderer::default().render(Platform::Asa, &acls());
        assert_eq!(
            texts(&blocks),
            vec![
                "ssh 172.17.10.0 255.255.255.0 mgmt\nssh 10.10.109.10 255.255.255.255 mgmt",
                "http 172.17.10.0 255.255.255.0 mgmt\nhttp 10.10.109.10 255.255.255.255 mgmt",
            ]
        );
    }

    #[test]
    fn test_render_asa_custom_interface() {
        let acls = vec![Acl::new("A", vec![Ace::rule(Action::Permit, Address::Any)])];
        let blocks = Renderer::new("inside").render(Platform::Asa, &acls);
        assert_eq!(blocks[0].text(), "ssh 0.0.0.0 0.0.0.0 inside");
    }

    #[test]
    fn test_show_and_delete_commands() {
        let acls = acls();
        assert_eq!(
            show_commands(Platform::Ios, &acls),
            vec![
                "show run | sec access-list extended UTEST_SSH_ACCESS_",
                "show run | sec access-list extended UTEST_SNMP_ACCESS_",
            ]
        );
        assert_eq!(
            delete_commands(Platform::Ios, &acls),
            Some(vec![
                "no ip access-list extended UTEST_SSH_ACCESS".to_string(),
                "no ip access-list extended UTEST_SNMP_ACCESS".to_string(),
            ])
        );
        assert_eq!(
            show_commands(Platform::Nxos, &acls)[0],
            "show run | sec 'ip access-list UTEST_SSH_ACCESS'"
        );
        assert_eq!(
            delete_commands(Platform::Nxos, &acls).unwrap()[1],
            "no ip access-list UTEST_SNMP_ACCESS"
        );
        assert_eq!(
            show_commands(Platform::Asa, &acls),
            vec!["show run ssh", "show run http"]
        );
        assert_eq!(delete_commands(Platform::Asa, &acls), None);
    }

    #[test]
    fn test_plan_pairs_show_with_desired() {
        let renderer = Renderer::default();
        for platform in Platform::ALL {
            let plan = AclPlan::build(&renderer, platform, &acls());
            assert_eq!(plan.desired.len(), plan.show.len(), "{platform}");
        }
    }
}
