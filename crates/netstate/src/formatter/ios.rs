//! IOS / IOS-XE formatters
//!
//! Parse raw CLI text into the canonical shapes:
//!
//! - `show ip access-lists`: `seq -> {action, protocol, src, dst, dst_port | icmp_type}`
//! - `show ip ospf neighbor`: `neighbor id -> {state}`
//! - `show etherchannel summary`: `po -> {status, protocol, members: {intf -> {mbr_status}}}`

use super::FormatterRegistry;
use crate::error::Result;
use crate::types::StateMap;
use ipnet::Ipv4Net;
use serde_json::{Value, json};
use std::net::Ipv4Addr;

/// Platform tags handled by this module
pub const PLATFORMS: &[&str] = &["ios", "iosxe"];

const PORT_OPERATORS: &[&str] = &["eq", "neq", "lt", "gt"];

pub(crate) fn register(registry: &mut FormatterRegistry) -> Result<()> {
    registry.register(PLATFORMS, r"^show ip access-lists\b", format_access_lists)?;
    registry.register(PLATFORMS, r"^show ip ospf neighbor\b", format_ospf_neighbors)?;
    registry.register(PLATFORMS, r"^show etherchannel summary\b", format_etherchannel)?;
    Ok(())
}

// ============================================================================
// Access lists
// ============================================================================

/// Format `show ip access-lists [name]` output
///
/// Hit counters are dropped. Entries are keyed by sequence number, so the
/// command should name a single list.
pub fn format_access_lists(output: &str) -> StateMap {
    let mut state = StateMap::new();

    for line in output.lines() {
        let line = strip_hit_counter(line).replace(", wildcard bits", "");
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((seq, rest)) = tokens.split_first() else {
            continue;
        };
        if !seq.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if let Some(ace) = parse_ace(rest) {
            state.insert((*seq).to_string(), Value::Object(ace));
        }
    }

    state
}

fn strip_hit_counter(line: &str) -> &str {
    match line.rfind(" (") {
        Some(idx) if line.trim_end().ends_with("matches)") || line.trim_end().ends_with("match)") => {
            &line[..idx]
        }
        _ => line,
    }
}

fn parse_ace(tokens: &[&str]) -> Option<StateMap> {
    let action = *tokens.first()?;
    if action != "permit" && action != "deny" {
        return None;
    }

    let mut ace = StateMap::new();
    ace.insert("action".to_string(), json!(action));

    let mut pos = 1;
    let extended = tokens.get(pos).is_some_and(|t| is_protocol(t));
    if !extended {
        // Standard list: source only
        let (src, _) = parse_address(tokens, pos)?;
        ace.insert("src".to_string(), json!(src));
        return Some(ace);
    }

    let protocol = tokens[pos];
    ace.insert("protocol".to_string(), json!(protocol));
    pos += 1;

    let (src, next) = parse_address(tokens, pos)?;
    ace.insert("src".to_string(), json!(src));
    pos = next;
    if let Some((port, next)) = parse_port(tokens, pos) {
        ace.insert("src_port".to_string(), json!(port));
        pos = next;
    }

    let (dst, next) = parse_address(tokens, pos)?;
    ace.insert("dst".to_string(), json!(dst));
    pos = next;

    if let Some((port, _)) = parse_port(tokens, pos) {
        ace.insert("dst_port".to_string(), json!(port));
    } else if protocol == "icmp" {
        if let Some(icmp_type) = tokens.get(pos).filter(|t| !is_trailing_keyword(t)) {
            ace.insert("icmp_type".to_string(), json!(icmp_type));
        }
    }

    Some(ace)
}

fn is_protocol(token: &str) -> bool {
    matches!(
        token,
        "ip" | "tcp" | "udp" | "icmp" | "esp" | "ahp" | "gre" | "ospf" | "eigrp" | "pim" | "igmp"
    ) || token.chars().all(|c| c.is_ascii_digit())
}

fn is_trailing_keyword(token: &str) -> bool {
    matches!(token, "log" | "log-input" | "established" | "time-range")
}

/// Parse an address starting at `pos`, returning it in CIDR form or `any`
fn parse_address(tokens: &[&str], pos: usize) -> Option<(String, usize)> {
    match *tokens.get(pos)? {
        "any" => Some(("any".to_string(), pos + 1)),
        "host" => {
            let addr: Ipv4Addr = tokens.get(pos + 1)?.parse().ok()?;
            Some((format!("{addr}/32"), pos + 2))
        }
        token => {
            let addr: Ipv4Addr = token.trim_end_matches(',').parse().ok()?;
            match tokens.get(pos + 1).and_then(|t| t.parse::<Ipv4Addr>().ok()) {
                Some(wildcard) => Some((wildcard_to_cidr(addr, wildcard), pos + 2)),
                None => Some((format!("{addr}/32"), pos + 1)),
            }
        }
    }
}

fn parse_port(tokens: &[&str], pos: usize) -> Option<(String, usize)> {
    let operator = *tokens.get(pos)?;
    if PORT_OPERATORS.contains(&operator) {
        let port = tokens.get(pos + 1)?;
        return Some((format!("{operator} {port}"), pos + 2));
    }
    if operator == "range" {
        let low = tokens.get(pos + 1)?;
        let high = tokens.get(pos + 2)?;
        return Some((format!("range {low} {high}"), pos + 3));
    }
    None
}

/// Convert network + wildcard to CIDR, keeping the raw pair if the
/// wildcard is not contiguous
pub fn wildcard_to_cidr(addr: Ipv4Addr, wildcard: Ipv4Addr) -> String {
    let mask = !u32::from(wildcard);
    let prefix = mask.leading_ones();
    if prefix + mask.trailing_zeros() != 32 {
        return format!("{addr} {wildcard}");
    }
    match Ipv4Net::new(addr, prefix as u8) {
        Ok(net) => net.to_string(),
        Err(_) => format!("{addr} {wildcard}"),
    }
}

// ============================================================================
// OSPF
// ============================================================================

/// Format `show ip ospf neighbor` output
pub fn format_ospf_neighbors(output: &str) -> StateMap {
    let mut state = StateMap::new();

    for line in output.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let [neighbor_id, _priority, state_token, ..] = *tokens.as_slice() else {
            continue;
        };
        if neighbor_id.parse::<Ipv4Addr>().is_err() {
            continue;
        }
        let neighbor_state = state_token.split('/').next().unwrap_or(state_token);
        state.insert(
            neighbor_id.to_string(),
            json!({ "state": neighbor_state }),
        );
    }

    state
}

// ============================================================================
// Etherchannel
// ============================================================================

/// Format `show etherchannel summary` output
///
/// Member lists that wrap onto continuation lines are appended to the
/// preceding port-channel.
pub fn format_etherchannel(output: &str) -> StateMap {
    let mut state = StateMap::new();
    let mut current: Option<String> = None;

    for line in output.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        if let Some((po_name, status)) = group_line(&tokens) {
            let (protocol, members_from) = match tokens.get(2) {
                Some(t) if split_flagged(t).is_none() => (*t, 3),
                _ => ("-", 2),
            };
            let members = collect_members(&tokens[members_from.min(tokens.len())..]);
            state.insert(
                po_name.to_string(),
                json!({
                    "status": bundle_state(status),
                    "protocol": protocol,
                    "members": members,
                }),
            );
            current = Some(po_name.to_string());
            continue;
        }

        let continuation = tokens.iter().all(|t| split_flagged(t).is_some());
        if let (true, Some(po_name)) = (continuation, current.as_ref()) {
            let members = state
                .get_mut(po_name)
                .and_then(|po| po.get_mut("members"))
                .and_then(Value::as_object_mut);
            if let Some(members) = members {
                members.extend(collect_members(&tokens));
            }
        } else {
            current = None;
        }
    }

    state
}

fn group_line<'a>(tokens: &[&'a str]) -> Option<(&'a str, &'a str)> {
    let [group, po, ..] = *tokens else {
        return None;
    };
    if !group.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    split_flagged(po)
}

/// Drop the layer flag (`S`/`R`) from port-channel flags: `SU` -> `U`
fn bundle_state(flags: &str) -> &str {
    match flags.strip_prefix(['S', 'R']) {
        Some(rest) if !rest.is_empty() => rest,
        _ => flags,
    }
}

fn collect_members(tokens: &[&str]) -> StateMap {
    tokens
        .iter()
        .filter_map(|t| split_flagged(t))
        .map(|(intf, flag)| (intf.to_string(), json!({ "mbr_status": flag })))
        .collect()
}

/// Split `Gi0/15(P)` into `("Gi0/15", "P")`
fn split_flagged(token: &str) -> Option<(&str, &str)> {
    let inner = token.strip_suffix(')')?;
    let (name, flag) = inner.split_once('(')?;
    if name.is_empty() || flag.is_empty() {
        return None;
    }
    Some((name, flag))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACL_OUTPUT: &str = "\
Extended IP access list TEST_SSH_ACCESS
    10 permit ip 10.17.10.0 0.0.0.255 any
    20 permit ip host 10.10.10.10 any (12 matches)
    30 deny ip any any
";

    const OSPF_OUTPUT: &str = "\
Neighbor ID     Pri   State           Dead Time   Address         Interface
192.168.255.1     1   FULL/BDR        00:00:35    192.168.255.1   Vlan98
2.2.2.2           0   FULL/  -        00:00:31    10.1.1.2        Vlan2
";

    const ETHERCHANNEL_OUTPUT: &str = "\
Flags:  D - down        P - bundled in port-channel
        I - stand-alone s - suspended
        U - in use      f - failed to allocate aggregator

Number of channel-groups in use: 2
Number of aggregators:           2

Group  Port-channel  Protocol    Ports
------+-------------+-----------+-----------------------------------------------
3      Po3(SD)         LACP      Gi0/15(D)   Gi0/16(D)
4      Po4(SU)         -         Gi0/1(P)    Gi0/2(P)    Gi0/3(P)
                                 Gi0/4(P)
";

    #[test]
    fn test_access_list_entries() {
        let state = format_access_lists(ACL_OUTPUT);
        assert_eq!(
            Value::Object(state),
            json!({
                "10": {"action": "permit", "protocol": "ip", "src": "10.17.10.0/24", "dst": "any"},
                "20": {"action": "permit", "protocol": "ip", "src": "10.10.10.10/32", "dst": "any"},
                "30": {"action": "deny", "protocol": "ip", "src": "any", "dst": "any"}
            })
        );
    }

    #[test]
    fn test_access_list_ports_and_icmp() {
        let output = "\
Extended IP access list VTY
    10 permit tcp 10.0.0.0 0.255.255.255 host 10.1.1.1 eq 22 (3 matches)
    20 permit udp any range 1000 2000 any eq snmp
    30 permit icmp any any echo-reply
    40 deny icmp any any log
";
        let state = format_access_lists(output);
        assert_eq!(
            state["10"],
            json!({
                "action": "permit",
                "protocol": "tcp",
                "src": "10.0.0.0/8",
                "dst": "10.1.1.1/32",
                "dst_port": "eq 22"
            })
        );
        assert_eq!(state["20"]["src_port"], json!("range 1000 2000"));
        assert_eq!(state["20"]["dst_port"], json!("eq snmp"));
        assert_eq!(state["30"]["icmp_type"], json!("echo-reply"));
        assert!(state["40"].get("icmp_type").is_none());
    }

    #[test]
    fn test_standard_access_list() {
        let output = "\
Standard IP access list 10
    10 permit 10.1.1.0, wildcard bits 0.0.0.255
    20 permit 10.2.2.2
    30 deny   any
";
        let state = format_access_lists(output);
        assert_eq!(state["10"], json!({"action": "permit", "src": "10.1.1.0/24"}));
        assert_eq!(state["20"]["src"], json!("10.2.2.2/32"));
        assert_eq!(state["30"]["src"], json!("any"));
    }

    #[test]
    fn test_wildcard_to_cidr() {
        let addr: Ipv4Addr = "172.17.10.0".parse().unwrap();
        assert_eq!(
            wildcard_to_cidr(addr, "0.0.0.255".parse().unwrap()),
            "172.17.10.0/24"
        );
        assert_eq!(
            wildcard_to_cidr(addr, "0.0.0.0".parse().unwrap()),
            "172.17.10.0/32"
        );
        assert_eq!(
            wildcard_to_cidr(addr, "0.0.255.0".parse().unwrap()),
            "172.17.10.0 0.0.255.0"
        );
    }

    #[test]
    fn test_ospf_neighbors_strip_substate() {
        let state = format_ospf_neighbors(OSPF_OUTPUT);
        assert_eq!(
            Value::Object(state),
            json!({
                "192.168.255.1": {"state": "FULL"},
                "2.2.2.2": {"state": "FULL"}
            })
        );
    }

    #[test]
    fn test_etherchannel_groups_and_continuations() {
        let state = format_etherchannel(ETHERCHANNEL_OUTPUT);
        assert_eq!(
            state["Po3"],
            json!({
                "status": "D",
                "protocol": "LACP",
                "members": {"Gi0/15": {"mbr_status": "D"}, "Gi0/16": {"mbr_status": "D"}}
            })
        );
        let po4_members = state["Po4"]["members"].as_object().unwrap();
        assert_eq!(po4_members.len(), 4);
        assert_eq!(po4_members["Gi0/4"], json!({"mbr_status": "P"}));
        assert_eq!(state["Po4"]["protocol"], json!("-"));
    }

    #[test]
    fn test_split_flagged() {
        assert_eq!(split_flagged("Po3(SU)"), Some(("Po3", "SU")));
        assert_eq!(split_flagged("Gi0/1(P)"), Some(("Gi0/1", "P")));
        assert_eq!(split_flagged("LACP"), None);
        assert_eq!(split_flagged("()"), None);
        assert_eq!(bundle_state("SU"), "U");
        assert_eq!(bundle_state("RD"), "D");
        assert_eq!(bundle_state("S"), "S");
    }

    #[test]
    fn test_garbage_yields_empty_mapping() {
        assert!(format_access_lists("% Invalid input detected").is_empty());
        assert!(format_ospf_neighbors("% OSPF not enabled").is_empty());
        assert!(format_etherchannel("% Invalid input").is_empty());
    }
}
