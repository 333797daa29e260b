use crate::Context;
use crate::cli::InventoryArgs;
use crate::inventory::{Host, HostFilter};
use crate::ui;
use anyhow::Result;
use colored::Colorize;

pub fn run(ctx: &Context, args: InventoryArgs) -> Result<()> {
    let filter = HostFilter::from(&args.filters);
    let hosts = super::select_hosts(ctx, &filter)?;

    ui::header(&format!("Inventory ({} hosts)", hosts.len()));
    for host in &hosts {
        println!("{}", summary_line(host, args.detail));
        if args.detail {
            for (key, value) in &host.data {
                ui::kv(key, value);
            }
        }
    }
    Ok(())
}

fn summary_line(host: &Host, detail: bool) -> String {
    let platform = host.platform.as_deref().unwrap_or("unknown");
    let mut line = format!(
        "  {} {} {}",
        host.name.green(),
        host.hostname.dimmed(),
        format!("({platform})").cyan()
    );
    if detail && !host.groups.is_empty() {
        line.push_str(&format!(" groups: {}", host.groups.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_summary_line() {
        let host = Host {
            name: "core-sw1".to_string(),
            hostname: "10.10.10.1".to_string(),
            groups: vec!["ios".to_string(), "core".to_string()],
            platform: None,
            data: BTreeMap::new(),
        };
        let short = summary_line(&host, false);
        assert!(short.contains("core-sw1"));
        assert!(short.contains("(unknown)"));
        assert!(!short.contains("groups"));
        assert!(summary_line(&host, true).ends_with(" groups: ios, core"));
    }
}
