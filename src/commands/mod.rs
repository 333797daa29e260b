//! Subcommand implementations

pub mod acl;
pub mod inventory;
pub mod validate;

use crate::Context;
use crate::inventory::{Host, HostFilter, Inventory};
use crate::ui;
use anyhow::{Result, bail};

/// Load the inventory and apply the CLI filters
pub fn select_hosts(ctx: &Context, filter: &HostFilter) -> Result<Vec<Host>> {
    let inventory = Inventory::load(&ctx.settings.hosts_file(), &ctx.settings.groups_file())?;
    let hosts = inventory.filter(filter);
    log::info!(
        "{} of {} inventory hosts selected",
        hosts.len(),
        inventory.len()
    );
    if hosts.is_empty() {
        let described = filter.describe();
        if described.is_empty() {
            bail!("Inventory is empty");
        }
        bail!("No hosts match the filters: {}", described.join(", "));
    }
    if !ctx.quiet {
        ui::dim(&format!("{} host(s) selected", hosts.len()));
    }
    Ok(hosts)
}
