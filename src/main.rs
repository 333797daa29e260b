mod acl_vars;
mod cli;
mod commands;
mod engine;
mod inventory;
mod paths;
mod progress;
mod runner;
mod settings;
mod transport;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use settings::Settings;
use std::io;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
    pub settings: Settings,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "netrecon", &mut io::stdout());
        return Ok(());
    }

    let ctx = Context {
        quiet: cli.quiet,
        settings: Settings::load(cli.config.as_deref())?,
    };

    match cli.command {
        Command::Acl(args) => commands::acl::run(&ctx, args),
        Command::Validate(args) => commands::validate::run(&ctx, args),
        Command::Inventory(args) => commands::inventory::run(&ctx, args),
        Command::Completions { .. } => Ok(()),
    }
}
