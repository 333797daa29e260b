//! Parallel per-device execution with progress and a final summary

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use rayon::prelude::*;
use std::sync::{Arc, Mutex};

use crate::inventory::Host;
use crate::progress;

/// Options for running a device batch
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Number of devices handled at once
    pub jobs: usize,
    /// Hide the progress bar
    pub quiet: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            jobs: 4,
            quiet: false,
        }
    }
}

/// Something that can say whether a device run failed
pub trait DeviceOutcome {
    fn failed(&self) -> bool;
}

/// Summary of a device batch
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl ExecuteSummary {
    pub fn from_results<R: DeviceOutcome>(results: &[(String, R)]) -> Self {
        let failed = results.iter().filter(|(_, r)| r.failed()).count();
        Self {
            succeeded: results.len() - failed,
            failed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Run `task` for every host on a bounded pool
///
/// Results come back in host order, paired with the host name.
pub fn execute<R, F>(
    hosts: &[Host],
    label: &str,
    opts: &ExecuteOptions,
    task: F,
) -> Result<Vec<(String, R)>>
where
    R: DeviceOutcome + Send,
    F: Fn(&Host) -> R + Sync,
{
    let pb = if opts.quiet {
        progress::hidden()
    } else {
        progress::device_bar(hosts.len() as u64, label)
    };
    let results: Arc<Mutex<Vec<(usize, String, R)>>> = Arc::new(Mutex::new(Vec::new()));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .context("Failed to create device thread pool")?;

    pool.install(|| {
        hosts.par_iter().enumerate().for_each(|(index, host)| {
            pb.set_message(host.name.clone());
            let result = task(host);
            let symbol = if result.failed() { "✗" } else { "✓" };
            pb.set_message(format!("{symbol} {}", host.name));
            pb.inc(1);
            push_result(&results, (index, host.name.clone(), result));
        });
    });

    pb.finish_and_clear();

    let mut collected = into_results(results)?;
    collected.sort_by_key(|(index, _, _)| *index);
    Ok(collected
        .into_iter()
        .map(|(_, name, result)| (name, result))
        .collect())
}

fn push_result<T>(results: &Arc<Mutex<Vec<T>>>, result: T) {
    match results.lock() {
        Ok(mut locked) => locked.push(result),
        Err(poisoned) => poisoned.into_inner().push(result),
    }
}

fn into_results<T>(results: Arc<Mutex<Vec<T>>>) -> Result<Vec<T>> {
    let mutex = Arc::try_unwrap(results)
        .map_err(|_| anyhow::anyhow!("Failed to collect device results: shared result state"))?;

    match mutex.into_inner() {
        Ok(collected) => Ok(collected),
        Err(poisoned) => Ok(poisoned.into_inner()),
    }
}

/// Confirm with user
pub fn confirm_proceed(prompt: &str) -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    Ok(confirmed)
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary, action: &str) {
    println!();
    if summary.is_success() {
        println!("  {} {action} finished on all devices", "✓".green().bold());
    } else {
        println!("  {} {action} finished with failures", "⚠".yellow().bold());
    }

    if summary.succeeded > 0 {
        println!("    • {} devices succeeded", summary.succeeded);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "devices".red());
    }
}
