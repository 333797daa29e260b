//! Backup, diff, apply, verify and commit-or-rollback for one device.
//!
//! ```text
//! BACKUP -> DIFF -> DRY_RUN
//!                -> (no differences) NO_CHANGES
//!                -> APPLY -> VERIFY -> COMMIT
//!                                   -> ROLLBACK
//! ```
//!
//! Nothing in here retries. A device either ends committed with the desired
//! configuration, or rolled back to its backup, or reported as a failed
//! rollback that needs manual attention.

use crate::diff::{self, AclDiff};
use crate::error::Result;
use crate::render::{ASA_SERVICES, AclPlan};
use crate::types::{ConfigBlock, Platform};
use netstate::Transport;
use std::fmt;

/// Port probed after applying, unless overridden.
pub const DEFAULT_PROBE_PORT: u16 = 22;

/// Everything known about one device before reconciling it.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    /// Inventory name, used in logs
    pub name: String,
    /// Address handed to the transport
    pub hostname: String,
    /// Platform family
    pub platform: Platform,
    /// Backup commands, one per desired block
    pub show_commands: Vec<String>,
    /// Deletion commands for the ACL objects, `None` on ASA
    pub delete_commands: Option<Vec<String>>,
    /// Desired configuration blocks
    pub desired: Vec<ConfigBlock>,
}

impl DeviceContext {
    /// Context for `name` at `hostname` from a rendered plan.
    pub fn new(name: impl Into<String>, hostname: impl Into<String>, plan: &AclPlan) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
            platform: plan.platform,
            show_commands: plan.show.clone(),
            delete_commands: plan.delete.clone(),
            desired: plan.desired.clone(),
        }
    }
}

/// Knobs for one reconciliation.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    /// Stop after the diff
    pub dry_run: bool,
    /// Port probed to verify the device is still reachable
    pub probe_port: u16,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            probe_port: DEFAULT_PROBE_PORT,
        }
    }
}

/// Controller state, logged as the device moves through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading current configuration
    Backup,
    /// Comparing backup with desired
    Diff,
    /// Pushing the replacement
    Apply,
    /// Probing reachability
    Verify,
    /// Keeping the change
    Commit,
    /// Restoring the backup
    Rollback,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Backup => "BACKUP",
            Self::Diff => "DIFF",
            Self::Apply => "APPLY",
            Self::Verify => "VERIFY",
            Self::Commit => "COMMIT",
            Self::Rollback => "ROLLBACK",
        };
        f.write_str(s)
    }
}

/// Why a rollback was triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackCause {
    /// The probe failed after the change was applied
    Unreachable {
        /// Probed port
        port: u16,
    },
    /// The apply push itself returned an error
    ApplyFailed(String),
}

impl fmt::Display for RollbackCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable { port } => write!(f, "device unreachable on port {port}"),
            Self::ApplyFailed(message) => write!(f, "apply failed: {message}"),
        }
    }
}

/// Final state of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Dry run: the diff was computed and nothing was pushed
    DryRun {
        /// Computed differences (may be the no-differences sentinel)
        diff: AclDiff,
    },
    /// Device already matches the desired configuration
    NoChanges,
    /// Change applied and the device stayed reachable
    Committed {
        /// Applied differences
        diff: AclDiff,
        /// Commands pushed
        applied: Vec<String>,
    },
    /// Change was undone
    RolledBack {
        /// Attempted differences
        diff: AclDiff,
        /// Commands pushed by the apply
        applied: Vec<String>,
        /// Commands pushed to restore the backup
        rollback: Vec<String>,
        /// What triggered the rollback
        cause: RollbackCause,
    },
    /// Change was bad and restoring the backup also failed
    RollbackFailed {
        /// Attempted differences
        diff: AclDiff,
        /// Commands pushed by the apply
        applied: Vec<String>,
        /// Commands that failed to restore the backup
        rollback: Vec<String>,
        /// What triggered the rollback
        cause: RollbackCause,
        /// Rollback push error
        error: String,
    },
}

impl Outcome {
    /// Whether this outcome should fail the run.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::RolledBack { .. } | Self::RollbackFailed { .. })
    }

    /// Whether a change was kept on the device.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    /// Differences computed for this run, if any were.
    pub fn diff(&self) -> Option<&AclDiff> {
        match self {
            Self::NoChanges => None,
            Self::DryRun { diff }
            | Self::Committed { diff, .. }
            | Self::RolledBack { diff, .. }
            | Self::RollbackFailed { diff, .. } => Some(diff),
        }
    }

    /// One-line result text.
    pub fn message(&self) -> String {
        match self {
            Self::DryRun { diff } if diff.has_changes() => "Dry run, ACL changes pending".to_string(),
            Self::DryRun { .. } => diff::NO_DIFFERENCES.to_string(),
            Self::NoChanges => "No changes needed, ACLs already match".to_string(),
            Self::Committed { .. } => "ACLs successfully updated".to_string(),
            Self::RolledBack {
                cause: RollbackCause::Unreachable { .. },
                ..
            } => "ACL update rolled back as it broke SSH access".to_string(),
            Self::RolledBack { cause, .. } => format!("ACL update rolled back ({cause})"),
            Self::RollbackFailed { cause, error, .. } => {
                format!("ACL update failed ({cause}) and rollback failed: {error}")
            }
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Keep only ASA `ssh`/`http` access lines: `<service> <addr> <mask> <iface>`.
///
/// Drops `ssh timeout 30`, `http server enable` and other service settings.
pub fn filter_asa_access(text: &str) -> ConfigBlock {
    let lines = text
        .lines()
        .filter(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                [service, addr, mask, _iface] => {
                    ASA_SERVICES.contains(service)
                        && addr.parse::<std::net::Ipv4Addr>().is_ok()
                        && mask.parse::<std::net::Ipv4Addr>().is_ok()
                }
                _ => false,
            }
        })
        .map(|line| line.trim().to_string())
        .collect();
    ConfigBlock::new(lines)
}

/// Read the current configuration, one block per show command.
pub fn backup(transport: &dyn Transport, ctx: &DeviceContext) -> Result<Vec<ConfigBlock>> {
    log::debug!("{}: {}", ctx.name, Stage::Backup);
    let outputs = transport.send_commands(&ctx.hostname, &ctx.show_commands)?;
    Ok(outputs
        .iter()
        .map(|output| match ctx.platform {
            Platform::Asa => filter_asa_access(output),
            _ => ConfigBlock::from_text(output),
        })
        .collect())
}

/// Commands replacing `current` with `target`.
///
/// Named ACL objects are deleted and re-created. ASA lines have no object
/// to delete, so each current line is negated instead.
pub fn replace_commands(
    ctx: &DeviceContext,
    current: &[ConfigBlock],
    target: &[ConfigBlock],
) -> Vec<String> {
    let mut commands: Vec<String> = match &ctx.delete_commands {
        Some(deletes) => deletes.clone(),
        None => current
            .iter()
            .flat_map(ConfigBlock::lines)
            .map(|line| format!("no {}", line.trim()))
            .collect(),
    };
    commands.extend(target.iter().flat_map(ConfigBlock::lines).cloned());
    commands
}

/// Reconcile one device.
///
/// Errors before anything is pushed (backup failures, pairing mismatches)
/// are returned as `Err`. Once the apply has been attempted the result is
/// always an [`Outcome`].
pub fn reconcile(
    transport: &dyn Transport,
    ctx: &DeviceContext,
    opts: &ReconcileOptions,
) -> Result<Outcome> {
    let backup = backup(transport, ctx)?;

    log::debug!("{}: {}", ctx.name, Stage::Diff);
    let diff = diff::diff(ctx.platform, &backup, &ctx.desired)?;

    if opts.dry_run {
        return Ok(Outcome::DryRun { diff });
    }
    if !diff.has_changes() {
        log::info!("{}: no changes needed", ctx.name);
        return Ok(Outcome::NoChanges);
    }

    log::debug!("{}: {}", ctx.name, Stage::Apply);
    let applied = replace_commands(ctx, &backup, &ctx.desired);
    let apply_error = transport
        .send_config(&ctx.hostname, &applied)
        .err()
        .map(|e| e.to_string());

    log::debug!("{}: {} port {}", ctx.name, Stage::Verify, opts.probe_port);
    let reachable = transport.probe(&ctx.hostname, opts.probe_port);

    let cause = match (apply_error, reachable) {
        (None, true) => {
            log::info!("{}: {}", ctx.name, Stage::Commit);
            return Ok(Outcome::Committed { diff, applied });
        }
        (Some(message), _) => RollbackCause::ApplyFailed(message),
        (None, false) => RollbackCause::Unreachable {
            port: opts.probe_port,
        },
    };

    log::warn!("{}: {} ({cause})", ctx.name, Stage::Rollback);
    let rollback = replace_commands(ctx, &ctx.desired, &backup);
    match transport.send_config(&ctx.hostname, &rollback) {
        Ok(_) => Ok(Outcome::RolledBack {
            diff,
            applied,
            rollback,
            cause,
        }),
        Err(e) => {
            log::error!("{}: rollback failed: {e}", ctx.name);
            Ok(Outcome::RollbackFailed {
                diff,
                applied,
                rollback,
                cause,
                error: e.to_string(),
            })
        }
    }
}
