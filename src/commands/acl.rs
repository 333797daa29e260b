//! `netrecon acl`: render, diff and (optionally) apply management ACLs

use crate::Context;
use crate::acl_vars;
use crate::cli::AclArgs;
use crate::engine::{self, DeviceOutcome, ExecuteOptions, ExecuteSummary};
use crate::inventory::{Host, HostFilter};
use crate::transport::SshTransport;
use crate::ui;
use aclkit::{Ace, Acl, AclPlan, DeviceContext, Outcome, Platform, ReconcileOptions, Renderer};
use anyhow::{Result, bail};
use netstate::{FeatureRegistry, FormatterRegistry, Transport, ValidationResult, Validator};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Result of one device
enum AclRun {
    Done {
        outcome: Outcome,
        /// Post-change validation, when requested and possible
        validation: Option<std::result::Result<ValidationResult, String>>,
    },
    Error(String),
}

impl DeviceOutcome for AclRun {
    fn failed(&self) -> bool {
        match self {
            Self::Done {
                outcome,
                validation,
            } => {
                outcome.is_failure()
                    || validation
                        .as_ref()
                        .is_some_and(|v| v.as_ref().map_or(true, ValidationResult::failed))
            }
            Self::Error(_) => true,
        }
    }
}

pub fn run(ctx: &Context, args: AclArgs) -> Result<()> {
    let acls = acl_vars::load(&args.filename, ctx.settings.base_dir())?;
    let hosts = super::select_hosts(ctx, &HostFilter::from(&args.filters))?;

    let renderer = Renderer::new(ctx.settings.device.asa_interface.clone());
    let plans = plans_for(&renderer, &hosts, &acls);
    if !ctx.quiet {
        show_plans(&plans);
    }

    let dry_run = !args.apply;
    if !dry_run
        && !args.yes
        && !engine::executor::confirm_proceed(&format!(
            "Apply ACL changes to {} device(s)?",
            hosts.len()
        ))?
    {
        ui::error("Aborted");
        return Ok(());
    }

    let transport = SshTransport::new(&ctx.settings.device, ctx.settings.password());
    transport.preflight()?;
    let formatters = FormatterRegistry::builtin()?;
    let features = FeatureRegistry::builtin();
    let desired_vars = acl_feature_vars(&acls);
    let options = ReconcileOptions {
        dry_run,
        probe_port: ctx.settings.device.probe_port,
    };
    let opts = ExecuteOptions {
        jobs: args.jobs,
        quiet: ctx.quiet,
    };

    let label = if dry_run { "Diffing" } else { "Applying" };
    let results = engine::execute(&hosts, label, &opts, |host| {
        let Some(plan) = host_platform(host).and_then(|p| plans.get(&p)) else {
            return AclRun::Error(format!(
                "unsupported platform '{}'",
                host.platform.as_deref().unwrap_or("none")
            ));
        };
        let device = DeviceContext::new(&host.name, &host.hostname, plan);
        let outcome = match aclkit::reconcile(&transport, &device, &options) {
            Ok(outcome) => outcome,
            Err(e) => return AclRun::Error(e.to_string()),
        };

        let validation = if args.validate && settled(&outcome) {
            validate_acls(&transport, &formatters, &features, &desired_vars, host, plan.platform)
        } else {
            None
        };
        AclRun::Done {
            outcome,
            validation,
        }
    })?;

    for (name, result) in &results {
        print_result(name, result);
    }

    let summary = ExecuteSummary::from_results(&results);
    engine::executor::print_summary(&summary, if dry_run { "Dry run" } else { "ACL update" });
    if !summary.is_success() {
        bail!("{} device(s) failed", summary.failed);
    }
    Ok(())
}

fn host_platform(host: &Host) -> Option<Platform> {
    host.platform.as_deref().and_then(|p| p.parse().ok())
}

/// One plan per platform present among the hosts
fn plans_for(renderer: &Renderer, hosts: &[Host], acls: &[Acl]) -> BTreeMap<Platform, AclPlan> {
    hosts
        .iter()
        .filter_map(host_platform)
        .map(|platform| (platform, AclPlan::build(renderer, platform, acls)))
        .collect()
}

fn show_plans(plans: &BTreeMap<Platform, AclPlan>) {
    for (platform, plan) in plans {
        ui::section(&format!("Desired {platform} configuration"));
        for block in &plan.desired {
            ui::block(&block.text());
        }
    }
}

// post-change validation only makes sense once the device holds the desired ACLs
fn settled(outcome: &Outcome) -> bool {
    matches!(outcome, Outcome::Committed { .. } | Outcome::NoChanges)
}

/// ACLs back in the `acl` feature's input form
fn acl_feature_vars(acls: &[Acl]) -> Value {
    Value::Array(
        acls.iter()
            .map(|acl| {
                let aces: Vec<Value> = acl
                    .entries
                    .iter()
                    .map(|ace| match ace {
                        Ace::Remark(text) => json!({ "remark": text }),
                        Ace::Rule { action, source, .. } => {
                            let mut entry = serde_json::Map::new();
                            entry.insert(action.keyword().to_string(), json!(source.to_string()));
                            Value::Object(entry)
                        }
                    })
                    .collect();
                json!({ "name": acl.name, "ace": aces })
            })
            .collect(),
    )
}

fn validate_acls(
    transport: &dyn Transport,
    formatters: &FormatterRegistry,
    features: &FeatureRegistry,
    vars: &Value,
    host: &Host,
    platform: Platform,
) -> Option<std::result::Result<ValidationResult, String>> {
    if platform != Platform::Ios {
        log::warn!("{}: ACL validation is only available for IOS", host.name);
        return None;
    }
    let validator = Validator::new(transport, formatters);
    let result = features.render("acl", vars).and_then(|desired| {
        validator.validate(&host.name, &host.hostname, platform.tag(), &desired)
    });
    Some(result.map_err(|e| e.to_string()))
}

fn print_result(name: &str, result: &AclRun) {
    match result {
        AclRun::Error(message) => ui::device_result(name, false, message),
        AclRun::Done {
            outcome,
            validation,
        } => {
            ui::device_result(name, !outcome.is_failure(), &outcome.message());
            if let Some(diff) = outcome.diff().filter(|d| d.has_changes()) {
                ui::diff(&diff.to_string());
            }
            match validation {
                Some(Ok(validation)) => {
                    ui::device_result(name, !validation.failed(), "post-change validation");
                    ui::block(&validation.message());
                }
                Some(Err(e)) => ui::device_result(name, false, &format!("validation error: {e}")),
                None => {}
            }
        }
    }
}
