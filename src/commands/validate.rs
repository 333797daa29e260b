//! `netrecon validate`: compare live device state with a desired-state file
//!
//! Besides the compliance run, the command can print the merged desired
//! state, the formatted actual state or the raw command output per host.
//! A saved actual state (`--actual-file`) turns the run into an offline
//! report that never contacts a device.

use crate::Context;
use crate::cli::ValidateArgs;
use crate::engine::{self, DeviceOutcome, ExecuteOptions, ExecuteSummary};
use crate::inventory::{Host, HostFilter};
use crate::transport::SshTransport;
use crate::ui;
use anyhow::{Context as _, Result, bail};
use netstate::{
    ActualState, DesiredDocument, DesiredState, FeatureRegistry, FormatterRegistry, ReportStore,
    StateMap, Transport, ValidationResult, Validator,
};
use serde_json::Value;
use std::fs;
use std::path::Path;

impl DeviceOutcome for std::result::Result<ValidationResult, String> {
    fn failed(&self) -> bool {
        self.as_ref().map_or(true, ValidationResult::failed)
    }
}

impl DeviceOutcome for std::result::Result<StateMap, String> {
    fn failed(&self) -> bool {
        self.is_err()
    }
}

/// Where each host's desired state comes from
enum DesiredSource {
    /// Feature document, built per host
    Document(DesiredDocument),
    /// The same command -> structure mapping for every host
    Fixed(DesiredState),
}

/// State printed instead of a compliance report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StateView {
    Desired,
    Actual,
    Raw,
}

impl StateView {
    fn from_args(args: &ValidateArgs) -> Option<Self> {
        if args.print_desired {
            Some(Self::Desired)
        } else if args.print_actual {
            Some(Self::Actual)
        } else if args.discover {
            Some(Self::Raw)
        } else {
            None
        }
    }
}

/// Everything one host's validation needs
struct Pipeline<'a> {
    transport: &'a dyn Transport,
    formatters: &'a FormatterRegistry,
    features: &'a FeatureRegistry,
    store: Option<&'a ReportStore>,
    desired: &'a DesiredSource,
    /// Saved actual state, replaces device queries
    actual: Option<&'a ActualState>,
}

pub fn run(ctx: &Context, args: ValidateArgs) -> Result<()> {
    let desired = match (&args.filename, &args.desired_file) {
        (Some(path), _) => DesiredSource::Document(load_document(path)?),
        (None, Some(path)) => DesiredSource::Fixed(load_state(path)?),
        (None, None) => bail!("Either --filename or --desired-file is required"),
    };
    let actual = args.actual_file.as_deref().map(load_state).transpose()?;
    let view = StateView::from_args(&args);
    let hosts = super::select_hosts(ctx, &HostFilter::from(&args.filters))?;

    let transport = SshTransport::new(&ctx.settings.device, ctx.settings.password());
    let needs_device = match view {
        Some(StateView::Desired) => false,
        Some(_) => true,
        None => actual.is_none(),
    };
    if needs_device {
        transport.preflight()?;
    }

    let store = if args.no_report || view.is_some() {
        None
    } else {
        let directory = args
            .directory
            .as_deref()
            .unwrap_or(&ctx.settings.reports.directory);
        Some(ReportStore::new(directory))
    };
    if let Some(store) = &store {
        log::info!("Writing reports to {}", store.directory().display());
    }

    let formatters = FormatterRegistry::builtin()?;
    let features = FeatureRegistry::builtin();
    let pipeline = Pipeline {
        transport: &transport,
        formatters: &formatters,
        features: &features,
        store: store.as_ref(),
        desired: &desired,
        actual: actual.as_ref(),
    };
    let opts = ExecuteOptions {
        jobs: args.jobs,
        quiet: ctx.quiet,
    };

    if let Some(view) = view {
        let results = engine::execute(&hosts, "Gathering", &opts, |host| {
            pipeline.state(host, view)
        })?;
        for (name, result) in &results {
            print_state(name, result);
        }
        let summary = ExecuteSummary::from_results(&results);
        if !summary.is_success() {
            bail!("{} device(s) failed", summary.failed);
        }
        return Ok(());
    }

    let results = engine::execute(&hosts, "Validating", &opts, |host| pipeline.validate(host))?;

    for (name, result) in &results {
        print_result(name, result);
    }

    let summary = ExecuteSummary::from_results(&results);
    engine::executor::print_summary(&summary, "Validation");
    if !summary.is_success() {
        bail!("{} device(s) failed validation", summary.failed);
    }
    Ok(())
}

/// Read a YAML desired-state document
pub fn load_document(path: &Path) -> Result<DesiredDocument> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    parse_document(&content).with_context(|| format!("Invalid desired state in {}", path.display()))
}

fn parse_document(yaml: &str) -> Result<DesiredDocument> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    let json = serde_json::to_value(value)?;
    Ok(DesiredDocument::from_value(json)?)
}

/// Read a saved state file (YAML or JSON)
pub fn load_state(path: &Path) -> Result<StateMap> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    parse_state(&content).with_context(|| format!("Invalid state file {}", path.display()))
}

/// A mapping of command -> structure, or a list of such mappings merged in order
fn parse_state(text: &str) -> Result<StateMap> {
    let value: serde_yaml::Value = serde_yaml::from_str(text)?;
    match serde_json::to_value(value)? {
        Value::Null => Ok(StateMap::new()),
        Value::Object(map) => Ok(map),
        Value::Array(items) => {
            let mut merged = StateMap::new();
            for item in items {
                match item {
                    Value::Object(map) => merged.extend(map),
                    other => bail!("expected a mapping per list item, found {other}"),
                }
            }
            Ok(merged)
        }
        other => bail!("expected a mapping of command to state, found {other}"),
    }
}

impl Pipeline<'_> {
    fn desired_for(&self, host: &Host) -> std::result::Result<DesiredState, String> {
        match self.desired {
            DesiredSource::Document(document) => self
                .features
                .build(document, &host.name, &host.groups)
                .map_err(|e| e.to_string()),
            DesiredSource::Fixed(state) => Ok(state.clone()),
        }
    }

    fn validator(&self) -> Validator<'_> {
        let validator = Validator::new(self.transport, self.formatters);
        match self.store {
            Some(store) => validator.with_store(store.clone()),
            None => validator,
        }
    }

    fn validate(&self, host: &Host) -> std::result::Result<ValidationResult, String> {
        let desired = self.desired_for(host)?;
        let platform = host.platform.as_deref().unwrap_or_default();
        let validator = self.validator();

        let result = match self.actual {
            Some(_) if desired.is_empty() => Ok(ValidationResult::NoDesiredState),
            Some(actual) => validator.evaluate(&host.name, &desired, actual),
            None => validator.validate(&host.name, &host.hostname, platform, &desired),
        };
        result.map_err(|e| e.to_string())
    }

    fn state(&self, host: &Host, view: StateView) -> std::result::Result<StateMap, String> {
        let desired = self.desired_for(host)?;
        let platform = host.platform.as_deref().unwrap_or_default();
        let validator = self.validator();

        let state = match view {
            StateView::Desired => Ok(desired),
            StateView::Actual => validator.actual_state(&host.hostname, platform, &desired),
            StateView::Raw => validator.discover(&host.hostname, &desired),
        };
        state.map_err(|e| e.to_string())
    }
}

fn print_result(name: &str, result: &std::result::Result<ValidationResult, String>) {
    match result {
        Ok(validation @ ValidationResult::Violations { .. }) => {
            ui::device_result(name, false, "does not comply");
            ui::block(&validation.message());
        }
        Ok(validation) => ui::device_result(name, !validation.failed(), &validation.message()),
        Err(e) => ui::device_result(name, false, e),
    }
}

fn print_state(name: &str, result: &std::result::Result<StateMap, String>) {
    match result {
        Ok(state) => {
            ui::section(name);
            match serde_json::to_string_pretty(state) {
                Ok(text) => ui::block(&text),
                Err(e) => ui::device_result(name, false, &format!("unprintable state: {e}")),
            }
        }
        Err(e) => ui::device_result(name, false, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netstate::Error;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};
    use tempfile::TempDir;

    struct MockTransport {
        outputs: HashMap<String, String>,
    }

    impl Transport for MockTransport {
        fn send_command(&self, host: &str, command: &str) -> netstate::Result<String> {
            self.outputs
                .get(command)
                .cloned()
                .ok_or_else(|| Error::transport(host, format!("no output for '{command}'")))
        }

        fn send_config(&self, _host: &str, _commands: &[String]) -> netstate::Result<String> {
            Ok(String::new())
        }

        fn probe(&self, _host: &str, _port: u16) -> bool {
            true
        }
    }

    const DESIRED: &str = r#"
hosts:
  core-sw1:
    ospf:
      nbrs: [9.9.9.9]
groups:
  ios:
    port_channel:
      Po3:
        mode: active
        members: [Gi0/15, Gi0/16]
all:
  ospf:
    nbrs: [192.168.255.1, 2.2.2.2]
"#;

    const MISSING_NEIGHBOR: &str = r#"
all:
  "show ip ospf neighbor":
    _mode: strict
    "2.2.2.2":
      state: FULL
"#;

    const OSPF_OUTPUT: &str = "\
Neighbor ID     Pri   State           Dead Time   Address         Interface
192.168.255.1     1   FULL/BDR        00:00:35    192.168.255.1   Vlan98
2.2.2.2           1   FULL/DR         00:00:31    10.1.1.2        Vlan2
";

    const ETHERCHANNEL_OUTPUT: &str = "\
Group  Port-channel  Protocol    Ports
------+-------------+-----------+-----------------------------------------------
3      Po3(SU)         LACP      Gi0/15(P)   Gi0/16(P)
";

    fn host(name: &str, groups: &[&str]) -> Host {
        Host {
            name: name.to_string(),
            hostname: "10.0.0.1".to_string(),
            groups: groups.iter().map(|g| (*g).to_string()).collect(),
            platform: Some("ios".to_string()),
            data: BTreeMap::new(),
        }
    }

    fn transport() -> MockTransport {
        MockTransport {
            outputs: [
                ("show ip ospf neighbor", OSPF_OUTPUT),
                ("show etherchannel summary", ETHERCHANNEL_OUTPUT),
            ]
            .into_iter()
            .map(|(c, o)| (c.to_string(), o.to_string()))
            .collect(),
        }
    }

    /// Transport that fails every command, for runs that must stay offline
    fn offline() -> MockTransport {
        MockTransport {
            outputs: HashMap::new(),
        }
    }

    fn document(yaml: &str) -> DesiredSource {
        DesiredSource::Document(parse_document(yaml).unwrap())
    }

    fn validate(
        transport: &dyn Transport,
        desired: &DesiredSource,
        actual: Option<&ActualState>,
        store: Option<&ReportStore>,
        host: &Host,
    ) -> std::result::Result<ValidationResult, String> {
        let formatters = FormatterRegistry::builtin().unwrap();
        let features = FeatureRegistry::builtin();
        Pipeline {
            transport,
            formatters: &formatters,
            features: &features,
            store,
            desired,
            actual,
        }
        .validate(host)
    }

    fn state(
        transport: &dyn Transport,
        desired: &DesiredSource,
        host: &Host,
        view: StateView,
    ) -> std::result::Result<StateMap, String> {
        let formatters = FormatterRegistry::builtin().unwrap();
        let features = FeatureRegistry::builtin();
        Pipeline {
            transport,
            formatters: &formatters,
            features: &features,
            store: None,
            desired,
            actual: None,
        }
        .state(host, view)
    }

    #[test]
    fn test_later_sections_overwrite_commands() {
        // the host's 9.9.9.9 neighbor is replaced by the `all` section
        let result = validate(
            &transport(),
            &document(DESIRED),
            None,
            None,
            &host("core-sw1", &["ios"]),
        )
        .unwrap();
        assert!(!result.failed(), "{}", result.message());
    }

    #[test]
    fn test_strict_mode_reports_extra_neighbor() {
        let result = validate(
            &transport(),
            &document(MISSING_NEIGHBOR),
            None,
            None,
            &host("edge-sw9", &[]),
        )
        .unwrap();
        assert!(matches!(result, ValidationResult::Violations { .. }));
        assert!(result.message().contains("192.168.255.1"));
    }

    #[test]
    fn test_report_written_per_host() {
        let temp = TempDir::new().unwrap();
        let store = ReportStore::new(&temp.path().to_string_lossy());

        let result = validate(
            &transport(),
            &document(DESIRED),
            None,
            Some(&store),
            &host("core-sw1", &["ios"]),
        )
        .unwrap();

        let path = result.report_path().unwrap();
        assert!(path.starts_with(temp.path()));
        let saved = ReportStore::load(path).unwrap().unwrap();
        assert!(saved.complies);
        assert!(saved.get("show etherchannel summary").is_some());
    }

    #[test]
    fn test_unknown_feature_fails_device() {
        let err = validate(
            &transport(),
            &document("all:\n  bgp:\n    peers: [1.1.1.1]\n"),
            None,
            None,
            &host("core-sw1", &[]),
        )
        .unwrap_err();
        assert!(err.contains("bgp"));
    }

    #[test]
    fn test_host_without_desired_state() {
        let result = validate(
            &transport(),
            &document("hosts:\n  other: {}\n"),
            None,
            None,
            &host("core-sw1", &[]),
        );
        assert_eq!(result, Ok(ValidationResult::NoDesiredState));
        assert!(result.failed());
    }

    #[test]
    fn test_invalid_document() {
        assert!(parse_document("- just\n- a list\n").is_err());
    }

    #[test]
    fn test_print_desired_renders_merged_state_offline() {
        let desired = state(
            &offline(),
            &document(DESIRED),
            &host("core-sw1", &["ios"]),
            StateView::Desired,
        )
        .unwrap();

        let neighbors = &desired["show ip ospf neighbor"];
        assert!(neighbors.get("192.168.255.1").is_some());
        assert!(neighbors.get("9.9.9.9").is_none());
        assert_eq!(desired["show etherchannel summary"]["Po3"]["protocol"], "LACP");
    }

    #[test]
    fn test_print_actual_formats_device_output() {
        let actual = state(
            &transport(),
            &document(DESIRED),
            &host("core-sw1", &["ios"]),
            StateView::Actual,
        )
        .unwrap();

        assert_eq!(actual["show ip ospf neighbor"]["2.2.2.2"]["state"], "FULL");
        assert_eq!(actual["show etherchannel summary"]["Po3"]["status"], "U");
    }

    #[test]
    fn test_discover_returns_raw_output() {
        let raw = state(
            &transport(),
            &document(DESIRED),
            &host("core-sw1", &["ios"]),
            StateView::Raw,
        )
        .unwrap();

        assert_eq!(raw["show ip ospf neighbor"], json!(OSPF_OUTPUT));
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn test_print_actual_reports_transport_errors() {
        let err = state(
            &offline(),
            &document(DESIRED),
            &host("core-sw1", &["ios"]),
            StateView::Actual,
        )
        .unwrap_err();
        assert!(err.contains("no output"));
    }

    #[test]
    fn test_saved_actual_state_reports_without_device() {
        let actual = parse_state(
            r#"{"show ip ospf neighbor": {"192.168.255.1": {"state": "FULL"}, "2.2.2.2": {"state": "INIT"}}}"#,
        )
        .unwrap();

        let result = validate(
            &offline(),
            &document(MISSING_NEIGHBOR),
            Some(&actual),
            None,
            &host("core-sw1", &[]),
        )
        .unwrap();

        assert!(matches!(result, ValidationResult::Violations { .. }));
        let message = result.message();
        assert!(message.contains("INIT"));
        assert!(message.contains("192.168.255.1"));
    }

    #[test]
    fn test_fixed_desired_state_against_device() {
        let desired = parse_state(
            "- show ip ospf neighbor:\n    2.2.2.2: {state: FULL}\n\
             - show etherchannel summary:\n    Po3: {status: U}\n",
        )
        .unwrap();

        let result = validate(
            &transport(),
            &DesiredSource::Fixed(desired),
            None,
            None,
            &host("edge-sw9", &[]),
        )
        .unwrap();
        assert!(!result.failed(), "{}", result.message());
    }

    #[test]
    fn test_fully_offline_report_from_saved_files() {
        let desired = parse_state("show ip ospf neighbor:\n  2.2.2.2: {state: FULL}\n").unwrap();
        let actual = parse_state(r#"{"show ip ospf neighbor": {"2.2.2.2": {"state": "FULL"}}}"#)
            .unwrap();

        let result = validate(
            &offline(),
            &DesiredSource::Fixed(desired),
            Some(&actual),
            None,
            &host("core-sw1", &[]),
        )
        .unwrap();
        assert!(!result.failed());
    }

    #[test]
    fn test_saved_actual_with_empty_desired_state() {
        let result = validate(
            &offline(),
            &DesiredSource::Fixed(StateMap::new()),
            Some(&StateMap::new()),
            None,
            &host("core-sw1", &[]),
        );
        assert_eq!(result, Ok(ValidationResult::NoDesiredState));
    }

    #[test]
    fn test_parse_state_shapes() {
        assert!(parse_state("~").unwrap().is_empty());
        assert!(parse_state("- a\n- b\n").is_err());
        assert!(parse_state("just text").is_err());

        let merged = parse_state("- cmd: {a: 1}\n- cmd: {b: 2}\n").unwrap();
        assert_eq!(merged["cmd"], json!({"b": 2}));
    }
}
