use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "netrecon")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Reconcile network device ACLs and validate device state", long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (defaults to ./netrecon.toml or the config directory)
    #[arg(long, global = true, env = "NETRECON_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replace management ACLs, rolling back if a device becomes unreachable
    Acl(AclArgs),

    /// Compare live device state against a desired-state file
    Validate(ValidateArgs),

    /// Show inventory hosts matching the filters
    Inventory(InventoryArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Inventory filters
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Hosts whose name contains this string
    #[arg(short = 'n', long)]
    pub hostname: Option<String>,

    /// Hosts in any of these groups
    #[arg(short, long, num_args = 1..)]
    pub group: Vec<String>,

    /// Hosts in any of these locations
    #[arg(short, long, num_args = 1..)]
    pub location: Vec<String>,

    /// Hosts in any of these logical locations (WAN, Core, Access, ...)
    #[arg(long, num_args = 1..)]
    pub logical: Vec<String>,

    /// Hosts of any of these device types
    #[arg(short = 't', long = "type", num_args = 1..)]
    pub device_type: Vec<String>,

    /// Hosts whose software version contains this string
    #[arg(long = "version")]
    pub sw_version: Option<String>,
}

// ============================================================================
// ACL
// ============================================================================

#[derive(Args)]
pub struct AclArgs {
    /// YAML file with the ACL variables
    #[arg(short, long)]
    pub filename: PathBuf,

    /// Apply changes (default is a dry run)
    #[arg(short, long)]
    pub apply: bool,

    /// Skip the confirmation prompt when applying
    #[arg(short, long)]
    pub yes: bool,

    /// Validate the ACLs on each device after the change
    #[arg(long)]
    pub validate: bool,

    /// Number of devices handled in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    #[command(flatten)]
    pub filters: FilterArgs,
}

// ============================================================================
// Validate
// ============================================================================

#[derive(Args)]
pub struct ValidateArgs {
    /// YAML file with desired-state features per host, group and all
    #[arg(
        short,
        long,
        required_unless_present = "desired_file",
        conflicts_with = "desired_file"
    )]
    pub filename: Option<PathBuf>,

    /// Fixed desired state (command -> expected structure), used for every host
    #[arg(long, value_name = "FILE")]
    pub desired_file: Option<PathBuf>,

    /// Saved actual state to report against instead of querying devices
    #[arg(long, value_name = "FILE", conflicts_with_all = ["print_actual", "discover"])]
    pub actual_file: Option<PathBuf>,

    /// Print each host's merged desired state and exit
    #[arg(long, conflicts_with_all = ["print_actual", "discover"])]
    pub print_desired: bool,

    /// Print each host's formatted actual state and exit
    #[arg(long, conflicts_with = "discover")]
    pub print_actual: bool,

    /// Print the raw output of each desired command and exit
    #[arg(long)]
    pub discover: bool,

    /// Directory for compliance reports (defaults to the settings value)
    #[arg(short = 'd', long)]
    pub directory: Option<String>,

    /// Do not write report files
    #[arg(long)]
    pub no_report: bool,

    /// Number of devices handled in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    #[command(flatten)]
    pub filters: FilterArgs,
}

// ============================================================================
// Inventory
// ============================================================================

#[derive(Args)]
pub struct InventoryArgs {
    /// Show host data and groups
    #[arg(long)]
    pub detail: bool,

    #[command(flatten)]
    pub filters: FilterArgs,
}
