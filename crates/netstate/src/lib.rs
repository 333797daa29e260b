//! # Netstate
//!
//! Desired-vs-actual state validation for network devices.
//!
//! This crate takes a declarative description of what a device's
//! operational state should look like, gathers the live state through a
//! [`Transport`], canonicalizes it, and produces a structured compliance
//! report that can be merged into a per-host file on disk.
//!
//! ## Core Concepts
//!
//! - **DesiredState**: command string -> expected nested mapping. A `_mode: strict`
//!   key at any level also flags keys that only exist on the device
//! - **ActualState**: command string -> canonical mapping built by a formatter
//! - **FormatterRegistry**: (platform, command pattern) -> formatter function
//! - **ComplianceReport**: per-command results plus aggregate `complies`/`skipped`
//! - **ReportStore**: per-host, per-minute JSON report files with merge semantics
//!
//! ## Example
//!
//! ```ignore
//! use netstate::{FormatterRegistry, ReportStore, Validator};
//!
//! let formatters = FormatterRegistry::default();
//! let store = ReportStore::new("~/reports");
//! let validator = Validator::new(&transport, &formatters).with_store(store);
//!
//! let result = validator.validate("core-sw1", "10.0.0.1", "ios", &desired)?;
//! if result.failed() {
//!     eprintln!("{result}");
//! }
//! ```
//!
//! ## Provider Traits
//!
//! - [`Transport`]: sends show/config commands and probes reachability
//!
//! The crate never opens sessions itself, so it can be driven by any
//! transport (SSH, a lab simulator, or a recorded fixture in tests).

pub mod compare;
pub mod desired;
pub mod error;
pub mod formatter;
pub mod report;
pub mod transport;
pub mod types;
pub mod validate;

// Re-export main types at crate root
pub use compare::{compare_state, compliance_report};
pub use desired::{DesiredDocument, FeatureRegistry};
pub use error::{Error, Result};
pub use formatter::FormatterRegistry;
pub use report::ReportStore;
pub use transport::Transport;
pub use types::{
    ActualState, CommandReport, ComplianceEntry, ComplianceReport, DesiredState, MODE_KEY,
    PresentEntry, STRICT_MODE, SkippedEntry, StateMap,
};
pub use validate::{ValidationResult, Validator};
