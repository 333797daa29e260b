//! # aclkit
//!
//! Safe replacement of management ACLs on network devices.
//!
//! This crate provides functionality for:
//! - Modelling ACLs and ACEs with wildcard, mask and prefix encodings
//! - Rendering desired configuration for IOS/IOS-XE, NX-OS and ASA
//! - Diffing backed-up configuration against the desired blocks
//! - Applying the change, probing reachability and rolling back on failure
//!
//! Device I/O goes through [`netstate::Transport`], so the controller runs
//! unchanged against SSH sessions or test doubles.
//!
//! ## Example
//!
//! ```no_run
//! use aclkit::{Ace, Acl, AclPlan, Action, Address, DeviceContext, Platform, ReconcileOptions, Renderer};
//! # fn run(transport: &dyn netstate::Transport) -> aclkit::Result<()> {
//! let acls = vec![Acl::new(
//!     "MGMT_ACCESS",
//!     vec![
//!         Ace::remark("Jump hosts"),
//!         Ace::rule(Action::Permit, Address::parse("10.17.10.0/24")?),
//!         Ace::rule(Action::Deny, Address::Any),
//!     ],
//! )];
//!
//! let plan = AclPlan::build(&Renderer::default(), Platform::Ios, &acls);
//! let ctx = DeviceContext::new("core-sw1", "10.0.0.1", &plan);
//!
//! let options = ReconcileOptions { dry_run: false, ..ReconcileOptions::default() };
//! let outcome = aclkit::reconcile(transport, &ctx, &options)?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod controller;
pub mod diff;
pub mod error;
pub mod render;
pub mod types;

pub use controller::{
    DEFAULT_PROBE_PORT, DeviceContext, Outcome, ReconcileOptions, RollbackCause, Stage, reconcile,
};
pub use diff::{AclDiff, DiffBlock, NO_DIFFERENCES};
pub use error::{Error, Result};
pub use render::{AclPlan, Renderer};
pub use types::{Ace, Acl, Action, Address, ConfigBlock, Encoding, Platform};
