//! Execution engine for netrecon
//!
//! Runs one task per device on a bounded thread pool, with a progress bar
//! and per-device results gathered in inventory order.

pub mod executor;

pub use executor::{DeviceOutcome, ExecuteOptions, ExecuteSummary, execute};
