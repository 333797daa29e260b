//! Progress indicators for device batches.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Bar counting finished devices
pub fn device_bar(len: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {prefix} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Hidden bar, for quiet runs
pub fn hidden() -> ProgressBar {
    ProgressBar::hidden()
}
