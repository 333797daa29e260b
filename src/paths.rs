//! Path resolution for netrecon
//!
//! # Environment Variables
//!
//! - `NETRECON_CONFIG` - Settings file to load
//! - `NETRECON_CONFIG_DIR` - Override config directory
//!
//! # Settings file lookup
//!
//! 1. `--config` / `NETRECON_CONFIG`
//! 2. `./netrecon.toml`
//! 3. `<config_dir>/netrecon.toml`
//! 4. None (built-in defaults)

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable naming the settings file
pub const ENV_CONFIG: &str = "NETRECON_CONFIG";

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "NETRECON_CONFIG_DIR";

/// Settings file name
pub const SETTINGS_FILE: &str = "netrecon.toml";

/// Get the netrecon config directory path
///
/// Priority:
/// 1. `NETRECON_CONFIG_DIR` env var
/// 2. `XDG_CONFIG_HOME/netrecon`
/// 3. Platform default
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("netrecon");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join("netrecon");
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("netrecon");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Locate the settings file, if any
///
/// An explicit path is returned as given even when it does not exist, so
/// the caller reports the missing file instead of silently using defaults.
pub fn settings_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        return Ok(Some(expand(&path.to_string_lossy())));
    }

    let local = PathBuf::from(SETTINGS_FILE);
    if local.exists() {
        log::debug!("Using settings from working directory");
        return Ok(Some(local));
    }

    let path = config_dir()?.join(SETTINGS_FILE);
    if path.exists() {
        return Ok(Some(path));
    }

    log::debug!("No settings file found, using defaults");
    Ok(None)
}

/// Resolve a path from settings, relative paths against `base`
pub fn resolve(path: &str, base: &Path) -> PathBuf {
    let expanded = expand(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
