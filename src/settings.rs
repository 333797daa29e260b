//! `netrecon.toml` settings
//!
//! ```toml
//! [inventory]
//! hosts = "inventory/hosts.yml"
//! groups = "inventory/groups.yml"
//!
//! [device]
//! username = "netops"
//! password_env = "NETRECON_PASSWORD"
//! ssh_port = 22
//! probe_port = 22
//! connect_timeout = 10
//! asa_interface = "mgmt"
//!
//! [reports]
//! directory = "~/netrecon/reports"
//! ```
//!
//! Every key is optional. Relative inventory paths are resolved against the
//! directory holding the settings file.

use crate::paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub inventory: InventorySettings,
    pub device: DeviceSettings,
    pub reports: ReportSettings,

    /// Directory relative paths resolve against
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventorySettings {
    pub hosts: String,
    pub groups: String,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            hosts: "inventory/hosts.yml".to_string(),
            groups: "inventory/groups.yml".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// SSH login user, the ssh client default when unset
    pub username: Option<String>,
    /// Name of the env var holding the device password (used via sshpass)
    pub password_env: Option<String>,
    pub ssh_port: u16,
    /// Port probed after an ACL change
    pub probe_port: u16,
    /// Seconds
    pub connect_timeout: u64,
    /// ASA interface named in ssh/http access lines
    pub asa_interface: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            username: None,
            password_env: None,
            ssh_port: 22,
            probe_port: aclkit::DEFAULT_PROBE_PORT,
            connect_timeout: 10,
            asa_interface: aclkit::render::DEFAULT_ASA_INTERFACE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub directory: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            directory: "~/netrecon/reports".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the resolved settings file, or defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match paths::settings_file(explicit)? {
            Some(path) => Self::load_from(&path),
            None => Ok(Self {
                base_dir: PathBuf::from("."),
                ..Self::default()
            }),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let mut settings: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        settings.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Directory holding the settings file, `.` without one
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn hosts_file(&self) -> PathBuf {
        paths::resolve(&self.inventory.hosts, &self.base_dir)
    }

    pub fn groups_file(&self) -> PathBuf {
        paths::resolve(&self.inventory.groups, &self.base_dir)
    }

    /// Device password from the configured env var, if both are set
    pub fn password(&self) -> Option<String> {
        self.device
            .password_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.device.ssh_port, 22);
        assert_eq!(settings.device.probe_port, 22);
        assert_eq!(settings.device.asa_interface, "mgmt");
        assert_eq!(settings.inventory.hosts, "inventory/hosts.yml");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("netrecon.toml");
        fs::write(
            &path,
            "[device]\nusername = \"netops\"\nprobe_port = 2222\n\n[inventory]\nhosts = \"hosts.yml\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.device.username.as_deref(), Some("netops"));
        assert_eq!(settings.device.probe_port, 2222);
        assert_eq!(settings.device.connect_timeout, 10);
        assert_eq!(settings.hosts_file(), temp.path().join("hosts.yml"));
        assert_eq!(
            settings.groups_file(),
            temp.path().join("inventory/groups.yml")
        );
    }

    #[test]
    fn test_invalid_file_names_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("netrecon.toml");
        fs::write(&path, "[device]\nssh_port = \"twenty-two\"\n").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("netrecon.toml"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        assert!(Settings::load(Some(&missing)).is_err());
    }
}
