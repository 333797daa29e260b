//! OpenSSH-backed device transport
//!
//! Show commands run as a remote exec. Configuration is fed on stdin
//! wrapped in `configure terminal` / `end`. The reachability probe is a
//! plain TCP connect, independent of any SSH session.

use crate::runner;
use crate::settings::DeviceSettings;
use netstate::{Error, Result, Transport};
use std::net::{TcpStream, ToSocketAddrs};
use std::process::Command;
use std::time::Duration;

pub struct SshTransport {
    username: Option<String>,
    password: Option<String>,
    port: u16,
    connect_timeout: Duration,
}

impl SshTransport {
    pub fn new(settings: &DeviceSettings, password: Option<String>) -> Self {
        Self {
            username: settings.username.clone(),
            password,
            port: settings.ssh_port,
            connect_timeout: Duration::from_secs(settings.connect_timeout),
        }
    }

    /// Fail early when the client binaries are not installed
    pub fn preflight(&self) -> anyhow::Result<()> {
        let client = if self.password.is_some() { "sshpass" } else { "ssh" };
        if !runner::command_exists(client) {
            anyhow::bail!("'{client}' not found in PATH");
        }
        Ok(())
    }

    /// `ssh` invocation for `host`, through `sshpass` when a password is set
    fn command(&self, host: &str) -> Command {
        let mut cmd = match &self.password {
            Some(password) => {
                let mut cmd = Command::new("sshpass");
                cmd.env("SSHPASS", password).args(["-e", "ssh"]);
                cmd
            }
            None => {
                let mut cmd = Command::new("ssh");
                cmd.arg("-o").arg("BatchMode=yes");
                cmd
            }
        };
        cmd.args(self.ssh_args(host));
        cmd
    }

    fn ssh_args(&self, host: &str) -> Vec<String> {
        let mut args = vec![
            "-T".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs()),
            "-p".to_string(),
            self.port.to_string(),
        ];
        if let Some(user) = &self.username {
            args.push("-l".to_string());
            args.push(user.clone());
        }
        args.push(host.to_string());
        args
    }
}

/// Session script applying `commands` in configuration mode
fn config_script(commands: &[String]) -> String {
    let mut script = String::from("configure terminal\n");
    for command in commands {
        script.push_str(command);
        script.push('\n');
    }
    script.push_str("end\n");
    script
}

impl Transport for SshTransport {
    fn send_command(&self, host: &str, command: &str) -> Result<String> {
        log::trace!("{host}: exec '{command}'");
        let mut cmd = self.command(host);
        cmd.arg(command);
        runner::run_capture(&mut cmd, None).map_err(|e| Error::transport(host, format!("{e:#}")))
    }

    fn send_config(&self, host: &str, commands: &[String]) -> Result<String> {
        log::debug!("{host}: pushing {} config line(s)", commands.len());
        let mut cmd = self.command(host);
        runner::run_capture(&mut cmd, Some(&config_script(commands)))
            .map_err(|e| Error::transport(host, format!("{e:#}")))
    }

    fn probe(&self, host: &str, port: u16) -> bool {
        let Ok(addrs) = (host, port).to_socket_addrs() else {
            log::warn!("{host}: cannot resolve address");
            return false;
        };
        let reachable = addrs
            .into_iter()
            .any(|addr| TcpStream::connect_timeout(&addr, self.connect_timeout).is_ok());
        log::debug!("{host}: port {port} reachable: {reachable}");
        reachable
    }
}
