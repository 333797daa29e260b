//! Transport provider trait
//!
//! The validation and reconciliation engines never open device sessions
//! themselves. Implement this trait to connect them to SSH, telnet, an
//! API, or a recorded fixture.

use crate::error::Result;

/// Provider for device command execution and reachability checks
///
/// Timeouts and retries belong to the implementation; callers treat every
/// method as a single blocking attempt.
pub trait Transport: Send + Sync {
    /// Run a show/exec command and return its raw text output
    fn send_command(&self, host: &str, command: &str) -> Result<String>;

    /// Push a list of configuration commands and return the raw session output
    fn send_config(&self, host: &str, commands: &[String]) -> Result<String>;

    /// Attempt a fresh connection to `host:port`
    ///
    /// Must not reuse any session held for `send_config`, so that a
    /// configuration change that cut off management access is detected.
    fn probe(&self, host: &str, port: u16) -> bool;

    /// Run several show commands, returning outputs in command order
    fn send_commands(&self, host: &str, commands: &[String]) -> Result<Vec<String>> {
        commands
            .iter()
            .map(|command| self.send_command(host, command))
            .collect()
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send_command(&self, host: &str, command: &str) -> Result<String> {
        (**self).send_command(host, command)
    }

    fn send_config(&self, host: &str, commands: &[String]) -> Result<String> {
        (**self).send_config(host, commands)
    }

    fn probe(&self, host: &str, port: u16) -> bool {
        (**self).probe(host, port)
    }
}
