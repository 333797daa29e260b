use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

/// Run a command, optionally feeding `input` on stdin, and capture stdout
pub fn run_capture(cmd: &mut Command, input: Option<&str>) -> Result<String> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut child = cmd
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to execute: {program}"))?;

    // stdin is fed from its own thread so a large echo on stdout cannot
    // fill the pipe while we are still writing
    let output = thread::scope(|scope| {
        let writer = match (input, child.stdin.take()) {
            (Some(text), Some(mut stdin)) => {
                Some(scope.spawn(move || stdin.write_all(text.as_bytes())))
            }
            _ => None,
        };
        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for {program}"))?;
        if let Some(writer) = writer {
            writer
                .join()
                .map_err(|_| anyhow::anyhow!("stdin writer for {program} panicked"))?
                .with_context(|| format!("Failed to write to {program}"))?;
        }
        Ok::<_, anyhow::Error>(output)
    })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Command failed: {}", stderr.trim())
    }
}

/// Check if a command exists
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
