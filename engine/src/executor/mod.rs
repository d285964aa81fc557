//! Command execution
//!
//! Runs a single shell command in a fresh subprocess with separately
//! captured stdout/stderr and a hard wall-clock timeout. Failures are
//! never fatal: spawn errors, nonzero exits, and timeouts all come back
//! as an error-shaped [`CommandResult`] for the reasoning layer to see.

use sdk::{CommandResult, EngineError};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default hard timeout for a single command
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CommandExecutor runs one external command per call. Stateless; the
/// only configuration is the default timeout.
///
/// The command line is handed to `sh -c`, so the capability accepts
/// arbitrary shell syntax. Safety is a deployment concern, not enforced
/// here.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    default_timeout: Duration,
}

impl CommandExecutor {
    /// Creates an executor with the default 30 second timeout.
    pub fn new() -> Self {
        Self {
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Creates an executor with a custom default timeout.
    pub fn with_default_timeout(timeout: Duration) -> Self {
        Self {
            default_timeout: timeout,
        }
    }

    /// Executes a command with the default timeout.
    pub async fn execute(&self, command: &str) -> CommandResult {
        self.execute_with_timeout(command, self.default_timeout)
            .await
    }

    /// Executes a command with an explicit timeout.
    ///
    /// On expiry the child is killed (the subprocess handle is dropped
    /// with `kill_on_drop`, which also covers cancellation of the
    /// calling future) and the result carries `timed_out = true`.
    pub async fn execute_with_timeout(&self, command: &str, timeout: Duration) -> CommandResult {
        debug!(command, timeout_secs = timeout.as_secs(), "executing command");

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(command, error = %e, "failed to spawn command");
                return Self::spawn_failure(e);
            }
        };

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let exit_code = output.status.code().unwrap_or(-1);
                if exit_code != 0 {
                    debug!(command, exit_code, "command exited nonzero");
                }
                CommandResult {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code,
                    timed_out: false,
                }
            }
            Ok(Err(e)) => {
                warn!(command, error = %e, "failed to collect command output");
                Self::spawn_failure(e)
            }
            Err(_) => {
                warn!(command, timeout_secs = timeout.as_secs(), "command timed out");
                CommandResult {
                    stdout: String::new(),
                    stderr: EngineError::CommandTimeout {
                        seconds: timeout.as_secs(),
                    }
                    .to_string(),
                    exit_code: -1,
                    timed_out: true,
                }
            }
        }
    }

    fn spawn_failure(e: std::io::Error) -> CommandResult {
        CommandResult {
            stdout: String::new(),
            stderr: EngineError::Io(e).to_string(),
            exit_code: -1,
            timed_out: false,
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}
