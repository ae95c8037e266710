//! External process execution
//!
//! `CommandRunner` is the seam between the relay client and the operating
//! system. `ProcessRunner` spawns the real tool with `tokio::process`,
//! captures both output streams and enforces the per-call time bound.

use crate::error::{RelayError, Result};
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// A fully specified tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable path or bare name
    pub program: PathBuf,
    /// Positional arguments
    pub args: Vec<String>,
    /// Upper bound on the wait
    pub timeout: Duration,
}

impl Invocation {
    /// Build an invocation
    pub fn new(program: impl AsRef<Path>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args,
            timeout,
        }
    }

    /// Command line for logs
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Output of a successful invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Trimmed standard output
    pub stdout: String,
    /// Trimmed standard error
    pub stderr: String,
}

/// Runs tool invocations
///
/// Implementations return `Ok` only when the process exited with status
/// zero. Every other outcome maps onto one of `ExecutableNotFound`,
/// `Timeout`, `NonZeroExit` or `Spawn`.
pub trait CommandRunner: Send + Sync {
    /// Run one invocation to completion
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// Runs the real executable as a child process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a new process runner
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<CommandOutput>> + Send {
        let invocation = invocation.clone();
        async move { run_process(&invocation).await }
    }
}

async fn run_process(invocation: &Invocation) -> Result<CommandOutput> {
    debug!("Executing command: {}", invocation.display());

    // Dropping the child on timeout kills it.
    let child = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                RelayError::ExecutableNotFound(invocation.program.display().to_string())
            }
            _ => RelayError::Spawn(format!("{}: {}", invocation.display(), e)),
        })?;

    let output = tokio::time::timeout(invocation.timeout, child.wait_with_output())
        .await
        .map_err(|_| RelayError::Timeout(invocation.timeout))?
        .map_err(|e| RelayError::Spawn(format!("{}: {}", invocation.display(), e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    debug!("Return code: {:?}", output.status.code());
    debug!("Output: {}", stdout);
    if !stderr.is_empty() {
        debug!("Error output: {}", stderr);
    }

    if !output.status.success() {
        return Err(RelayError::NonZeroExit {
            code: output.status.code(),
            stderr,
        });
    }

    Ok(CommandOutput { stdout, stderr })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display() {
        let invocation = Invocation::new(
            "hidusb-relay-cmd",
            vec!["id=HURTM".to_string(), "STATUS".to_string()],
            Duration::from_secs(10),
        );
        assert_eq!(invocation.display(), "hidusb-relay-cmd id=HURTM STATUS");
    }

    #[tokio::test]
    async fn test_missing_executable_is_not_found() {
        let invocation = Invocation::new(
            "/nonexistent/dir/hidusb-relay-cmd",
            vec!["ENUM".to_string()],
            Duration::from_secs(1),
        );

        let result = ProcessRunner::new().run(&invocation).await;
        assert!(matches!(result, Err(RelayError::ExecutableNotFound(_))));
    }
}
