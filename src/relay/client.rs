//! Relay command client
//!
//! A stateless facade over the vendor tool. Each call spawns one process,
//! waits for it with a time bound and interprets the result. Failures of any
//! kind are logged and collapsed: the caller sees `None` or `false`.

use super::command::{Channel, ChannelState, RelayCommand, Target};
use super::runner::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
use super::status::{parse_channel_states, parse_status_line, ChannelStates};
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Default upper bound on a single tool invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the vendor relay tool
#[derive(Debug, Clone)]
pub struct RelayClient<R = ProcessRunner> {
    executable: PathBuf,
    device_id: Option<String>,
    timeout: Duration,
    runner: R,
}

impl RelayClient<ProcessRunner> {
    /// Create a client that spawns real processes
    pub fn new(executable: impl AsRef<Path>) -> Self {
        Self::with_runner(executable, ProcessRunner::new())
    }
}

impl<R: CommandRunner> RelayClient<R> {
    /// Create a client over a custom runner
    pub fn with_runner(executable: impl AsRef<Path>, runner: R) -> Self {
        Self {
            executable: executable.as_ref().to_path_buf(),
            device_id: None,
            timeout: DEFAULT_TIMEOUT,
            runner,
        }
    }

    /// Target a specific device instead of the tool's default one
    pub fn with_device_id(mut self, device_id: Option<String>) -> Self {
        self.device_id = device_id;
        self
    }

    /// Override the per-call time bound
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Executable this client invokes
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Bound device identifier
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Per-call time bound
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// List attached devices. Returns the raw trimmed output.
    pub async fn enumerate(&self) -> Option<String> {
        self.run(RelayCommand::Enumerate)
            .await
            .map(|output| output.stdout)
            .filter(|stdout| !stdout.is_empty())
    }

    /// Query channel states, returning one `<index>=<ON|OFF>` token per channel
    pub async fn query_status(&self) -> Option<Vec<String>> {
        let output = self.run(RelayCommand::Status).await?;
        if output.stdout.is_empty() {
            warn!("Status query returned no output");
            return None;
        }

        match parse_status_line(&output.stdout) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                warn!("Ignoring status output: {}", e);
                None
            }
        }
    }

    /// Query channel states and parse them into a state vector
    pub async fn query_channel_states(&self) -> Option<ChannelStates> {
        let tokens = self.query_status().await?;
        match parse_channel_states(&tokens) {
            Ok(states) => Some(states),
            Err(e) => {
                warn!("Ignoring status output: {}", e);
                None
            }
        }
    }

    /// Switch one channel. Success reflects the exit status only.
    pub async fn set_channel(&self, channel: Channel, state: ChannelState) -> bool {
        self.set(Target::Channel(channel), state).await
    }

    /// Switch every channel. Success reflects the exit status only.
    pub async fn set_all(&self, state: ChannelState) -> bool {
        self.set(Target::All, state).await
    }

    /// Number of channels reported by a status query, 0 on failure
    pub async fn detect_channel_count(&self) -> usize {
        self.query_status()
            .await
            .map(|tokens| tokens.len())
            .unwrap_or(0)
    }

    async fn set(&self, target: Target, state: ChannelState) -> bool {
        self.run(RelayCommand::Set { target, state }).await.is_some()
    }

    /// Run a command, logging and collapsing any failure
    async fn run(&self, command: RelayCommand) -> Option<CommandOutput> {
        match self.try_run(command).await {
            Ok(output) => Some(output),
            Err(e) => {
                warn!("Relay command {:?} failed: {}", command, e);
                None
            }
        }
    }

    /// Run a command and keep the failure cause
    pub async fn try_run(&self, command: RelayCommand) -> Result<CommandOutput> {
        let invocation = Invocation::new(
            &self.executable,
            command.args(self.device_id.as_deref()),
            self.timeout,
        );

        self.runner.run(&invocation).await
    }
}
