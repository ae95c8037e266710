//! Configuration management
//!
//! This module handles the optional TOML configuration file and its
//! validation. Command-line flags are layered on top by the binary through
//! the `with_*` overrides.

mod toml_parser;
mod validation;

pub use toml_parser::{TomlConfig, TomlRelayConfig, TomlSessionConfig};
pub use validation::{
    validate_device_id, validate_fallback_channels, validate_file_path,
    validate_poll_interval_ms, validate_timeout_secs,
};

use crate::error::{RelayError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Relay tool settings
    pub relay: RelayConfig,
    /// Session settings
    pub session: SessionConfig,
}

/// How to find and drive the relay tool
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Explicit executable path, bypassing the locator
    pub executable: Option<PathBuf>,
    /// Bundled resource directory
    pub resource_dir: Option<PathBuf>,
    /// Device to target; `None` uses the tool's default device
    pub device_id: Option<String>,
    /// Upper bound on each invocation
    pub timeout: Duration,
}

/// Session behaviour
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay between status polls while connected
    pub poll_interval: Duration,
    /// Channel count assumed when a device enumerates but reports no channels
    pub fallback_channels: Option<usize>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            executable: None,
            resource_dir: None,
            device_id: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1500),
            fallback_channels: None,
        }
    }
}

impl Config {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let toml_config = TomlConfig::from_file(path)?;
        Ok(toml_config.into())
    }

    /// Parse configuration from a TOML string
    pub fn parse(toml: &str) -> Result<Self> {
        Ok(TomlConfig::parse(toml)?.into())
    }

    /// Override the executable path
    pub fn with_executable(mut self, executable: Option<PathBuf>) -> Self {
        if executable.is_some() {
            self.relay.executable = executable;
        }
        self
    }

    /// Override the device identifier
    pub fn with_device_id(mut self, device_id: Option<String>) -> Self {
        if device_id.is_some() {
            self.relay.device_id = device_id;
        }
        self
    }

    /// Override the invocation timeout
    pub fn with_timeout_secs(mut self, secs: Option<u64>) -> Self {
        if let Some(secs) = secs {
            self.relay.timeout = Duration::from_secs(secs);
        }
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        self.relay
            .validate()
            .map_err(|e| RelayError::Config(format!("[relay]: {}", e)))?;
        self.session
            .validate()
            .map_err(|e| RelayError::Config(format!("[session]: {}", e)))?;
        Ok(())
    }
}

impl RelayConfig {
    /// Validate relay settings
    pub fn validate(&self) -> Result<()> {
        if let Some(executable) = &self.executable {
            validation::validate_file_path(executable)?;
        }
        if let Some(resource_dir) = &self.resource_dir {
            validation::validate_file_path(resource_dir)?;
        }
        if let Some(id) = &self.device_id {
            validation::validate_device_id(id)?;
        }
        validation::validate_timeout_secs(self.timeout.as_secs())?;
        Ok(())
    }
}

impl SessionConfig {
    /// Validate session settings
    pub fn validate(&self) -> Result<()> {
        validation::validate_poll_interval_ms(self.poll_interval.as_millis() as u64)?;
        if let Some(count) = self.fallback_channels {
            validation::validate_fallback_channels(count)?;
        }
        Ok(())
    }
}
