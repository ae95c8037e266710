//! TOML configuration file parser
//!
//! This module handles parsing of the optional TOML configuration file.
//! Every key is optional; missing keys fall back to built-in defaults.

use crate::config::{Config, RelayConfig, SessionConfig};
use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Relay tool settings
    #[serde(default)]
    pub relay: TomlRelayConfig,

    /// Session settings
    #[serde(default)]
    pub session: TomlSessionConfig,
}

/// `[relay]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlRelayConfig {
    /// Explicit path to the relay executable
    pub executable: Option<PathBuf>,

    /// Bundled resource directory probed first by the locator
    pub resource_dir: Option<PathBuf>,

    /// Device identifier passed as `id=<device_id>`
    pub device_id: Option<String>,

    /// Per-invocation timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// `[session]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlSessionConfig {
    /// Status poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Channel count assumed when detection reports none
    pub fallback_channels: Option<usize>,
}

impl Default for TomlRelayConfig {
    fn default() -> Self {
        Self {
            executable: None,
            resource_dir: None,
            device_id: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for TomlSessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            fallback_channels: None,
        }
    }
}

impl TomlConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| {
            RelayError::Config(format!("Failed to parse TOML: {}", e))
        })
    }
}

// Convert TOML config to internal Config
impl From<TomlConfig> for Config {
    fn from(toml: TomlConfig) -> Self {
        Config {
            relay: toml.relay.into(),
            session: toml.session.into(),
        }
    }
}

impl From<TomlRelayConfig> for RelayConfig {
    fn from(toml: TomlRelayConfig) -> Self {
        RelayConfig {
            executable: toml.executable,
            resource_dir: toml.resource_dir,
            device_id: toml.device_id,
            timeout: Duration::from_secs(toml.timeout_secs),
        }
    }
}

impl From<TomlSessionConfig> for SessionConfig {
    fn from(toml: TomlSessionConfig) -> Self {
        SessionConfig {
            poll_interval: Duration::from_millis(toml.poll_interval_ms),
            fallback_channels: toml.fallback_channels,
        }
    }
}

// Default value functions
fn default_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    1500
}
