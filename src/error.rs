//! Error types for hidrelay
//!
//! This module defines the error types used throughout the library.
//! We use `thiserror` for ergonomic error definitions and `anyhow` for
//! error propagation in the binary.
//!
//! Invocation errors (`ExecutableNotFound`, `Timeout`, `NonZeroExit`, `Spawn`)
//! never leave the relay client: it logs them and collapses them into an
//! absent result. They are still typed so the log says what went wrong.

use std::time::Duration;
use thiserror::Error;

/// Main error type for hidrelay operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// The relay executable could not be found
    #[error("Executable not found: {0}")]
    ExecutableNotFound(String),

    /// The relay executable did not finish within the time bound
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// The relay executable reported failure
    #[error("Command exited with {}: {}", exit_code_text(.code), .stderr)]
    NonZeroExit {
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// Any other process spawn or wait fault
    #[error("Failed to run command: {0}")]
    Spawn(String),

    /// Output did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not allowed in the current session phase
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// No usable device was found during detection
    #[error("Detection failed: {0}")]
    DetectionFailed(String),

    /// A relay command was rejected by the tool
    #[error("Relay command failed: {0}")]
    CommandFailed(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn exit_code_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Result type alias using RelayError
pub type Result<T> = std::result::Result<T, RelayError>;

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for RelayError {
    fn from(err: toml::de::Error) -> Self {
        RelayError::Config(err.to_string())
    }
}
