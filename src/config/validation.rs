//! Configuration validation functions
//!
//! This module provides validation for every configuration field: device
//! identifiers, time bounds, channel counts and paths.

use crate::error::{RelayError, Result};
use std::path::Path;

/// Longest accepted device identifier
pub const MAX_DEVICE_ID_LEN: usize = 32;

/// Largest channel count accepted for the detection fallback
pub const MAX_FALLBACK_CHANNELS: usize = 16;

/// Validate a device identifier (ASCII alphanumeric, '-' and '_')
///
/// The identifier becomes part of an `id=<identifier>` argument, so it must
/// not contain whitespace or anything the tool could read as another word.
pub fn validate_device_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(RelayError::Config(
            "Device id cannot be empty".to_string(),
        ));
    }

    if id.len() > MAX_DEVICE_ID_LEN {
        return Err(RelayError::Config(format!(
            "Device id '{}' exceeds maximum length of {} characters",
            id, MAX_DEVICE_ID_LEN
        )));
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(RelayError::Config(format!(
            "Device id '{}' contains invalid characters (only alphanumeric, '_', and '-' allowed)",
            id
        )));
    }

    Ok(())
}

/// Validate the per-invocation timeout (1-120 seconds)
pub fn validate_timeout_secs(secs: u64) -> Result<()> {
    if !(1..=120).contains(&secs) {
        return Err(RelayError::Config(format!(
            "Timeout {}s is out of valid range (1-120)",
            secs
        )));
    }
    Ok(())
}

/// Validate the status poll interval (100 ms - 60 s)
pub fn validate_poll_interval_ms(ms: u64) -> Result<()> {
    if !(100..=60_000).contains(&ms) {
        return Err(RelayError::Config(format!(
            "Poll interval {}ms is out of valid range (100-60000)",
            ms
        )));
    }
    Ok(())
}

/// Validate the channel count used when detection reports none
pub fn validate_fallback_channels(count: usize) -> Result<()> {
    if !(1..=MAX_FALLBACK_CHANNELS).contains(&count) {
        return Err(RelayError::Config(format!(
            "Fallback channel count {} is out of valid range (1-{})",
            count, MAX_FALLBACK_CHANNELS
        )));
    }
    Ok(())
}

/// Validate a configured path is non-empty and UTF-8
pub fn validate_file_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(RelayError::Config(
            "File path cannot be empty".to_string(),
        ));
    }

    // The file itself may appear later (e.g. a board plugged in with its tool).
    if path.to_str().is_none() {
        return Err(RelayError::Config(format!(
            "Invalid file path: {:?}",
            path
        )));
    }

    Ok(())
}
