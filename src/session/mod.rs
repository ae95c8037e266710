//! Relay session management
//!
//! A session is the caller-owned side of the relay workflow: detect a
//! device, connect, keep an in-memory mirror of its channels while a
//! background poller refreshes it, then disconnect.
//!
//! ```text
//! Idle -> Detecting -> Detected -> Connected -> Idle
//!            |
//!            +-> Idle (detection failed)
//! ```
//!
//! The client stays stateless. Device identity, channel count and the
//! channel state vector live in [`SessionState`], owned by [`Session`] and
//! exposed read-only to presentation code.

mod poller;

pub use poller::{StatusPoller, UPDATE_BUFFER};

use crate::config::SessionConfig;
use crate::error::{RelayError, Result};
use crate::relay::{Channel, ChannelState, ChannelStates, CommandRunner, ProcessRunner, RelayClient};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Troubleshooting text attached to a failed detection
pub const NO_DEVICE_HINT: &str = "No HID USB relay device found. Please ensure: \
    1. the device is connected to USB; \
    2. device drivers are installed; \
    3. hidusb-relay-cmd is next to this program, in the working directory or on PATH; \
    4. no other program is using the device";

/// Largest channel count a session will track
pub const MAX_CHANNELS: usize = u8::MAX as usize;

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No device detected
    Idle,
    /// Detection in progress
    Detecting,
    /// Device found, not connected
    Detected,
    /// Connected and polling
    Connected,
}

impl SessionPhase {
    /// Whether detection may start.
    ///
    /// `Detecting` only survives when a detection future was dropped
    /// midway, so a new attempt may take over.
    pub fn can_detect(&self) -> bool {
        !self.is_connected()
    }

    /// Whether a connection may be opened
    pub fn can_connect(&self) -> bool {
        matches!(self, SessionPhase::Detected)
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionPhase::Connected)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Detecting => write!(f, "detecting"),
            SessionPhase::Detected => write!(f, "detected"),
            SessionPhase::Connected => write!(f, "connected"),
        }
    }
}

/// Session state value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// Current phase
    pub phase: SessionPhase,
    /// Targeted device; `None` is the tool's default device
    pub device_id: Option<String>,
    /// Raw enumeration output from the last successful detection
    pub enumeration: Option<String>,
    /// Channel count from the last successful detection
    pub channel_count: usize,
    /// Channel states; empty unless connected, then exactly `channel_count` long
    pub channels: ChannelStates,
}

impl SessionState {
    fn new(device_id: Option<String>) -> Self {
        Self {
            phase: SessionPhase::Idle,
            device_id,
            enumeration: None,
            channel_count: 0,
            channels: ChannelStates::default(),
        }
    }

    fn reset(&mut self) {
        self.phase = SessionPhase::Idle;
        self.enumeration = None;
        self.channel_count = 0;
        self.channels = ChannelStates::default();
    }
}

/// Result of a successful detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    /// Raw enumeration output
    pub enumeration: String,
    /// Channels the session will track
    pub channel_count: usize,
    /// True when the count came from configuration, not the device
    pub used_fallback: bool,
}

/// Caller-owned relay session
pub struct Session<R = ProcessRunner>
where
    R: CommandRunner + 'static,
{
    client: Arc<RelayClient<R>>,
    config: SessionConfig,
    state: SessionState,
    poller: Option<StatusPoller>,
    updates: Option<mpsc::Receiver<ChannelStates>>,
}

impl<R: CommandRunner + 'static> Session<R> {
    /// Create an idle session around a client
    pub fn new(client: RelayClient<R>, config: SessionConfig) -> Self {
        let state = SessionState::new(client.device_id().map(str::to_string));
        Self {
            client: Arc::new(client),
            config,
            state,
            poller: None,
            updates: None,
        }
    }

    /// Read-only view of the session state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current phase
    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    /// The underlying client
    pub fn client(&self) -> &RelayClient<R> {
        &self.client
    }

    /// Look for a device and count its channels
    pub async fn detect(&mut self) -> Result<Detection> {
        if !self.state.phase.can_detect() {
            return Err(RelayError::InvalidState(format!(
                "Cannot detect while {}",
                self.state.phase
            )));
        }

        info!("Starting device detection...");
        self.state.phase = SessionPhase::Detecting;
        info!("Using executable: {}", self.client.executable().display());

        info!("Enumerating connected devices...");
        let Some(enumeration) = self.client.enumerate().await else {
            warn!("No device found");
            self.state.reset();
            return Err(RelayError::DetectionFailed(NO_DEVICE_HINT.to_string()));
        };
        info!("Device enumeration result: {}", enumeration);

        info!("Device found, detecting relay channels...");
        let detected = self.client.detect_channel_count().await;
        info!("Detected {} relay channels", detected);

        let (channel_count, used_fallback) = match (detected, self.config.fallback_channels) {
            (0, Some(fallback)) => {
                warn!(
                    "Device reported no channels, using configured fallback of {}",
                    fallback
                );
                (fallback, true)
            }
            (0, None) => {
                self.state.reset();
                return Err(RelayError::DetectionFailed(
                    "device enumerated but reported no relay channels \
                     (set session.fallback_channels to force a count)"
                        .to_string(),
                ));
            }
            (count, _) if count > MAX_CHANNELS => {
                self.state.reset();
                return Err(RelayError::DetectionFailed(format!(
                    "device reported {} relay channels, at most {} are supported",
                    count, MAX_CHANNELS
                )));
            }
            (count, _) => (count, false),
        };

        self.state.enumeration = Some(enumeration.clone());
        self.state.channel_count = channel_count;
        self.state.channels = ChannelStates::default();
        self.state.phase = SessionPhase::Detected;

        Ok(Detection {
            enumeration,
            channel_count,
            used_fallback,
        })
    }

    /// Connect to the detected device and start status polling
    pub async fn connect(&mut self) -> Result<()> {
        if !self.state.phase.can_connect() {
            return Err(RelayError::InvalidState(format!(
                "Cannot connect while {} (detect a device first)",
                self.state.phase
            )));
        }

        info!(
            "Connecting to device with {} channels...",
            self.state.channel_count
        );
        self.state.channels = ChannelStates::all_off(self.state.channel_count);

        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        self.poller = Some(StatusPoller::spawn(
            Arc::clone(&self.client),
            self.config.poll_interval,
            tx,
        ));
        self.updates = Some(rx);
        self.state.phase = SessionPhase::Connected;

        info!("Successfully connected to device");
        Ok(())
    }

    /// Stop polling and return to idle
    pub async fn disconnect(&mut self) {
        if !self.state.phase.is_connected() {
            debug!("Disconnect requested while {}", self.state.phase);
            return;
        }

        info!("Disconnecting from device...");
        self.updates = None;
        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }
        self.state.reset();
        info!("Disconnected");
    }

    /// Wait for the next poll reading and apply it.
    ///
    /// Returns the channels that changed, or `None` once polling has stopped.
    pub async fn next_update(&mut self) -> Option<Vec<(Channel, bool)>> {
        let reading = self.updates.as_mut()?.recv().await?;
        Some(self.apply_reading(&reading))
    }

    /// Merge a status reading into the channel mirror
    pub fn apply_reading(&mut self, reading: &ChannelStates) -> Vec<(Channel, bool)> {
        if !self.state.phase.is_connected() {
            return Vec::new();
        }

        let changed = self.state.channels.merge(reading);
        for (channel, on) in &changed {
            info!("Relay {} is now {}", channel, ChannelState::from(*on));
        }
        changed
    }

    /// Query status immediately and apply the result
    pub async fn refresh(&mut self) -> Result<Vec<(Channel, bool)>> {
        self.require_connected()?;

        let reading = self
            .client
            .query_channel_states()
            .await
            .ok_or_else(|| RelayError::CommandFailed("status query failed".to_string()))?;
        Ok(self.apply_reading(&reading))
    }

    /// Flip one channel based on the in-memory state
    pub async fn toggle(&mut self, channel: Channel) -> Result<ChannelState> {
        self.require_channel(channel)?;

        let current = ChannelState::from(self.state.channels.get(channel).unwrap_or(false));
        let desired = current.toggled();
        self.set_channel(channel, desired).await?;
        Ok(desired)
    }

    /// Switch one channel, updating memory on success
    pub async fn set_channel(&mut self, channel: Channel, state: ChannelState) -> Result<()> {
        self.require_channel(channel)?;

        info!("Turning {} relay {}...", state, channel);
        if !self.client.set_channel(channel, state).await {
            warn!("Failed to switch relay {}", channel);
            return Err(RelayError::CommandFailed(format!(
                "Failed to switch relay {} {}",
                channel, state
            )));
        }

        self.state.channels.set(channel, state.is_on());
        info!("Relay {} is now {}", channel, state);
        Ok(())
    }

    /// Switch every channel, updating memory on success
    pub async fn set_all(&mut self, state: ChannelState) -> Result<()> {
        self.require_connected()?;

        info!("Turning {} all relays...", state);
        if !self.client.set_all(state).await {
            warn!("Failed to switch all relays {}", state);
            return Err(RelayError::CommandFailed(format!(
                "Failed to switch all relays {}",
                state
            )));
        }

        self.state.channels.fill(state.is_on());
        info!("All relays turned {}", state);
        Ok(())
    }

    fn require_connected(&self) -> Result<()> {
        if !self.state.phase.is_connected() {
            return Err(RelayError::InvalidState(
                "Not connected to device".to_string(),
            ));
        }
        Ok(())
    }

    fn require_channel(&self, channel: Channel) -> Result<()> {
        self.require_connected()?;
        if channel.index() as usize > self.state.channel_count {
            return Err(RelayError::Validation(format!(
                "Relay {} does not exist (device has {} channels)",
                channel, self.state.channel_count
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        assert!(SessionPhase::Idle.can_detect());
        assert!(!SessionPhase::Idle.can_connect());
        assert!(SessionPhase::Detected.can_detect());
        assert!(SessionPhase::Detected.can_connect());
        assert!(SessionPhase::Detecting.can_detect());
        assert!(!SessionPhase::Connected.can_detect());
        assert!(SessionPhase::Connected.is_connected());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SessionPhase::Connected.to_string(), "connected");
        assert_eq!(SessionPhase::Idle.to_string(), "idle");
    }

    #[test]
    fn test_state_serializes() {
        let state = SessionState::new(Some("HURTM".to_string()));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["device_id"], "HURTM");
        assert_eq!(json["channels"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_operations_rejected_when_idle() {
        let client = RelayClient::new("/nonexistent/hidusb-relay-cmd");
        let mut session = Session::new(client, SessionConfig::default());

        assert!(matches!(session.connect().await, Err(RelayError::InvalidState(_))));
        assert!(session.set_all(ChannelState::On).await.is_err());
        assert!(session.refresh().await.is_err());

        // Disconnect from idle is a no-op.
        session.disconnect().await;
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_detect_missing_executable_returns_to_idle() {
        let client = RelayClient::new("/nonexistent/hidusb-relay-cmd");
        let mut session = Session::new(client, SessionConfig::default());

        let err = session.detect().await.unwrap_err();
        assert!(matches!(err, RelayError::DetectionFailed(_)));
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.state().channel_count, 0);
    }
}
