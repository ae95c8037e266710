//! Relay tool command shapes
//!
//! Every invocation of the vendor tool is one of a handful of fixed
//! argument patterns. This module builds them.

use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU8;
use std::str::FromStr;

/// One-based relay channel index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Channel(NonZeroU8);

impl Channel {
    /// Create a channel from a one-based index. Returns `None` for 0.
    pub fn new(index: u8) -> Option<Self> {
        NonZeroU8::new(index).map(Self)
    }

    /// One-based index
    pub fn index(&self) -> u8 {
        self.0.get()
    }

    /// Iterate channels `1..=count`
    pub fn range(count: usize) -> impl Iterator<Item = Channel> {
        (1..=count.min(u8::MAX as usize)).filter_map(|i| Channel::new(i as u8))
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for Channel {
    type Error = RelayError;

    fn try_from(index: u8) -> Result<Self> {
        Channel::new(index)
            .ok_or_else(|| RelayError::Validation("Channel index must start at 1".to_string()))
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> u8 {
        channel.index()
    }
}

impl FromStr for Channel {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        let index: u8 = s
            .trim()
            .parse()
            .map_err(|_| RelayError::Validation(format!("Invalid channel index: {}", s)))?;
        Channel::try_from(index)
    }
}

/// Relay output state, as the tool spells it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelState {
    /// Energised
    On,
    /// De-energised
    Off,
}

impl ChannelState {
    /// Word used on the tool's command line
    pub fn as_arg(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    /// Whether this is the on state
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }

    /// The opposite state
    pub fn toggled(&self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }
}

impl From<bool> for ChannelState {
    fn from(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_arg())
    }
}

impl FromStr for ChannelState {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("ON") {
            Ok(Self::On)
        } else if s.eq_ignore_ascii_case("OFF") {
            Ok(Self::Off)
        } else {
            Err(RelayError::Parse(format!("Unknown channel state: {}", s)))
        }
    }
}

/// What a set command acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A single channel
    Channel(Channel),
    /// Every channel on the board
    All,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(channel) => write!(f, "{}", channel),
            Self::All => write!(f, "ALL"),
        }
    }
}

impl FromStr for Target {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Channel)
        }
    }
}

impl From<Channel> for Target {
    fn from(channel: Channel) -> Self {
        Self::Channel(channel)
    }
}

/// A single relay tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    /// List attached devices
    Enumerate,
    /// Report channel states
    Status,
    /// Switch a channel or all channels
    Set {
        /// Channel selection
        target: Target,
        /// Desired state
        state: ChannelState,
    },
}

impl RelayCommand {
    /// Positional arguments for the tool.
    ///
    /// Enumeration lists every board, so it never carries a device id.
    pub fn args(&self, device_id: Option<&str>) -> Vec<String> {
        let mut args = Vec::with_capacity(3);

        if let (Some(id), false) = (device_id, matches!(self, Self::Enumerate)) {
            args.push(format!("id={}", id));
        }

        match self {
            Self::Enumerate => args.push("ENUM".to_string()),
            Self::Status => args.push("STATUS".to_string()),
            Self::Set { target, state } => {
                args.push(state.as_arg().to_string());
                args.push(target.to_string());
            }
        }

        args
    }
}
