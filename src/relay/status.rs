//! Status output parsing
//!
//! The tool reports state as one line such as
//! `Board ID=[HURTM] State: R1=OFF R2=ON`. Everything after the last colon
//! is a whitespace separated list of `<label>=<ON|OFF>` tokens, one per
//! channel, in channel order.

use super::command::{Channel, ChannelState};
use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};

/// Split a status line into per-channel tokens.
///
/// Returns a parse error when the text has no colon.
pub fn parse_status_line(output: &str) -> Result<Vec<String>> {
    let (_, states) = output
        .trim()
        .rsplit_once(':')
        .ok_or_else(|| RelayError::Parse(format!("Status output has no ':' separator: {:?}", output)))?;

    Ok(states.split_whitespace().map(str::to_string).collect())
}

/// Parse one `<label>=<ON|OFF>` token
pub fn parse_token(token: &str) -> Result<ChannelState> {
    let (_, value) = token
        .rsplit_once('=')
        .ok_or_else(|| RelayError::Parse(format!("Malformed channel token: {:?}", token)))?;
    value.parse()
}

/// Turn status tokens into a state vector, position `i` being channel `i + 1`
pub fn parse_channel_states<S: AsRef<str>>(tokens: &[S]) -> Result<ChannelStates> {
    tokens
        .iter()
        .map(|t| parse_token(t.as_ref()).map(|s| s.is_on()))
        .collect::<Result<Vec<bool>>>()
        .map(ChannelStates::from)
}

/// Channel state vector, indexed from 1
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelStates(Vec<bool>);

impl ChannelStates {
    /// `count` channels, all off
    pub fn all_off(count: usize) -> Self {
        Self(vec![false; count])
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no channels
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// State of a channel, `None` when out of range
    pub fn get(&self, channel: Channel) -> Option<bool> {
        self.0.get(channel.index() as usize - 1).copied()
    }

    /// Set a channel, returning whether the value changed.
    /// Out-of-range channels are ignored.
    pub fn set(&mut self, channel: Channel, on: bool) -> bool {
        match self.0.get_mut(channel.index() as usize - 1) {
            Some(slot) if *slot != on => {
                *slot = on;
                true
            }
            _ => false,
        }
    }

    /// Set every channel
    pub fn fill(&mut self, on: bool) {
        self.0.iter_mut().for_each(|slot| *slot = on);
    }

    /// Merge a fresh reading, touching only channels this vector already has.
    /// Returns the channels that changed.
    pub fn merge(&mut self, reading: &ChannelStates) -> Vec<(Channel, bool)> {
        Channel::range(self.len().min(reading.len()))
            .filter_map(|channel| {
                let on = reading.get(channel)?;
                self.set(channel, on).then_some((channel, on))
            })
            .collect()
    }

    /// Iterate `(channel, on)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (Channel, bool)> + '_ {
        Channel::range(self.len()).zip(self.0.iter().copied())
    }

    /// Raw booleans
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

impl From<Vec<bool>> for ChannelStates {
    fn from(states: Vec<bool>) -> Self {
        Self(states)
    }
}

impl std::fmt::Display for ChannelStates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(channel, on)| format!("{}={}", channel, ChannelState::from(on)))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}
