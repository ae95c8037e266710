//! Relay tool client
//!
//! This module drives the vendor `hidusb-relay-cmd` executable: it builds
//! the fixed argument patterns, runs the process with a time bound and
//! parses the textual status report.

mod client;
mod command;
mod runner;
mod status;

pub use client::{RelayClient, DEFAULT_TIMEOUT};
pub use command::{Channel, ChannelState, RelayCommand, Target};
pub use runner::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
pub use status::{parse_channel_states, parse_status_line, parse_token, ChannelStates};
