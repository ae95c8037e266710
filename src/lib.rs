//! hidrelay: control core for USB-HID relay boards
//!
//! This library drives a relay board through the vendor-supplied
//! `hidusb-relay-cmd` executable. It locates the executable, runs it with
//! fixed argument patterns and a bounded wait, parses its status text and
//! keeps a caller-owned mirror of the channel states.
//!
//! # Architecture
//!
//! The relay protocol itself stays inside the vendor tool. Every operation
//! spawns one short-lived process; there is no persistent connection. A
//! session layered on top tracks detection, connection and channel state,
//! with a single background task polling the device while connected.
//!
//! # Modules
//!
//! - `config`: Configuration parsing and validation
//! - `platform`: Executable naming and lookup
//! - `relay`: Relay tool client, command shapes and status parsing
//! - `session`: Detection/connection state machine and status polling
//! - `error`: Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod platform;
pub mod relay;
pub mod session;

// Re-export commonly used types
pub use error::{RelayError, Result};
pub use relay::{Channel, ChannelState, ChannelStates, RelayClient};
pub use session::{Session, SessionPhase, SessionState};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
