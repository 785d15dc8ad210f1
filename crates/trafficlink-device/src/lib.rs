//! Host side of the traffic-light device link.
//!
//! The device prints its state as one JSON object per line and accepts
//! short text commands. [`DeviceLink`] keeps the latest [`DeviceState`]
//! decoded from those lines and sends [`Command`]s back with:
//! - deduplication of the mode last sent
//! - redundant copies of each mode command
//! - a rate limit on duration commands
//! - a send lock that drops, never queues, concurrent sends
//!
//! [`open`] wires a link to a serial port or socket and starts its reader
//! thread. [`Simulator`] serves a model of the firmware for use without
//! hardware.

pub mod command;
pub mod config;
pub mod connector;
pub mod controller;
pub mod error;
pub mod link;
pub mod simulator;
pub mod state;

pub use command::{Command, Durations};
pub use config::{
    BlinkMergePolicy, LinkConfig, RepeatModePolicy, DEFAULT_DURATION_INTERVAL,
    DEFAULT_MODE_REPEATS, MAX_MODE_REPEATS,
};
pub use connector::{open, Connection};
pub use controller::{ControllerConfig, TrafficController};
pub use error::{CommandError, DecodeError, LinkError, Result};
pub use link::{DecodeOutcome, DeviceLink, ReadLoopExit, SendOutcome};
pub use simulator::{SessionEnd, Simulator, DEFAULT_STATUS_INTERVAL};
pub use state::{DeviceState, Light, Mode, StatusRecord};
