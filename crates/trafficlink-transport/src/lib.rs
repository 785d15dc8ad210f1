//! Byte transports for the traffic-light device link.
//!
//! The device speaks a line-oriented text protocol over whatever carries its
//! bytes. This crate opens that carrier and hands back a [`LinkStream`]:
//! - a serial port (feature `serial`, on by default) for real hardware
//! - a Unix domain socket for the simulated controller and tests
//!
//! Everything above this layer only needs `Read + Write`.

pub mod config;
pub mod endpoint;
pub mod error;
#[cfg(feature = "serial")]
pub mod serial;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use config::{SerialConfig, DEFAULT_BAUD_RATE};
pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
#[cfg(feature = "serial")]
pub use serial::{available_ports, open_serial, PortSummary};
pub use stream::LinkStream;

#[cfg(unix)]
pub use uds::DeviceSocket;
