//! Host-side link to an Arduino traffic-light controller.
//!
//! The controller reports its state as newline-delimited JSON over a serial
//! line and takes `M:<mode>` / `D:<red>,<yellow>,<green>` commands back.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial port and Unix socket transports
//! - [`frame`]: newline framing over byte streams
//! - [`device`]: device state, commands, the link itself and a simulator
//!
//! ```no_run
//! use trafficlink::{open, LinkConfig, Mode};
//!
//! let endpoint = "/dev/ttyACM0".parse().expect("endpoint");
//! let connection = open(&endpoint, &LinkConfig::default()).expect("open");
//! connection.link().send_mode(Mode::RedOnly);
//! println!("{:?}", connection.link().state());
//! ```

/// Re-export transport types.
pub mod transport {
    pub use trafficlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use trafficlink_frame::*;
}

/// Re-export device link types.
pub mod device {
    pub use trafficlink_device::*;
}

pub use trafficlink_device::{
    open, Command, Connection, DeviceLink, DeviceState, Light, LinkConfig, Mode, SendOutcome,
};
pub use trafficlink_transport::Endpoint;
