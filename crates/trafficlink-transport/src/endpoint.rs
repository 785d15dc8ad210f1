use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::SerialConfig;
use crate::error::{Result, TransportError};
use crate::stream::LinkStream;

const UNIX_PREFIX: &str = "unix:";

/// Where the device lives.
///
/// Parsed from a single string: `unix:<path>` selects a socket served by the
/// simulated controller, anything else is taken as a serial port name
/// (`/dev/ttyACM0`, `COM3`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Serial(String),
    Unix(PathBuf),
}

impl Endpoint {
    /// Open the transport behind this endpoint.
    ///
    /// `serial` is ignored for socket endpoints.
    pub fn open(&self, serial: &SerialConfig) -> Result<LinkStream> {
        match self {
            #[cfg(feature = "serial")]
            Endpoint::Serial(port) => crate::serial::open_serial(port, serial),
            #[cfg(not(feature = "serial"))]
            Endpoint::Serial(port) => {
                let _ = serial;
                Err(TransportError::Unsupported(format!(
                    "serial port {port} (built without the `serial` feature)"
                )))
            }
            Endpoint::Unix(path) => open_unix(path),
        }
    }
}

#[cfg(unix)]
fn open_unix(path: &std::path::Path) -> Result<LinkStream> {
    crate::uds::DeviceSocket::connect(path)
}

#[cfg(not(unix))]
fn open_unix(path: &std::path::Path) -> Result<LinkStream> {
    Err(TransportError::Unsupported(format!(
        "unix socket {} on this platform",
        path.display()
    )))
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err("endpoint must not be empty".to_string());
        }
        match input.strip_prefix(UNIX_PREFIX) {
            Some("") => Err("unix endpoint needs a socket path".to_string()),
            Some(path) => Ok(Endpoint::Unix(PathBuf::from(path))),
            None => Ok(Endpoint::Serial(input.to_string())),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Serial(port) => f.write_str(port),
            Endpoint::Unix(path) => write!(f, "{UNIX_PREFIX}{}", path.display()),
        }
    }
}
