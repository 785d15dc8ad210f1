use std::fmt;
use std::io;

use trafficlink_device::{LinkError, SendOutcome};
use trafficlink_frame::FrameError;
use trafficlink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const NOT_SENT: i32 = 10;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::Unsupported(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::LineTooLong { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Transport(err) => transport_error(context, err),
        LinkError::Frame(err) => frame_error(context, err),
        LinkError::InvalidCommand(_) => CliError::new(USAGE, format!("{context}: {err}")),
        LinkError::Spawn(source) => io_error(context, source),
    }
}

/// Exit code for a one-shot send.
pub fn send_code(outcome: SendOutcome) -> i32 {
    match outcome {
        SendOutcome::Sent | SendOutcome::AlreadyActive => SUCCESS,
        SendOutcome::Failed => FAILURE,
        SendOutcome::Busy | SendOutcome::RateLimited => NOT_SENT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_socket_maps_to_transport_code() {
        let err = TransportError::Connect {
            path: "/tmp/nope.sock".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        let cli = link_error("open failed", LinkError::Transport(err));
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.starts_with("open failed: "));
    }

    #[test]
    fn send_outcomes_map_to_codes() {
        assert_eq!(send_code(SendOutcome::Sent), SUCCESS);
        assert_eq!(send_code(SendOutcome::Failed), FAILURE);
        assert_eq!(send_code(SendOutcome::RateLimited), NOT_SENT);
    }
}
