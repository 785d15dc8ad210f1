/// Errors raised while opening or running a device link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error (port could not be opened, socket refused).
    #[error("transport error: {0}")]
    Transport(#[from] trafficlink_transport::TransportError),

    /// Line-level error.
    #[error("frame error: {0}")]
    Frame(#[from] trafficlink_frame::FrameError),

    /// A command line did not parse.
    #[error("invalid command: {0}")]
    InvalidCommand(#[from] CommandError),

    /// The reader thread could not be started.
    #[error("failed to spawn reader thread: {0}")]
    Spawn(std::io::Error),
}

/// Why a status line was discarded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The line is not a `{...}` object.
    #[error("not a status record")]
    NotARecord,

    /// The object did not parse.
    #[error("malformed status record: {0}")]
    Json(#[from] serde_json::Error),

    /// `Mode` names no known mode.
    #[error("unknown mode {0:?}")]
    UnknownMode(String),

    /// `Light` names no known light.
    #[error("unknown light {0:?}")]
    UnknownLight(String),
}

/// Why a command line did not parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Neither `M:` nor `D:`.
    #[error("unrecognized command {0:?}")]
    Unrecognized(String),

    /// `M:` followed by an unknown mode.
    #[error("unknown mode {0:?}")]
    UnknownMode(String),

    /// `D:` without three comma-separated millisecond values.
    #[error("invalid durations {0:?}")]
    InvalidDurations(String),
}

pub type Result<T> = std::result::Result<T, LinkError>;
