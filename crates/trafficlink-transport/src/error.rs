use std::path::PathBuf;

/// Errors raised while opening or driving a device transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The serial port could not be opened.
    #[cfg(feature = "serial")]
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// Serial port enumeration failed.
    #[cfg(feature = "serial")]
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(serialport::Error),

    /// Failed to bind the simulator socket.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to a socket endpoint.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The endpoint kind is not available in this build.
    #[error("unsupported endpoint {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
