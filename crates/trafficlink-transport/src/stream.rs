use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A connected device stream. Implements `Read + Write`.
///
/// Wraps either an open serial port or a Unix domain socket connected to the
/// simulated controller. Reads block until bytes arrive: the serial driver's
/// poll timeout is swallowed unless a read timeout was set explicitly.
pub struct LinkStream {
    inner: LinkStreamInner,
    /// Serial poll timeouts are retried instead of surfacing to the reader.
    retry_poll_timeouts: bool,
}

enum LinkStreamInner {
    #[cfg(feature = "serial")]
    Serial(Box<dyn serialport::SerialPort>),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(feature = "serial")]
            LinkStreamInner::Serial(port) => loop {
                match port.read(buf) {
                    Err(err) if err.kind() == std::io::ErrorKind::TimedOut && self.retry_poll_timeouts => {
                        continue
                    }
                    other => return other,
                }
            },
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(feature = "serial")]
            LinkStreamInner::Serial(port) => port.write(buf),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(feature = "serial")]
            LinkStreamInner::Serial(port) => port.flush(),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl LinkStream {
    #[cfg(feature = "serial")]
    pub(crate) fn from_serial(port: Box<dyn serialport::SerialPort>) -> Self {
        Self {
            inner: LinkStreamInner::Serial(port),
            retry_poll_timeouts: true,
        }
    }

    /// Wrap an already connected Unix stream (simulator sessions, tests).
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: LinkStreamInner::Unix(stream),
            retry_poll_timeouts: false,
        }
    }

    /// Set the read timeout.
    ///
    /// `None` blocks until data arrives. Serial ports share a single timeout
    /// for both directions, so this also bounds serial writes.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match &mut self.inner {
            #[cfg(feature = "serial")]
            LinkStreamInner::Serial(port) => {
                self.retry_poll_timeouts = timeout.is_none();
                if let Some(timeout) = timeout {
                    port.set_timeout(timeout).map_err(std::io::Error::from)?;
                }
                Ok(())
            }
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set the write timeout.
    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match &mut self.inner {
            #[cfg(feature = "serial")]
            LinkStreamInner::Serial(port) => {
                if let Some(timeout) = timeout {
                    port.set_timeout(timeout).map_err(std::io::Error::from)?;
                }
                Ok(())
            }
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => {
                stream.set_write_timeout(timeout).map_err(Into::into)
            }
        }
    }

    /// Clone the handle so reading and writing can live on separate threads.
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(feature = "serial")]
            LinkStreamInner::Serial(port) => {
                let cloned = port.try_clone().map_err(std::io::Error::from)?;
                Ok(Self {
                    inner: LinkStreamInner::Serial(cloned),
                    retry_poll_timeouts: self.retry_poll_timeouts,
                })
            }
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
        }
    }

    /// Shut down both directions, waking a reader blocked on another handle.
    ///
    /// Serial ports have no such operation; for them this is a no-op and
    /// the port closes when the last handle is dropped.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            #[cfg(feature = "serial")]
            LinkStreamInner::Serial(_) => Ok(()),
            #[cfg(unix)]
            LinkStreamInner::Unix(stream) => match stream.shutdown(std::net::Shutdown::Both) {
                Err(err) if err.kind() != std::io::ErrorKind::NotConnected => Err(err.into()),
                _ => Ok(()),
            },
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(feature = "serial")]
            LinkStreamInner::Serial(_) => "serial",
            #[cfg(unix)]
            LinkStreamInner::Unix(_) => "unix-domain-socket",
        }
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(feature = "serial")]
            LinkStreamInner::Serial(port) => f
                .debug_struct("LinkStream")
                .field("type", &"serial")
                .field("port", &port.name())
                .finish(),
            #[cfg(unix)]
            LinkStreamInner::Unix(_) => f.debug_struct("LinkStream").field("type", &"unix").finish(),
        }
    }
}
