use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use tracing::{debug, warn};
use trafficlink_transport::LinkStream;

use crate::config::LineConfig;
use crate::decode::Utf8ChunkDecoder;
use crate::error::{FrameError, Result};
use crate::framer::LineFramer;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete lines from any `Read` stream.
///
/// Handles partial reads and split characters internally; callers always get
/// whole lines, without the trailing `\n`, in the order they arrived.
pub struct LineReader<T> {
    inner: T,
    decoder: Utf8ChunkDecoder,
    framer: LineFramer,
    ready: VecDeque<String>,
    overflowed: Option<usize>,
    eof: bool,
    config: LineConfig,
}

impl<T: Read> LineReader<T> {
    /// Create a new line reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, LineConfig::default())
    }

    /// Create a new line reader with explicit configuration.
    pub fn with_config(inner: T, config: LineConfig) -> Self {
        Self {
            inner,
            decoder: Utf8ChunkDecoder::new(),
            framer: LineFramer::new(),
            ready: VecDeque::new(),
            overflowed: None,
            eof: false,
            config,
        }
    }

    /// Read the next complete line (blocking).
    ///
    /// At end of stream a non-empty unterminated remainder is returned as a
    /// final line; after that every call returns
    /// `Err(FrameError::ConnectionClosed)`. `Err(FrameError::LineTooLong)`
    /// reports a dropped oversized fragment and the reader stays usable.
    pub fn read_line(&mut self) -> Result<String> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(line);
            }
            if let Some(len) = self.overflowed.take() {
                return Err(FrameError::LineTooLong {
                    len,
                    max: self.config.max_line_len,
                });
            }
            if self.eof {
                return Err(FrameError::ConnectionClosed);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                self.finish();
                continue;
            }

            let text = self.decoder.decode(&chunk[..read]);
            self.ready.extend(self.framer.feed(&text));
            self.check_pending_len();
        }
    }

    fn finish(&mut self) {
        self.eof = true;
        let tail = self.decoder.finish();
        self.framer.feed(&tail);
        let remainder = self.framer.flush();
        if !remainder.is_empty() {
            debug!(len = remainder.len(), "stream ended with unterminated line");
            self.ready.push_back(remainder);
        }
    }

    fn check_pending_len(&mut self) {
        let len = self.framer.pending().len();
        if len > self.config.max_line_len {
            warn!(
                len,
                max = self.config.max_line_len,
                "dropping oversized partial line"
            );
            self.framer.discard();
            self.overflowed = Some(len);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &LineConfig {
        &self.config
    }
}

impl LineReader<LinkStream> {
    /// Create a line reader for a `LinkStream` and apply the read timeout
    /// from config.
    pub fn with_config_stream(mut inner: LinkStream, config: LineConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: trafficlink_transport::TransportError) -> FrameError {
    match err {
        trafficlink_transport::TransportError::Io(io)
        | trafficlink_transport::TransportError::Accept(io) => FrameError::Io(io),
        trafficlink_transport::TransportError::Bind { source, .. }
        | trafficlink_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
