use std::io::{ErrorKind, Write};

use bytes::{BufMut, BytesMut};
use trafficlink_transport::LinkStream;

use crate::config::LineConfig;
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 64;

/// Writes newline-terminated lines to any `Write` stream.
///
/// Each line goes out as one contiguous buffer so two writers sharing a
/// stream behind a lock can never interleave inside a line.
pub struct LineWriter<T> {
    inner: T,
    buf: BytesMut,
    config: LineConfig,
}

impl<T: Write> LineWriter<T> {
    /// Create a new line writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, LineConfig::default())
    }

    /// Create a new line writer with explicit configuration.
    pub fn with_config(inner: T, config: LineConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write `line` followed by `\n` (blocking), then flush.
    ///
    /// A trailing `\n` already present in `line` is not doubled.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let body = line.strip_suffix('\n').unwrap_or(line);
        if body.len() > self.config.max_line_len {
            return Err(FrameError::LineTooLong {
                len: body.len(),
                max: self.config.max_line_len,
            });
        }

        self.buf.clear();
        self.buf.reserve(body.len() + 1);
        self.buf.put_slice(body.as_bytes());
        self.buf.put_u8(b'\n');

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if self.should_retry(&err) => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if self.should_retry(&err) => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// `Interrupted` is always retried. `WouldBlock` is retried only when no
    /// write timeout is set; with one set it means the timeout expired.
    fn should_retry(&self, err: &std::io::Error) -> bool {
        match err.kind() {
            ErrorKind::Interrupted => true,
            ErrorKind::WouldBlock => self.config.write_timeout.is_none(),
            _ => false,
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current writer configuration.
    pub fn config(&self) -> &LineConfig {
        &self.config
    }
}

impl LineWriter<LinkStream> {
    /// Create a line writer for a `LinkStream` and apply the write timeout
    /// from config.
    pub fn with_config_stream(mut inner: LinkStream, config: LineConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    fn written(writer: LineWriter<Cursor<Vec<u8>>>) -> String {
        String::from_utf8(writer.into_inner().into_inner()).unwrap()
    }

    #[test]
    fn appends_newline() {
        let mut writer = LineWriter::new(Cursor::new(Vec::new()));
        writer.write_line("M:Red Only").unwrap();
        assert_eq!(written(writer), "M:Red Only\n");
    }

    #[test]
    fn does_not_double_existing_newline() {
        let mut writer = LineWriter::new(Cursor::new(Vec::new()));
        writer.write_line("D:1,2,3\n").unwrap();
        writer.write_line("M:Normal").unwrap();
        assert_eq!(written(writer), "D:1,2,3\nM:Normal\n");
    }

    #[test]
    fn oversized_line_rejected() {
        let cfg = LineConfig {
            max_line_len: 4,
            ..LineConfig::default()
        };
        let mut writer = LineWriter::with_config(Cursor::new(Vec::new()), cfg);
        let err = writer.write_line("M:All Blink").unwrap_err();
        assert!(matches!(err, FrameError::LineTooLong { len: 11, max: 4 }));
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = LineWriter::new(sink);

        writer.write_line("M:All Off").unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn retries_interrupted_and_would_block() {
        let mut writer = LineWriter::new(FlakyWriter {
            failures: vec![ErrorKind::Interrupted, ErrorKind::WouldBlock],
            data: Vec::new(),
        });
        writer.write_line("D:10,20,30").unwrap();
        assert_eq!(writer.get_ref().data, b"D:10,20,30\n");
    }

    #[test]
    fn would_block_fails_once_write_timeout_is_set() {
        let cfg = LineConfig {
            write_timeout: Some(std::time::Duration::from_millis(10)),
            ..LineConfig::default()
        };
        let mut writer = LineWriter::with_config(
            FlakyWriter {
                failures: vec![ErrorKind::Interrupted, ErrorKind::WouldBlock],
                data: Vec::new(),
            },
            cfg,
        );
        let err = writer.write_line("D:10,20,30").unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
        assert!(writer.get_ref().data.is_empty());
    }

    #[test]
    fn stalled_peer_times_out_instead_of_spinning() {
        use std::time::{Duration, Instant};

        // The peer never reads, so the socket buffer fills and stays full.
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let cfg = LineConfig {
            write_timeout: Some(Duration::from_millis(20)),
            ..LineConfig::default()
        };
        let mut writer = LineWriter::with_config_stream(LinkStream::from_unix(left), cfg).unwrap();
        let line = "D:".to_string() + &"9".repeat(4000);

        let started = Instant::now();
        let err = loop {
            match writer.write_line(&line) {
                Ok(()) => assert!(
                    started.elapsed() < Duration::from_secs(10),
                    "socket buffer never filled"
                ),
                Err(err) => break err,
            }
        };
        assert!(matches!(
            err,
            FrameError::Io(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
        ));
    }

    #[test]
    fn partial_writes_complete_the_line() {
        let mut writer = LineWriter::new(TrickleWriter { data: Vec::new() });
        writer.write_line("M:All Blink").unwrap();
        assert_eq!(writer.into_inner().data, b"M:All Blink\n");
    }

    #[test]
    fn zero_write_is_connection_closed() {
        let mut writer = LineWriter::new(ZeroWriter);
        let err = writer.write_line("M:Normal").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn broken_pipe_is_io_error() {
        let mut writer = LineWriter::new(BrokenWriter);
        let err = writer.write_line("M:Normal").unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn applies_write_timeout_for_link_stream() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let cfg = LineConfig {
            write_timeout: Some(std::time::Duration::from_millis(10)),
            ..LineConfig::default()
        };
        let writer = LineWriter::with_config_stream(LinkStream::from_unix(left), cfg);
        assert!(writer.is_ok());
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FlakyWriter {
        failures: Vec<ErrorKind>,
        data: Vec<u8>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.failures.is_empty() {
                return Err(std::io::Error::from(self.failures.remove(0)));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct TrickleWriter {
        data: Vec<u8>,
    }

    impl Write for TrickleWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf.len().min(3);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
