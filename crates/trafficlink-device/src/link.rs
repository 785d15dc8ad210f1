use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, warn};
use trafficlink_frame::{FrameError, LineReader, LineWriter};

use crate::command::Command;
use crate::config::{LinkConfig, RepeatModePolicy};
use crate::error::DecodeError;
use crate::state::{DeviceState, Mode, StatusRecord};

/// Result of handing one line to [`DeviceLink::on_line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// Blank line; nothing happened.
    Empty,
    /// The record was applied; carries the new state.
    Updated(DeviceState),
    /// The line was not a valid record; state unchanged.
    Discarded,
}

/// Result of a send attempt. None of these are errors: a send that could not
/// happen is dropped, never queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Written to the transport.
    Sent,
    /// The mode was already the last one sent; nothing written.
    AlreadyActive,
    /// Another send held the lock; nothing written.
    Busy,
    /// Inside the duration rate-limit window; nothing written.
    RateLimited,
    /// The write failed.
    Failed,
}

impl SendOutcome {
    pub fn is_sent(self) -> bool {
        self == SendOutcome::Sent
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SendOutcome::Sent => "sent",
            SendOutcome::AlreadyActive => "already-active",
            SendOutcome::Busy => "busy",
            SendOutcome::RateLimited => "rate-limited",
            SendOutcome::Failed => "failed",
        }
    }
}

/// Why a read loop returned.
#[derive(Debug)]
pub enum ReadLoopExit {
    /// The device closed the stream.
    EndOfStream,
    /// Reading failed; the link does not reconnect.
    ReadError(FrameError),
}

/// Writer plus everything the send lock protects.
struct Outbound<W> {
    writer: LineWriter<W>,
    last_mode: Option<Mode>,
    last_durations_at: Option<Instant>,
}

/// Host side of the device link.
///
/// Status lines go in through [`on_line`](Self::on_line) (normally from the
/// reader thread) and update the held [`DeviceState`]. Commands go out
/// through the `send_*` methods, which may be called from any thread: they
/// share one send lock that is only ever tried, so a send that finds it held
/// returns [`SendOutcome::Busy`] instead of waiting.
pub struct DeviceLink<W> {
    state: RwLock<DeviceState>,
    outbound: Mutex<Outbound<W>>,
    config: LinkConfig,
    decoded: AtomicU64,
    discarded: AtomicU64,
}

impl<W: Write> DeviceLink<W> {
    /// Wrap a raw writer.
    pub fn new(inner: W, config: LinkConfig) -> Self {
        let writer = LineWriter::with_config(inner, config.line.clone());
        Self::from_line_writer(writer, config)
    }

    /// Use an already configured line writer.
    pub fn from_line_writer(writer: LineWriter<W>, config: LinkConfig) -> Self {
        Self {
            state: RwLock::new(DeviceState::default()),
            outbound: Mutex::new(Outbound {
                writer,
                last_mode: None,
                last_durations_at: None,
            }),
            config,
            decoded: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Copy of the current state snapshot.
    pub fn state(&self) -> DeviceState {
        match self.state.read() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Records applied since the link was created.
    pub fn decoded_count(&self) -> u64 {
        self.decoded.load(Ordering::Relaxed)
    }

    /// Lines rejected since the link was created, including oversized ones.
    pub fn discarded_count(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// The mode most recently written, if any. Waits for the send lock.
    pub fn last_sent_mode(&self) -> Option<Mode> {
        match self.outbound.lock() {
            Ok(outbound) => outbound.last_mode,
            Err(poisoned) => poisoned.into_inner().last_mode,
        }
    }

    /// Decode one status line and apply it.
    pub fn on_line(&self, line: &str) -> DecodeOutcome {
        let line = line.trim();
        if line.is_empty() {
            return DecodeOutcome::Empty;
        }

        let record = match StatusRecord::parse(line) {
            Ok(record) => record,
            Err(err) => return self.discard(line, &err),
        };

        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        match state.merged(&record, self.config.blink_policy) {
            Ok(next) => {
                *state = next;
                drop(state);
                self.decoded.fetch_add(1, Ordering::Relaxed);
                debug!(
                    mode = %next.mode,
                    light = %next.current_light,
                    green_blink = next.green_blink,
                    brightness = next.brightness,
                    "device state updated"
                );
                DecodeOutcome::Updated(next)
            }
            Err(err) => {
                drop(state);
                self.discard(line, &err)
            }
        }
    }

    fn discard(&self, line: &str, err: &DecodeError) -> DecodeOutcome {
        self.discarded.fetch_add(1, Ordering::Relaxed);
        match err {
            // The firmware interleaves plain-text chatter with its records.
            DecodeError::NotARecord => debug!(line, "ignoring non-record line"),
            _ => warn!(line, error = %err, "discarding status line"),
        }
        DecodeOutcome::Discarded
    }

    /// Send a mode unless it is the last one sent.
    ///
    /// The command is written `mode_repeats` times back-to-back so a single
    /// garbled line does not lose it.
    pub fn send_mode(&self, mode: Mode) -> SendOutcome {
        self.send_mode_with(mode, RepeatModePolicy::Ignore)
    }

    /// Send a mode, choosing what a repeat of the last sent mode means.
    pub fn send_mode_with(&self, mode: Mode, policy: RepeatModePolicy) -> SendOutcome {
        let Some(mut outbound) = self.try_outbound("mode") else {
            return SendOutcome::Busy;
        };
        let repeated = outbound.last_mode == Some(mode);
        match policy {
            RepeatModePolicy::Ignore if repeated => SendOutcome::AlreadyActive,
            RepeatModePolicy::RevertToNormal if repeated && mode == Mode::Normal => {
                SendOutcome::AlreadyActive
            }
            RepeatModePolicy::RevertToNormal if repeated => {
                debug!(%mode, "mode already active, reverting to Normal");
                self.write_mode(&mut outbound, Mode::Normal)
            }
            _ => self.write_mode(&mut outbound, mode),
        }
    }

    /// Send new phase durations, at most once per `duration_interval`.
    pub fn send_durations(&self, red_ms: u32, yellow_ms: u32, green_ms: u32) -> SendOutcome {
        let Some(mut outbound) = self.try_outbound("durations") else {
            return SendOutcome::Busy;
        };
        let now = Instant::now();
        if let Some(previous) = outbound.last_durations_at {
            if now.duration_since(previous) < self.config.duration_interval {
                debug!(red_ms, yellow_ms, green_ms, "durations rate limited");
                return SendOutcome::RateLimited;
            }
        }
        outbound.last_durations_at = Some(now);

        let line = Command::durations(red_ms, yellow_ms, green_ms).to_string();
        match outbound.writer.write_line(&line) {
            Ok(()) => {
                debug!(command = %line, "sent durations");
                SendOutcome::Sent
            }
            Err(err) => {
                warn!(command = %line, error = %err, "failed to send durations");
                SendOutcome::Failed
            }
        }
    }

    /// Send any command.
    pub fn send(&self, command: Command) -> SendOutcome {
        match command {
            Command::SetMode(mode) => self.send_mode(mode),
            Command::SetDurations(d) => self.send_durations(d.red_ms, d.yellow_ms, d.green_ms),
        }
    }

    fn try_outbound(&self, kind: &'static str) -> Option<MutexGuard<'_, Outbound<W>>> {
        match self.outbound.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {
                debug!(kind, "send lock held, dropping command");
                None
            }
        }
    }

    fn write_mode(&self, outbound: &mut Outbound<W>, mode: Mode) -> SendOutcome {
        let line = Command::SetMode(mode).to_string();
        let repeats = self.config.effective_mode_repeats();
        let mut written = 0u8;
        for _ in 0..repeats {
            match outbound.writer.write_line(&line) {
                Ok(()) => written += 1,
                Err(err) => {
                    warn!(command = %line, error = %err, "failed to send mode");
                    break;
                }
            }
        }

        if written == 0 {
            return SendOutcome::Failed;
        }
        outbound.last_mode = Some(mode);
        debug!(command = %line, written, "sent mode");
        SendOutcome::Sent
    }

    /// Feed every line from `reader` through [`on_line`](Self::on_line)
    /// until the stream ends or fails.
    pub fn run_read_loop<R: Read>(&self, mut reader: LineReader<R>) -> ReadLoopExit {
        loop {
            match reader.read_line() {
                Ok(line) => {
                    self.on_line(&line);
                }
                Err(FrameError::LineTooLong { .. }) => {
                    self.discarded.fetch_add(1, Ordering::Relaxed);
                }
                Err(FrameError::ConnectionClosed) => {
                    info!("device stream closed");
                    return ReadLoopExit::EndOfStream;
                }
                Err(err) => {
                    warn!(error = %err, "device read failed");
                    return ReadLoopExit::ReadError(err);
                }
            }
        }
    }

    /// Async counterpart of [`run_read_loop`](Self::run_read_loop).
    #[cfg(feature = "async")]
    pub async fn run_read_loop_async<R>(&self, reader: R) -> ReadLoopExit
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        use futures_util::StreamExt;
        use tokio_util::codec::FramedRead;
        use trafficlink_frame::LineCodec;

        let codec = LineCodec::with_max_line_len(self.config.line.max_line_len);
        let mut lines = FramedRead::new(reader, codec);
        while let Some(item) = lines.next().await {
            match item {
                Ok(line) => {
                    self.on_line(&line);
                }
                Err(err) => {
                    warn!(error = %err, "device read failed");
                    return ReadLoopExit::ReadError(err);
                }
            }
        }
        info!("device stream closed");
        ReadLoopExit::EndOfStream
    }
}

impl<W: Write + Send + 'static> DeviceLink<W> {
    /// Run the read loop on a named thread.
    pub fn spawn_reader<R>(self: &Arc<Self>, reader: LineReader<R>) -> io::Result<JoinHandle<ReadLoopExit>>
    where
        R: Read + Send + 'static,
    {
        let link = Arc::clone(self);
        thread::Builder::new()
            .name("trafficlink-reader".to_string())
            .spawn(move || link.run_read_loop(reader))
    }
}

impl<W> std::fmt::Debug for DeviceLink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLink")
            .field("config", &self.config)
            .field("decoded", &self.decoded.load(Ordering::Relaxed))
            .field("discarded", &self.discarded.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
