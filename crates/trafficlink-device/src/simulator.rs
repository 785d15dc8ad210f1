use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use trafficlink_frame::{FrameError, LineReader, LineWriter};
use trafficlink_transport::LinkStream;

use crate::command::Command;
use crate::controller::{ControllerConfig, TrafficController};
use crate::error::{LinkError, Result};

/// How often the firmware prints its status.
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_millis(200);

/// How a simulator session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The host disconnected.
    ClientClosed,
    /// The `running` flag was cleared.
    Stopped,
}

/// Serves a [`TrafficController`] over a stream the way the firmware does:
/// a status line every interval, plus one right after each command.
#[derive(Debug)]
pub struct Simulator {
    controller: TrafficController,
    interval: Duration,
    started: Instant,
}

impl Simulator {
    pub fn new(config: ControllerConfig, interval: Duration) -> Self {
        Self {
            controller: TrafficController::new(config),
            interval,
            started: Instant::now(),
        }
    }

    pub fn controller(&self) -> &TrafficController {
        &self.controller
    }

    /// Run one session until the host leaves or `running` is cleared.
    ///
    /// Controller state carries over between sessions.
    pub fn serve(&mut self, stream: LinkStream, running: &AtomicBool) -> Result<SessionEnd> {
        let reader_stream = stream.try_clone()?;
        let (tx, rx) = mpsc::channel();
        let commands = thread::Builder::new()
            .name("trafficlink-sim-commands".to_string())
            .spawn(move || {
                let mut reader = LineReader::new(reader_stream);
                loop {
                    match reader.read_line() {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(FrameError::LineTooLong { .. }) => continue,
                        Err(_) => break,
                    }
                }
            })
            .map_err(LinkError::Spawn)?;

        let mut writer = LineWriter::new(stream);
        let mut next_status = Instant::now();
        let end = loop {
            if !running.load(Ordering::SeqCst) {
                break SessionEnd::Stopped;
            }

            let wait = next_status
                .saturating_duration_since(Instant::now())
                .min(self.interval);
            match rx.recv_timeout(wait) {
                Ok(line) => {
                    self.handle_command(&line);
                    next_status = Instant::now();
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break SessionEnd::ClientClosed,
            }

            let status = self.controller.status_line(self.started.elapsed());
            if let Err(err) = writer.write_line(&status) {
                debug!(error = %err, "status write failed, ending session");
                break SessionEnd::ClientClosed;
            }
            next_status += self.interval;
            if next_status < Instant::now() {
                next_status = Instant::now() + self.interval;
            }
        };

        // A departed host's reader ends on its own, so commands it sent just
        // before leaving are still read and applied below.
        if end == SessionEnd::Stopped {
            if let Err(err) = writer.get_ref().shutdown() {
                debug!(error = %err, "session shutdown failed");
            }
        }
        if commands.join().is_err() {
            warn!("command reader thread panicked");
        }
        for line in rx.try_iter() {
            self.handle_command(&line);
        }
        info!(?end, "simulator session ended");
        Ok(end)
    }

    fn handle_command(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        match line.parse::<Command>() {
            Ok(command) => {
                info!(%command, "simulator received command");
                self.controller.apply(command, self.started.elapsed());
            }
            Err(err) => warn!(line, error = %err, "simulator ignoring input"),
        }
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(ControllerConfig::default(), DEFAULT_STATUS_INTERVAL)
    }
}
