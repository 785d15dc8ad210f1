use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::info;
use trafficlink_frame::{FrameError, LineReader, LineWriter};
use trafficlink_transport::{Endpoint, LinkStream};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::link::{DeviceLink, ReadLoopExit};

/// An open device link with its reader thread running.
#[derive(Debug)]
pub struct Connection {
    endpoint: Endpoint,
    link: Arc<DeviceLink<LinkStream>>,
    reader: JoinHandle<ReadLoopExit>,
}

/// Open `endpoint` and start reading status lines from it.
///
/// Fails only if the transport cannot be opened or the reader thread cannot
/// start; once this returns, read and write failures are reported through
/// [`ReadLoopExit`] and [`SendOutcome`](crate::SendOutcome).
pub fn open(endpoint: &Endpoint, config: &LinkConfig) -> Result<Connection> {
    let stream = endpoint.open(&config.serial)?;
    let reader_stream = stream.try_clone()?;

    let reader = LineReader::with_config_stream(reader_stream, config.line.clone())?;
    let writer = LineWriter::with_config_stream(stream, config.line.clone())?;

    let link = Arc::new(DeviceLink::from_line_writer(writer, config.clone()));
    let reader = link.spawn_reader(reader).map_err(LinkError::Spawn)?;
    info!(%endpoint, "device link open");

    Ok(Connection {
        endpoint: endpoint.clone(),
        link,
        reader,
    })
}

impl Connection {
    /// Shared handle for sending commands and reading state.
    pub fn link(&self) -> &Arc<DeviceLink<LinkStream>> {
        &self.link
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether the reader thread has stopped.
    pub fn is_closed(&self) -> bool {
        self.reader.is_finished()
    }

    /// Wait for the reader thread to stop.
    pub fn join(self) -> ReadLoopExit {
        match self.reader.join() {
            Ok(exit) => exit,
            Err(_) => ReadLoopExit::ReadError(FrameError::Io(std::io::Error::other(
                "reader thread panicked",
            ))),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::Write;
    use std::thread;
    use std::time::{Duration, Instant};

    use trafficlink_transport::DeviceSocket;

    use super::*;
    use crate::link::SendOutcome;
    use crate::state::{Light, Mode};

    fn unique_socket_path(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "tlc-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("device.sock")
    }

    fn wait_for(mut check: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if check() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn open_reads_state_and_sends_commands() {
        let path = unique_socket_path("open");
        let socket = DeviceSocket::bind(&path).expect("socket should bind");

        let device = thread::spawn(move || {
            let stream = socket.accept().expect("socket should accept");
            let mut reader = LineReader::new(stream.try_clone().expect("stream should clone"));
            let mut stream = stream;
            stream
                .write_all(b"{\"Light\":\"Yellow\",\"Mode\":\"Normal\",\"Brightness\":80,\"GreenBlink\":0}\n")
                .expect("status should be written");
            let first = reader.read_line().expect("command should arrive");
            let second = reader.read_line().expect("repeat should arrive");
            (first, second)
        });

        let connection = open(
            &Endpoint::Unix(path.clone()),
            &LinkConfig::default(),
        )
        .expect("link should open");
        assert!(wait_for(|| connection.link().state().current_light == Light::Yellow));
        assert_eq!(connection.link().state().brightness, 80);

        assert_eq!(connection.link().send_mode(Mode::AllBlink), SendOutcome::Sent);
        let (first, second) = device.join().expect("device thread should complete");
        assert_eq!(first, "M:All Blink");
        assert_eq!(second, "M:All Blink");

        // Device side is gone once its thread returns.
        assert!(matches!(connection.join(), ReadLoopExit::EndOfStream));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn open_missing_socket_fails() {
        let path = unique_socket_path("missing");
        let err = open(&Endpoint::Unix(path.clone()), &LinkConfig::default())
            .expect_err("missing socket should fail");
        assert!(matches!(err, LinkError::Transport(_)), "{err}");
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
