use std::io::{self, ErrorKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use trafficlink_device::{DecodeOutcome, DeviceLink, LinkConfig};
use trafficlink_frame::{FrameError, LineConfig, LineReader};

use crate::cmd::{install_ctrlc_handler, MonitorArgs};
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_state, OutputFormat};

/// How often a blocked read wakes up to check for Ctrl-C.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let serial = args.serial.config();
    let stream = args
        .endpoint
        .open(&serial)
        .map_err(|err| transport_error("open failed", err))?;

    let line = LineConfig {
        read_timeout: Some(POLL_INTERVAL),
        ..LineConfig::default()
    };
    let mut reader = LineReader::with_config_stream(stream, line.clone())
        .map_err(|err| frame_error("open failed", err))?;
    // Decode only: nothing is sent while monitoring.
    let link = DeviceLink::new(
        io::sink(),
        LinkConfig {
            blink_policy: args.blink_policy.into(),
            line,
            serial,
            ..LinkConfig::default()
        },
    );

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone(), || {})?;

    let endpoint = args.endpoint.to_string();
    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let raw = match reader.read_line() {
            Ok(raw) => raw,
            Err(FrameError::Io(err))
                if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
            {
                continue
            }
            Err(FrameError::LineTooLong { .. }) => continue,
            Err(FrameError::ConnectionClosed) => {
                info!(%endpoint, "device closed the stream");
                break;
            }
            Err(err) => return Err(frame_error("read failed", err)),
        };

        if let DecodeOutcome::Updated(state) = link.on_line(&raw) {
            print_state(&state, raw.trim(), &endpoint, format);
            printed = printed.saturating_add(1);
            if args.count.is_some_and(|count| printed >= count) {
                break;
            }
        }
    }

    info!(
        decoded = link.decoded_count(),
        discarded = link.discarded_count(),
        "monitor stopped"
    );
    Ok(SUCCESS)
}
