use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;
use trafficlink_device::{ControllerConfig, Simulator};
use trafficlink_transport::DeviceSocket;

use crate::cmd::{install_ctrlc_handler, SimulateArgs};
use crate::exit::{link_error, transport_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: SimulateArgs, _format: OutputFormat) -> CliResult<i32> {
    let socket = DeviceSocket::bind(&args.path).map_err(|err| transport_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    let wake_path = args.path.clone();
    install_ctrlc_handler(running.clone(), move || {
        // Unblock a pending accept.
        let _ = DeviceSocket::connect(&wake_path);
    })?;

    let config = ControllerConfig {
        brightness: args.brightness,
        ..ControllerConfig::default()
    };
    let mut simulator = Simulator::new(config, args.interval);
    info!(path = %args.path.display(), "simulated controller listening");

    while running.load(Ordering::SeqCst) {
        let stream = socket
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        info!("host connected");
        let end = simulator
            .serve(stream, &running)
            .map_err(|err| link_error("session failed", err))?;
        info!(?end, mode = %simulator.controller().mode(), "host session over");
    }

    Ok(SUCCESS)
}
