use tracing::warn;
use trafficlink_device::{open, Command};

use crate::cmd::{link_config, wait_until_ready, DurationsArgs};
use crate::exit::{link_error, send_code, CliResult};
use crate::output::{print_send, OutputFormat};

pub fn run(args: DurationsArgs, format: OutputFormat) -> CliResult<i32> {
    let config = link_config(&args.serial);
    let connection =
        open(&args.endpoint, &config).map_err(|err| link_error("open failed", err))?;
    let link = connection.link();
    if !wait_until_ready(link, args.ready_timeout) {
        warn!(endpoint = %args.endpoint, "no status from device yet, sending anyway");
    }

    let command = Command::durations(args.red, args.yellow, args.green);
    let outcome = link.send(command);
    print_send(&command, outcome, &args.endpoint.to_string(), format);
    Ok(send_code(outcome))
}
