use tracing::warn;
use trafficlink_device::{open, Command, RepeatModePolicy};

use crate::cmd::{link_config, wait_until_ready, ModeArgs};
use crate::exit::{link_error, send_code, CliResult, SUCCESS};
use crate::output::{print_send, OutputFormat};

pub fn run(args: ModeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = link_config(&args.serial);
    config.mode_repeats = args.repeats;
    let policy = RepeatModePolicy::from(args.repeat_policy);

    let connection =
        open(&args.endpoint, &config).map_err(|err| link_error("open failed", err))?;
    let link = connection.link();
    if !wait_until_ready(link, args.ready_timeout) {
        warn!(endpoint = %args.endpoint, "no status from device yet, sending anyway");
    }

    let endpoint = args.endpoint.to_string();
    let mut code = SUCCESS;
    for mode in args.modes {
        let outcome = link.send_mode_with(mode, policy);
        print_send(&Command::SetMode(mode), outcome, &endpoint, format);
        if code == SUCCESS {
            code = send_code(outcome);
        }
    }
    Ok(code)
}
