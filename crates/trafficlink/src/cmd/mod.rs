use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args, Subcommand, ValueEnum};
use trafficlink_device::{BlinkMergePolicy, DeviceLink, LinkConfig, Mode, RepeatModePolicy};
use trafficlink_transport::{Endpoint, LinkStream, SerialConfig, DEFAULT_BAUD_RATE};

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod durations;
pub mod mode;
pub mod monitor;
pub mod ports;
#[cfg(unix)]
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print device state as it arrives.
    Monitor(MonitorArgs),
    /// Send one or more mode commands.
    Mode(ModeArgs),
    /// Send new red/yellow/green phase durations.
    Durations(DurationsArgs),
    /// Serve a simulated controller on a Unix socket.
    Simulate(SimulateArgs),
    /// List serial ports.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Mode(args) => mode::run(args, format),
        Command::Durations(args) => durations::run(args, format),
        #[cfg(unix)]
        Command::Simulate(args) => simulate::run(args, format),
        #[cfg(not(unix))]
        Command::Simulate(_) => Err(CliError::new(
            crate::exit::USAGE,
            "simulate requires Unix domain sockets",
        )),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SerialArgs {
    /// Serial baud rate.
    #[arg(long, env = "TRAFFICLINK_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
}

impl SerialArgs {
    pub fn config(&self) -> SerialConfig {
        SerialConfig {
            baud_rate: self.baud,
            ..SerialConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Serial port name, or unix:<path> for a simulator socket.
    #[arg(env = "TRAFFICLINK_PORT")]
    pub endpoint: Endpoint,
    #[command(flatten)]
    pub serial: SerialArgs,
    /// Exit after N decoded records.
    #[arg(long)]
    pub count: Option<usize>,
    /// When GreenBlink in a record is applied.
    #[arg(long, value_enum, default_value = "normal-mode-only")]
    pub blink_policy: BlinkPolicyArg,
}

#[derive(Args, Debug)]
pub struct ModeArgs {
    /// Serial port name, or unix:<path> for a simulator socket.
    #[arg(env = "TRAFFICLINK_PORT")]
    pub endpoint: Endpoint,
    /// Modes to send, in order: normal, red-only, all-off, all-blink.
    #[arg(required = true, num_args = 1..)]
    pub modes: Vec<Mode>,
    #[command(flatten)]
    pub serial: SerialArgs,
    /// Copies of each mode command written per send (1-3).
    #[arg(long, default_value_t = trafficlink_device::DEFAULT_MODE_REPEATS)]
    pub repeats: u8,
    /// What a repeat of the last sent mode does.
    #[arg(long, value_enum, default_value = "ignore")]
    pub repeat_policy: RepeatPolicyArg,
    /// How long to wait for the device's first status line before sending
    /// (e.g. 3s, 500ms). Boards reset when the port opens.
    #[arg(long, default_value = "3s", value_parser = parse_duration)]
    pub ready_timeout: Duration,
}

#[derive(Args, Debug)]
pub struct DurationsArgs {
    /// Serial port name, or unix:<path> for a simulator socket.
    #[arg(env = "TRAFFICLINK_PORT")]
    pub endpoint: Endpoint,
    #[command(flatten)]
    pub serial: SerialArgs,
    /// Red phase in milliseconds.
    #[arg(long)]
    pub red: u32,
    /// Yellow phase in milliseconds.
    #[arg(long)]
    pub yellow: u32,
    /// Green phase in milliseconds.
    #[arg(long)]
    pub green: u32,
    /// How long to wait for the device's first status line before sending.
    #[arg(long, default_value = "3s", value_parser = parse_duration)]
    pub ready_timeout: Duration,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Status line period (e.g. 200ms, 1s).
    #[arg(long, default_value = "200ms", value_parser = parse_duration)]
    pub interval: Duration,
    /// Reported brightness.
    #[arg(long, default_value_t = 255)]
    pub brightness: u8,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum BlinkPolicyArg {
    NormalModeOnly,
    WhenPresent,
}

impl From<BlinkPolicyArg> for BlinkMergePolicy {
    fn from(arg: BlinkPolicyArg) -> Self {
        match arg {
            BlinkPolicyArg::NormalModeOnly => BlinkMergePolicy::NormalModeOnly,
            BlinkPolicyArg::WhenPresent => BlinkMergePolicy::WhenPresent,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum RepeatPolicyArg {
    Ignore,
    RevertToNormal,
    Retransmit,
}

impl From<RepeatPolicyArg> for RepeatModePolicy {
    fn from(arg: RepeatPolicyArg) -> Self {
        match arg {
            RepeatPolicyArg::Ignore => RepeatModePolicy::Ignore,
            RepeatPolicyArg::RevertToNormal => RepeatModePolicy::RevertToNormal,
            RepeatPolicyArg::Retransmit => RepeatModePolicy::Retransmit,
        }
    }
}

/// Parse `500ms`, `3s`, or a bare number of milliseconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let (digits, unit) = match input.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => input.split_at(idx),
        None => (input, "ms"),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration {input:?}"))?;
    let duration = match unit {
        "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        _ => return Err(format!("invalid duration unit in {input:?} (use ms or s)")),
    };
    if duration.is_zero() {
        return Err(format!("duration {input:?} must be greater than zero"));
    }
    Ok(duration)
}

pub fn link_config(serial: &SerialArgs) -> LinkConfig {
    LinkConfig {
        serial: serial.config(),
        ..LinkConfig::default()
    }
}

/// Wait until the link has decoded at least one record.
pub fn wait_until_ready(link: &DeviceLink<LinkStream>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while link.decoded_count() == 0 {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(20));
    }
    true
}

pub fn install_ctrlc_handler(
    running: Arc<AtomicBool>,
    on_stop: impl Fn() + Send + 'static,
) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
        on_stop();
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
