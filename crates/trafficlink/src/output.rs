use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use trafficlink_device::{Command, DeviceState, SendOutcome};
use trafficlink_transport::PortSummary;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct StateOutput<'a> {
    endpoint: &'a str,
    #[serde(flatten)]
    state: &'a DeviceState,
    timestamp: String,
}

/// One decoded device state. `raw` is the line it came from.
pub fn print_state(state: &DeviceState, raw: &str, endpoint: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = StateOutput {
                endpoint,
                state,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["MODE", "LIGHT", "GREEN BLINK", "BRIGHTNESS"])
                .add_row(vec![
                    state.mode.to_string(),
                    state.current_light.to_string(),
                    yes_no(state.green_blink).to_string(),
                    state.brightness.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "mode={} light={} green_blink={} brightness={}",
                state.mode, state.current_light, state.green_blink, state.brightness
            );
        }
        OutputFormat::Raw => print_raw(raw),
    }
}

#[derive(Serialize)]
struct SendOutput<'a> {
    endpoint: &'a str,
    command: String,
    outcome: &'static str,
}

pub fn print_send(command: &Command, outcome: SendOutcome, endpoint: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SendOutput {
                endpoint,
                command: command.to_string(),
                outcome: outcome.as_str(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENDPOINT", "COMMAND", "OUTCOME"])
                .add_row(vec![
                    endpoint.to_string(),
                    command.to_string(),
                    outcome.as_str().to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("endpoint={endpoint} command=\"{command}\" outcome={}", outcome.as_str());
        }
        OutputFormat::Raw => print_raw(&command.to_string()),
    }
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
    description: Option<&'a str>,
}

pub fn print_ports(ports: &[PortSummary], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<PortOutput<'_>> = ports
                .iter()
                .map(|port| PortOutput {
                    name: &port.name,
                    kind: port.kind,
                    description: port.description.as_deref(),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "TYPE", "DESCRIPTION"]);
            for port in ports {
                table.add_row(vec![
                    port.name.clone(),
                    port.kind.to_string(),
                    port.description.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for port in ports {
                match &port.description {
                    Some(description) => println!("{} ({}, {description})", port.name, port.kind),
                    None => println!("{} ({})", port.name, port.kind),
                }
            }
        }
        OutputFormat::Raw => {
            for port in ports {
                print_raw(&port.name);
            }
        }
    }
}

fn print_raw(line: &str) {
    let mut out = std::io::stdout();
    let _ = writeln!(out, "{line}");
    let _ = out.flush();
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
