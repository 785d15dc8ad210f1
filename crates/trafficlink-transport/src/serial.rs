use serialport::{DataBits, FlowControl, Parity, SerialPortType, StopBits};
use tracing::{debug, info};

use crate::config::SerialConfig;
use crate::error::{Result, TransportError};
use crate::stream::LinkStream;

/// Open a serial port as 8N1 without flow control.
pub fn open_serial(port_name: &str, config: &SerialConfig) -> Result<LinkStream> {
    debug!(port = port_name, baud = config.baud_rate, "opening serial port");

    let mut port = serialport::new(port_name, config.baud_rate)
        .timeout(config.poll_timeout)
        .data_bits(DataBits::Eight)
        .stop_bits(StopBits::One)
        .parity(Parity::None)
        .flow_control(FlowControl::None)
        .open()
        .map_err(|source| TransportError::Open {
            port: port_name.to_string(),
            source,
        })?;

    if config.assert_control_lines {
        let _ = port.write_data_terminal_ready(true);
        let _ = port.write_request_to_send(true);
    }
    if !config.settle_delay.is_zero() {
        std::thread::sleep(config.settle_delay);
    }
    // Drop boot banner bytes the board printed before we were listening.
    let _ = port.clear(serialport::ClearBuffer::Input);

    info!(port = port_name, baud = config.baud_rate, "serial port open");
    Ok(LinkStream::from_serial(port))
}

/// A serial port visible to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSummary {
    pub name: String,
    pub kind: &'static str,
    pub description: Option<String>,
}

/// List serial ports the OS reports.
pub fn available_ports() -> Result<Vec<PortSummary>> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    Ok(ports
        .into_iter()
        .map(|info| {
            let (kind, description) = describe(&info.port_type);
            PortSummary {
                name: info.port_name,
                kind,
                description,
            }
        })
        .collect())
}

fn describe(port_type: &SerialPortType) -> (&'static str, Option<String>) {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let label = match (&usb.manufacturer, &usb.product) {
                (Some(m), Some(p)) => format!("{m} {p}"),
                (Some(m), None) => m.clone(),
                (None, Some(p)) => p.clone(),
                (None, None) => format!("{:04x}:{:04x}", usb.vid, usb.pid),
            };
            ("usb", Some(label))
        }
        SerialPortType::PciPort => ("pci", None),
        SerialPortType::BluetoothPort => ("bluetooth", None),
        SerialPortType::Unknown => ("unknown", None),
    }
}
