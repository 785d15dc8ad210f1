use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CommandError;
use crate::state::Mode;

/// Phase lengths of the normal cycle, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Durations {
    pub red_ms: u32,
    pub yellow_ms: u32,
    pub green_ms: u32,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            red_ms: 2000,
            yellow_ms: 500,
            green_ms: 2000,
        }
    }
}

/// A command for the device.
///
/// `Display` gives the wire form without the trailing newline:
/// `M:Red Only`, `D:1000,300,1000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Command {
    SetMode(Mode),
    SetDurations(Durations),
}

impl Command {
    pub fn durations(red_ms: u32, yellow_ms: u32, green_ms: u32) -> Self {
        Command::SetDurations(Durations {
            red_ms,
            yellow_ms,
            green_ms,
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetMode(mode) => write!(f, "M:{mode}"),
            Command::SetDurations(d) => write!(f, "D:{},{},{}", d.red_ms, d.yellow_ms, d.green_ms),
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if let Some(name) = line.strip_prefix("M:") {
            let name = name.trim();
            return Mode::from_wire(name)
                .map(Command::SetMode)
                .ok_or_else(|| CommandError::UnknownMode(name.to_string()));
        }
        if let Some(values) = line.strip_prefix("D:") {
            let parsed: Vec<u32> = values
                .split(',')
                .map(|v| v.trim().parse::<u32>())
                .collect::<Result<_, _>>()
                .map_err(|_| CommandError::InvalidDurations(values.to_string()))?;
            return match parsed.as_slice() {
                [red, yellow, green] => Ok(Command::durations(*red, *yellow, *green)),
                _ => Err(CommandError::InvalidDurations(values.to_string())),
            };
        }
        Err(CommandError::Unrecognized(line.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form() {
        assert_eq!(Command::SetMode(Mode::RedOnly).to_string(), "M:Red Only");
        assert_eq!(Command::SetMode(Mode::AllBlink).to_string(), "M:All Blink");
        assert_eq!(Command::durations(1000, 300, 1000).to_string(), "D:1000,300,1000");
        assert_eq!(Command::durations(0, 0, 0).to_string(), "D:0,0,0");
    }

    #[test]
    fn parses_device_input() {
        assert_eq!(
            "M:All Off\r\n".parse::<Command>().unwrap(),
            Command::SetMode(Mode::AllOff)
        );
        assert_eq!(
            "D:2000, 500 ,2000".parse::<Command>().unwrap(),
            Command::durations(2000, 500, 2000)
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            "M:Sideways".parse::<Command>(),
            Err(CommandError::UnknownMode("Sideways".into()))
        );
        assert!(matches!(
            "D:1,2".parse::<Command>(),
            Err(CommandError::InvalidDurations(_))
        ));
        assert!(matches!(
            "D:1,2,-3".parse::<Command>(),
            Err(CommandError::InvalidDurations(_))
        ));
        assert!(matches!(
            "hello".parse::<Command>(),
            Err(CommandError::Unrecognized(_))
        ));
    }
}
