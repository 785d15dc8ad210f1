use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::config::BlinkMergePolicy;
use crate::error::DecodeError;

/// Operating mode of the traffic light.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    /// Regular red → yellow → green cycle.
    #[default]
    Normal,
    #[serde(rename = "Red Only")]
    RedOnly,
    #[serde(rename = "All Off")]
    AllOff,
    #[serde(rename = "All Blink")]
    AllBlink,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Normal, Mode::RedOnly, Mode::AllOff, Mode::AllBlink];

    /// Name used on the wire, in both directions.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Normal => "Normal",
            Mode::RedOnly => "Red Only",
            Mode::AllOff => "All Off",
            Mode::AllBlink => "All Blink",
        }
    }

    /// Exact wire name lookup.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == name)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lenient parse for human input: case, spaces, `-` and `_` are ignored, so
/// `red-only`, `RedOnly` and `Red Only` all name [`Mode::RedOnly`].
impl FromStr for Mode {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let key: String = input
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "normal" => Ok(Mode::Normal),
            "redonly" => Ok(Mode::RedOnly),
            "alloff" => Ok(Mode::AllOff),
            "allblink" => Ok(Mode::AllBlink),
            _ => Err(format!(
                "unknown mode {input:?} (expected normal, red-only, all-off or all-blink)"
            )),
        }
    }
}

/// Which lamp the device reports as lit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Light {
    #[default]
    Off,
    Red,
    Yellow,
    Green,
}

impl Light {
    pub fn as_str(self) -> &'static str {
        match self {
            Light::Off => "Off",
            Light::Red => "Red",
            Light::Yellow => "Yellow",
            Light::Green => "Green",
        }
    }

    /// Wire name lookup, including firmware spellings: boards wired with a
    /// blue lamp report `Blue`/`Blinking` for the green slot, and blink mode
    /// reports `All Blinking`, which has no single current light.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "Off" | "All Blinking" => Some(Light::Off),
            "Red" => Some(Light::Red),
            "Yellow" => Some(Light::Yellow),
            "Green" | "Blue" | "Blinking" => Some(Light::Green),
            _ => None,
        }
    }
}

impl fmt::Display for Light {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last known state of the device.
///
/// Starts as `{Normal, Off, false, 0}` and is only ever replaced as a whole
/// by a successfully decoded status record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    pub mode: Mode,
    pub current_light: Light,
    pub green_blink: bool,
    pub brightness: u8,
}

impl DeviceState {
    /// The state that results from applying `record` on top of `self`.
    ///
    /// Fields missing from the record keep their previous value. Nothing is
    /// applied unless every present field is valid.
    pub fn merged(
        &self,
        record: &StatusRecord,
        policy: BlinkMergePolicy,
    ) -> Result<DeviceState, DecodeError> {
        let record_mode = record
            .mode
            .as_deref()
            .map(|name| Mode::from_wire(name).ok_or_else(|| DecodeError::UnknownMode(name.into())))
            .transpose()?;
        let light = record
            .light
            .as_deref()
            .map(|name| {
                Light::from_wire(name).ok_or_else(|| DecodeError::UnknownLight(name.into()))
            })
            .transpose()?;

        let green_blink = match (policy, record.green_blink) {
            (_, None) => self.green_blink,
            (BlinkMergePolicy::WhenPresent, Some(flag)) => flag,
            (BlinkMergePolicy::NormalModeOnly, Some(flag)) if record_mode == Some(Mode::Normal) => {
                flag
            }
            (BlinkMergePolicy::NormalModeOnly, Some(_)) => self.green_blink,
        };

        Ok(DeviceState {
            mode: record_mode.unwrap_or(self.mode),
            current_light: light.unwrap_or(self.current_light),
            green_blink,
            brightness: record.brightness.unwrap_or(self.brightness),
        })
    }
}

/// One JSON status line as the device prints it.
///
/// Field order matches the firmware's output. Keys the host does not use
/// (`Red`, `Yellow`, `RedBlink`, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    #[serde(rename = "Light", default, skip_serializing_if = "Option::is_none")]
    pub light: Option<String>,
    #[serde(rename = "Mode", default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(rename = "Brightness", default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    #[serde(
        rename = "GreenBlink",
        alias = "BlueBlink",
        default,
        deserialize_with = "blink_flag",
        serialize_with = "blink_flag_as_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub green_blink: Option<bool>,
}

impl StatusRecord {
    /// Parse one trimmed line.
    pub fn parse(line: &str) -> Result<Self, DecodeError> {
        if !(line.starts_with('{') && line.ends_with('}')) {
            return Err(DecodeError::NotARecord);
        }
        Ok(serde_json::from_str(line)?)
    }

    /// Serialize the way the firmware prints it (flags as `0`/`1`).
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Firmware builds send the flag as `0`/`1`; hosts may send `true`/`false`.
fn blink_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(u64),
    }

    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Flag::Bool(flag)) => Ok(Some(flag)),
        Some(Flag::Int(0)) => Ok(Some(false)),
        Some(Flag::Int(1)) => Ok(Some(true)),
        Some(Flag::Int(other)) => Err(de::Error::custom(format!(
            "GreenBlink must be a boolean, 0 or 1, got {other}"
        ))),
    }
}

fn blink_flag_as_int<S>(flag: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match flag {
        Some(flag) => serializer.serialize_u8(u8::from(*flag)),
        None => serializer.serialize_none(),
    }
}
