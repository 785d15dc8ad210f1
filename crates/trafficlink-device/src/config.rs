use std::time::Duration;

use trafficlink_frame::LineConfig;
use trafficlink_transport::SerialConfig;

/// Default number of times a mode command is written back-to-back.
pub const DEFAULT_MODE_REPEATS: u8 = 2;

/// Upper bound for [`LinkConfig::mode_repeats`].
pub const MAX_MODE_REPEATS: u8 = 3;

/// Minimum spacing between two transmitted duration commands.
pub const DEFAULT_DURATION_INTERVAL: Duration = Duration::from_millis(300);

/// How `GreenBlink` in a status record is merged into the held state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlinkMergePolicy {
    /// Only when the record also says `"Mode":"Normal"`.
    #[default]
    NormalModeOnly,
    /// Whenever the field is present.
    WhenPresent,
}

/// What [`DeviceLink::send_mode_with`](crate::DeviceLink::send_mode_with)
/// does when asked for the mode that was last sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RepeatModePolicy {
    /// Nothing is written.
    #[default]
    Ignore,
    /// `Normal` is sent instead, turning the active mode off.
    RevertToNormal,
    /// The mode is written again.
    Retransmit,
}

/// Configuration for a device link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Copies of each mode command written per send, clamped to 1..=3.
    /// Default: 2.
    pub mode_repeats: u8,
    /// Rate limit window for duration commands. Default: 300 ms.
    pub duration_interval: Duration,
    /// Default: [`BlinkMergePolicy::NormalModeOnly`].
    pub blink_policy: BlinkMergePolicy,
    /// Line framing limits and stream timeouts.
    pub line: LineConfig,
    /// Serial settings, used when the endpoint is a serial port.
    pub serial: SerialConfig,
}

impl LinkConfig {
    /// `mode_repeats` clamped to its valid range.
    pub fn effective_mode_repeats(&self) -> u8 {
        self.mode_repeats.clamp(1, MAX_MODE_REPEATS)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            mode_repeats: DEFAULT_MODE_REPEATS,
            duration_interval: DEFAULT_DURATION_INTERVAL,
            blink_policy: BlinkMergePolicy::default(),
            line: LineConfig::default(),
            serial: SerialConfig::default(),
        }
    }
}
