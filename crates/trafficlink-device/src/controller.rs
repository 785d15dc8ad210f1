use std::time::Duration;

use tracing::debug;

use crate::command::{Command, Durations};
use crate::state::{Mode, StatusRecord};

/// Settings for a simulated controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Initial phase lengths. Default: 2000 / 500 / 2000 ms.
    pub durations: Durations,
    /// Green blink phase at the end of each cycle. Default: 1000 ms.
    pub green_blink_ms: u32,
    /// Reported brightness. Default: 255.
    pub brightness: u8,
    /// A mode command identical to the previous one and arriving within this
    /// window is a redundant copy and does not toggle again. Default: 100 ms.
    pub repeat_window: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            durations: Durations::default(),
            green_blink_ms: 1000,
            brightness: 255,
            repeat_window: Duration::from_millis(100),
        }
    }
}

/// Protocol-level model of the traffic-light firmware.
///
/// Time is passed in by the caller as the elapsed time since some fixed
/// start, so the model itself never sleeps or reads a clock.
#[derive(Debug, Clone)]
pub struct TrafficController {
    mode: Mode,
    durations: Durations,
    green_blink_ms: u32,
    brightness: u8,
    cycle_start: Duration,
    repeat_window: Duration,
    last_mode_command: Option<(Mode, Duration)>,
}

impl TrafficController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            mode: Mode::Normal,
            durations: config.durations,
            green_blink_ms: config.green_blink_ms,
            brightness: config.brightness,
            cycle_start: Duration::ZERO,
            repeat_window: config.repeat_window,
            last_mode_command: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn durations(&self) -> Durations {
        self.durations
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    /// Apply a command received at `now`.
    ///
    /// Mode commands toggle: asking for the active mode returns to `Normal`,
    /// and entering `Normal` restarts the cycle from red. Back-to-back copies
    /// of one mode command count once.
    ///
    /// Unlike the firmware, which ignores `M:Normal`, this model honors it
    /// and switches back to `Normal` from any other mode. Hosts that revert
    /// with an explicit `M:Normal` (see `RepeatModePolicy::RevertToNormal`)
    /// rely on that here.
    pub fn apply(&mut self, command: Command, now: Duration) {
        match command {
            Command::SetMode(requested) => {
                let previous = self.last_mode_command.replace((requested, now));
                if let Some((mode, at)) = previous {
                    if mode == requested && now.saturating_sub(at) < self.repeat_window {
                        debug!(mode = %requested, "absorbed repeated mode command");
                        return;
                    }
                }
                let next = if requested == self.mode {
                    Mode::Normal
                } else {
                    requested
                };
                if next == Mode::Normal && self.mode != Mode::Normal {
                    self.cycle_start = now;
                }
                debug!(from = %self.mode, to = %next, "controller mode change");
                self.mode = next;
            }
            Command::SetDurations(durations) => {
                debug!(?durations, "controller durations updated");
                self.durations = durations;
            }
        }
    }

    /// Light name and green blink flag at `now`.
    fn light_at(&self, now: Duration) -> (&'static str, bool) {
        match self.mode {
            Mode::RedOnly => ("Red", false),
            Mode::AllOff => ("Off", false),
            Mode::AllBlink => ("All Blinking", false),
            Mode::Normal => {
                let red = u64::from(self.durations.red_ms);
                let yellow = red + u64::from(self.durations.yellow_ms);
                let green = yellow + u64::from(self.durations.green_ms);
                let cycle = green + u64::from(self.green_blink_ms);
                if cycle == 0 {
                    return ("Off", false);
                }
                let elapsed = now.saturating_sub(self.cycle_start).as_millis();
                let t = u64::try_from(elapsed).unwrap_or(u64::MAX) % cycle;
                if t < red {
                    ("Red", false)
                } else if t < yellow {
                    ("Yellow", false)
                } else if t < green {
                    ("Green", false)
                } else {
                    ("Green", true)
                }
            }
        }
    }

    /// The status record the firmware would print at `now`.
    pub fn status_at(&self, now: Duration) -> StatusRecord {
        let (light, green_blink) = self.light_at(now);
        StatusRecord {
            light: Some(light.to_string()),
            mode: Some(self.mode.as_str().to_string()),
            brightness: Some(self.brightness),
            green_blink: Some(green_blink),
        }
    }

    /// [`status_at`](Self::status_at) as a wire line, without the newline.
    pub fn status_line(&self, now: Duration) -> String {
        self.status_at(now).to_line()
    }
}

impl Default for TrafficController {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlinkMergePolicy;
    use crate::state::{DeviceState, Light};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn normal_cycle_phases() {
        let controller = TrafficController::default();
        let light = |t| controller.status_at(ms(t)).light.unwrap();
        assert_eq!(light(0), "Red");
        assert_eq!(light(1999), "Red");
        assert_eq!(light(2000), "Yellow");
        assert_eq!(light(2500), "Green");
        assert_eq!(light(4499), "Green");
        assert_eq!(controller.status_at(ms(4500)).green_blink, Some(true));
        assert_eq!(controller.status_at(ms(4499)).green_blink, Some(false));
        assert_eq!(light(5500), "Red");
    }

    #[test]
    fn mode_commands_toggle() {
        let mut controller = TrafficController::default();
        controller.apply(Command::SetMode(Mode::RedOnly), ms(1000));
        assert_eq!(controller.mode(), Mode::RedOnly);
        assert_eq!(controller.status_at(ms(3000)).light.as_deref(), Some("Red"));

        controller.apply(Command::SetMode(Mode::AllBlink), ms(2000));
        assert_eq!(controller.mode(), Mode::AllBlink);

        controller.apply(Command::SetMode(Mode::AllBlink), ms(3000));
        assert_eq!(controller.mode(), Mode::Normal);

        controller.apply(Command::SetMode(Mode::Normal), ms(4000));
        assert_eq!(controller.mode(), Mode::Normal);
    }

    #[test]
    fn explicit_normal_leaves_any_mode() {
        let mut controller = TrafficController::default();
        controller.apply(Command::SetMode(Mode::AllOff), ms(1000));
        assert_eq!(controller.mode(), Mode::AllOff);

        controller.apply(Command::SetMode(Mode::Normal), ms(2000));
        assert_eq!(controller.mode(), Mode::Normal);
        assert_eq!(controller.status_at(ms(2001)).light.as_deref(), Some("Red"));
    }

    #[test]
    fn redundant_copies_count_once() {
        let mut controller = TrafficController::default();
        for offset in [0, 1, 2] {
            controller.apply(Command::SetMode(Mode::RedOnly), ms(500 + offset));
        }
        assert_eq!(controller.mode(), Mode::RedOnly);

        controller.apply(Command::SetMode(Mode::RedOnly), ms(900));
        assert_eq!(controller.mode(), Mode::Normal);
    }

    #[test]
    fn returning_to_normal_restarts_cycle() {
        let mut controller = TrafficController::default();
        controller.apply(Command::SetMode(Mode::AllOff), ms(1000));
        controller.apply(Command::SetMode(Mode::AllOff), ms(7000));
        assert_eq!(controller.status_at(ms(7000)).light.as_deref(), Some("Red"));
        assert_eq!(controller.status_at(ms(9000)).light.as_deref(), Some("Yellow"));
    }

    #[test]
    fn durations_reshape_cycle() {
        let mut controller = TrafficController::default();
        controller.apply(Command::durations(100, 100, 100), ms(0));
        assert_eq!(controller.durations(), Durations { red_ms: 100, yellow_ms: 100, green_ms: 100 });
        assert_eq!(controller.status_at(ms(150)).light.as_deref(), Some("Yellow"));
        assert_eq!(controller.status_at(ms(250)).light.as_deref(), Some("Green"));
    }

    #[test]
    fn status_line_decodes_on_host() {
        let mut controller = TrafficController::default();
        controller.set_brightness(42);
        let line = controller.status_line(ms(4600));
        assert_eq!(
            line,
            r#"{"Light":"Green","Mode":"Normal","Brightness":42,"GreenBlink":1}"#
        );

        let record = StatusRecord::parse(&line).unwrap();
        let state = DeviceState::default()
            .merged(&record, BlinkMergePolicy::NormalModeOnly)
            .unwrap();
        assert_eq!(state.current_light, Light::Green);
        assert!(state.green_blink);
        assert_eq!(state.brightness, 42);
    }
}
