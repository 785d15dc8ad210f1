use std::time::Duration;

/// Baud rate the traffic-light firmware opens its UART with.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Serial line settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Line speed. Default: 9600.
    pub baud_rate: u32,
    /// Driver poll timeout. Reads retry past it; it only bounds how long a
    /// single blocking syscall waits.
    pub poll_timeout: Duration,
    /// Assert DTR/RTS after opening. Most Arduino boards reset on DTR.
    pub assert_control_lines: bool,
    /// Time to wait after opening before the first write.
    pub settle_delay: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            poll_timeout: Duration::from_millis(500),
            assert_control_lines: true,
            settle_delay: Duration::from_millis(150),
        }
    }
}
