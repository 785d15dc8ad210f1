use std::time::Duration;

/// Default limit for a single line: far above the largest status record.
pub const DEFAULT_MAX_LINE_LEN: usize = 4 * 1024;

/// Configuration for line readers and writers.
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Longest pending line, in bytes, before it is dropped. Default: 4 KiB.
    pub max_line_len: usize,
    /// Read timeout applied to the stream. Default: none (block).
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to the stream. Default: none (block).
    pub write_timeout: Option<Duration>,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
