//! Time-related utilities with clock abstraction for testability.

use chrono::{Local, NaiveDateTime};

/// Layout used inside chat lines: `[2024-05-01 12:30:00][alice]: hi`.
pub const CHAT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layout used as the prefix of every event log line.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Layout used to make per-run file names unique.
pub const FILE_STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Current wall-clock time in the server's local timezone
    fn now(&self) -> NaiveDateTime;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: NaiveDateTime,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    pub fn new(fixed_time: NaiveDateTime) -> Self {
        Self { fixed_time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.fixed_time
    }
}

/// Render a time the way chat lines show it
pub fn format_chat_timestamp(time: NaiveDateTime) -> String {
    time.format(CHAT_TIMESTAMP_FORMAT).to_string()
}

/// Render a time as a compact stamp suitable for file names
pub fn format_file_stamp(time: NaiveDateTime) -> String {
    time.format(FILE_STAMP_FORMAT).to_string()
}
