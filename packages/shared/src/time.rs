//! Time-related utilities with clock abstraction for testability.

use chrono::{DateTime, Local, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get current Unix timestamp (milliseconds)
    fn now_millis(&self) -> i64;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        current_timestamp()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: i64,
}

impl FixedClock {
    /// Create a new fixed clock with the given timestamp
    pub fn new(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: fixed_time_millis,
        }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.fixed_time
    }
}

/// Get current Unix timestamp (milliseconds)
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp_millis()
}

fn to_local(timestamp_millis: i64) -> DateTime<Local> {
    // Out-of-range values collapse to the epoch.
    DateTime::<Utc>::from_timestamp_millis(timestamp_millis)
        .unwrap_or_default()
        .with_timezone(&Local)
}

/// Format a timestamp as local wall-clock time, e.g. `14:03:27`.
///
/// Used as the prefix of room messages and status lines.
pub fn format_time_of_day(timestamp_millis: i64) -> String {
    to_local(timestamp_millis).format("%H:%M:%S").to_string()
}

/// Format a timestamp as a full local date, e.g. `Mon Oct 19 14:03:27 2026`.
///
/// Used for the "since" column of the roster listing.
pub fn format_since(timestamp_millis: i64) -> String {
    to_local(timestamp_millis)
        .format("%a %b %d %H:%M:%S %Y")
        .to_string()
}
