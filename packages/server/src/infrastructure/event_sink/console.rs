//! Console EventSink: status lines and room lines go to stdout.

use std::{
    io::{self, Write},
    sync::Arc,
};

use agora_shared::time::{Clock, SystemClock, format_time_of_day};

use crate::domain::EventSink;

/// Writes events to stdout, prefixing status lines with the local time of day.
///
/// Room lines already carry their broadcast time and are printed as-is.
pub struct ConsoleEventSink {
    clock: Arc<dyn Clock>,
}

impl ConsoleEventSink {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn render_status(&self, line: &str) -> String {
        format!("{} {}", format_time_of_day(self.clock.now_millis()), line)
    }

    fn print(&self, line: &str) {
        // stdout may be closed when detached; display is best-effort.
        let _ = writeln!(io::stdout().lock(), "{}", line);
    }
}

impl Default for ConsoleEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for ConsoleEventSink {
    fn on_status(&self, line: &str) {
        self.print(&self.render_status(line));
    }

    fn on_room_message(&self, line: &str) {
        self.print(line);
    }
}
