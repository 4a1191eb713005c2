//! Channel EventSink: forwards events to an unbounded mpsc channel.
//!
//! The core never blocks on the consumer; a GUI pane or log writer drains the
//! receiver at its own pace.

use tokio::sync::mpsc;

use crate::domain::EventSink;

/// One event emitted by the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Status(String),
    Room(String),
}

/// EventSink backed by an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelEventSink {
    /// Create a sink together with the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn forward(&self, event: SinkEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Event receiver dropped, discarding event");
        }
    }
}

impl EventSink for ChannelEventSink {
    fn on_status(&self, line: &str) {
        self.forward(SinkEvent::Status(line.to_string()));
    }

    fn on_room_message(&self, line: &str) {
        self.forward(SinkEvent::Room(line.to_string()));
    }
}
