//! Infrastructure layer: wire protocol, session registry and event sink implementations.

pub mod event_sink;
pub mod protocol;
pub mod registry;

pub use event_sink::{ChannelEventSink, ConsoleEventSink, SinkEvent};
pub use registry::ClientRegistry;
