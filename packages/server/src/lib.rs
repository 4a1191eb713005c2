//! Multi-client broadcast chat server over TCP.
//!
//! Clients connect, announce a display name on the first line and then send
//! newline-delimited JSON frames. Chat text is relayed to every connected
//! client; roster queries are answered to the requester only.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;

pub use config::ServerConfig;
pub use ui::{Server, StopHandle};
