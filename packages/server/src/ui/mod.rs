//! TCP chat server: accept loop, handshake and per-connection read loops.

mod handshake;
mod listener;
mod session;
pub mod signal;
pub mod state;

pub use handshake::read_handshake;
pub use listener::{Server, StopHandle};
pub use session::run_session;
