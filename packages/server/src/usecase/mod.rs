//! UseCase layer: session lifecycle, broadcast fan-out and roster queries.

pub mod broadcast;
pub mod connect_session;
pub mod disconnect_session;
pub mod roster;

pub use broadcast::{BroadcastOutcome, Broadcaster};
pub use connect_session::ConnectSessionUseCase;
pub use disconnect_session::DisconnectSessionUseCase;
pub use roster::RosterQueryUseCase;
