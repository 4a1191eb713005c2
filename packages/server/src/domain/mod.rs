//! Domain layer: message model, session identity and the event sink contract.
//!
//! 通信手段（TCP, 行フレーミング）の詳細はここには含めず、
//! Infrastructure 層と UI 層が実装します。

pub mod error;
pub mod event;
pub mod message;
pub mod session;

pub use error::{ConfigError, HandshakeError, ProtocolError, ServerError, WriteFailure};
pub use event::EventSink;
pub use message::{Message, MessageKind};
pub use session::{ClientSession, DisconnectReason, SessionId, SessionIdGenerator, Timestamp};
