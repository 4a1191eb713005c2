//! Error types for the chat server core.

use std::{io, time::Duration};

use thiserror::Error;

/// Decoding errors for client frames
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Truncated record, unknown kind tag, or a frame/body over the configured limit
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("cannot encode message: {0}")]
    Encode(String),
}

/// Settings that would make the server unusable
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    /// Escaped bodies within `max_body_len` would not fit in one line
    #[error(
        "max frame length {max_frame_len} is too small for max body length {max_body_len} (needs at least {required})"
    )]
    FrameTooSmall {
        max_frame_len: usize,
        max_body_len: usize,
        required: usize,
    },
}

/// Errors while reading the display-name handshake.
///
/// All of them are per-connection: the connection is dropped and nothing is registered.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("no display name received within {0:?}")]
    Timeout(Duration),

    #[error("empty display name")]
    Empty,

    #[error(transparent)]
    Malformed(#[from] ProtocolError),

    #[error("read error during handshake: {0}")]
    Io(#[from] io::Error),
}

/// A write to one session failed. The session is evicted, nothing else is affected.
#[derive(Debug, Error)]
pub enum WriteFailure {
    /// The session's connection was already closed by the server
    #[error("connection already closed")]
    Closed,

    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    #[error("write error: {0}")]
    Io(#[from] io::Error),
}

/// Server-level errors
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound; the accept loop never starts
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The listening socket itself failed; the accept loop stopped
    #[error("accept loop failed: {0}")]
    AcceptLoop(#[source] io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
