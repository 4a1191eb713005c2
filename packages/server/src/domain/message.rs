//! Chat message model carried by client frames.

use serde::{Deserialize, Serialize};

/// Kind of a client frame. Closed set: anything else on the wire is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Chat text to relay to the whole room
    Text,
    /// The client is leaving
    Logout,
    /// "Who is in?" request answered to the sender only
    RosterQuery,
}

/// A decoded client message. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: MessageKind,
    body: String,
}

impl Message {
    /// Create a new message
    pub fn new(kind: MessageKind, body: impl Into<String>) -> Self {
        Self {
            kind,
            body: body.into(),
        }
    }

    /// Create a chat text message
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(MessageKind::Text, body)
    }

    /// Create a logout message (empty body)
    pub fn logout() -> Self {
        Self::new(MessageKind::Logout, String::new())
    }

    /// Create a roster query message (empty body)
    pub fn roster_query() -> Self {
        Self::new(MessageKind::RosterQuery, String::new())
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}
