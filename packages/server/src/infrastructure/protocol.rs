//! Wire protocol for client frames.
//!
//! ## Frame format
//!
//! Every record is one UTF-8 line terminated by `\n` (a `\r` before it is tolerated).
//!
//! ```text
//! alice\n                                      <- handshake: display name, sent once
//! {"kind":"text","body":"hello"}\n             <- message frames
//! {"kind":"roster_query","body":""}\n
//! {"kind":"logout","body":""}\n
//! ```
//!
//! The server answers with plain text lines (broadcast lines and roster lines).

use std::{borrow::Cow, io};

use serde::{Deserialize, Serialize};
use tokio_util::codec::LinesCodecError;

use crate::domain::{ConfigError, Message, MessageKind, ProtocolError};

/// Default maximum length of a message body, in bytes
pub const DEFAULT_MAX_BODY_LEN: usize = 4 * 1024;

/// Room for the JSON envelope around the body (`{"kind":"roster_query","body":""}` plus slack)
const ENVELOPE_OVERHEAD: usize = 64;

/// Worst-case growth of one body byte once JSON-escaped (`\u001f`)
const MAX_ESCAPE_EXPANSION: usize = 6;

/// Smallest line limit that still fits every body of `max_body_len` bytes after escaping
pub const fn required_frame_len(max_body_len: usize) -> usize {
    max_body_len
        .saturating_mul(MAX_ESCAPE_EXPANSION)
        .saturating_add(ENVELOPE_OVERHEAD)
}

/// Size limits applied while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    pub max_frame_len: usize,
    pub max_body_len: usize,
}

impl FrameLimits {
    /// Limits for `max_body_len`, with the line limit derived from it
    pub fn for_body_len(max_body_len: usize) -> Self {
        Self {
            max_frame_len: required_frame_len(max_body_len),
            max_body_len,
        }
    }

    /// Check that every body within `max_body_len` fits in one line
    ///
    /// # Errors
    ///
    /// `ConfigError::FrameTooSmall` if `max_frame_len` leaves no room for escaping.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = required_frame_len(self.max_body_len);
        if self.max_frame_len < required {
            return Err(ConfigError::FrameTooSmall {
                max_frame_len: self.max_frame_len,
                max_body_len: self.max_body_len,
                required,
            });
        }
        Ok(())
    }
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self::for_body_len(DEFAULT_MAX_BODY_LEN)
    }
}

/// JSON shape of one client frame
#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    kind: MessageKind,
    #[serde(default)]
    body: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            kind: message.kind(),
            body: message.body().to_string(),
        }
    }
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        Message::new(wire.kind, wire.body)
    }
}

/// Encode a message as one newline-terminated frame.
///
/// # Errors
///
/// `ProtocolError::Encode` if serialization fails.
pub fn encode(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = serde_json::to_vec(&WireMessage::from(message))
        .map_err(|e| ProtocolError::Encode(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode one frame using the default limits.
pub fn decode(frame: &[u8]) -> Result<Message, ProtocolError> {
    decode_with_limits(frame, &FrameLimits::default())
}

/// Decode one frame, with or without its trailing line terminator.
///
/// Pure: nothing outside the returned value is touched on failure.
pub fn decode_with_limits(frame: &[u8], limits: &FrameLimits) -> Result<Message, ProtocolError> {
    let record = strip_terminator(frame);

    if record.len() > limits.max_frame_len {
        return Err(ProtocolError::MalformedFrame(format!(
            "frame of {} bytes exceeds maximum of {} bytes",
            record.len(),
            limits.max_frame_len
        )));
    }
    if record.contains(&b'\n') {
        return Err(ProtocolError::MalformedFrame(
            "more than one record in frame".to_string(),
        ));
    }

    let wire: WireMessage = serde_json::from_slice(record)
        .map_err(|e| ProtocolError::MalformedFrame(format!("invalid record: {}", e)))?;

    if wire.body.len() > limits.max_body_len {
        return Err(ProtocolError::MalformedFrame(format!(
            "body of {} bytes exceeds maximum of {} bytes",
            wire.body.len(),
            limits.max_body_len
        )));
    }

    Ok(Message::from(wire))
}

fn strip_terminator(frame: &[u8]) -> &[u8] {
    let frame = frame.strip_suffix(b"\n").unwrap_or(frame);
    frame.strip_suffix(b"\r").unwrap_or(frame)
}

/// Collapse embedded line breaks so a rendered line stays a single frame.
pub fn to_single_line(text: &str) -> Cow<'_, str> {
    if text.contains(['\n', '\r']) {
        Cow::Owned(text.replace(['\n', '\r'], " "))
    } else {
        Cow::Borrowed(text)
    }
}

/// Failure while reading a line from a connection
#[derive(Debug)]
pub enum FrameReadError {
    /// The line itself is unacceptable (too long, not UTF-8)
    Malformed(ProtocolError),
    /// The stream failed
    Io(io::Error),
}

impl From<LinesCodecError> for FrameReadError {
    fn from(error: LinesCodecError) -> Self {
        match error {
            LinesCodecError::MaxLineLengthExceeded => FrameReadError::Malformed(
                ProtocolError::MalformedFrame("line exceeds maximum frame length".to_string()),
            ),
            LinesCodecError::Io(e) if e.kind() == io::ErrorKind::InvalidData => {
                FrameReadError::Malformed(ProtocolError::MalformedFrame(e.to_string()))
            }
            LinesCodecError::Io(e) => FrameReadError::Io(e),
        }
    }
}
