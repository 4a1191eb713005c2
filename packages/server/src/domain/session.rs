//! Server-side state of one connected client.
//!
//! `ClientSession` exposes the write path of its connection as a capability
//! (`send_line` / `send_lines`). Nobody else touches the underlying stream.
//! Teardown is guarded by a single-fire flag so the read loop, a failed
//! broadcast and server shutdown can all race to close it safely.

use std::{
    fmt,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

use futures_util::SinkExt;
use tokio::{io::AsyncWrite, sync::Mutex};
use tokio_util::{
    codec::{FramedWrite, LinesCodec, LinesCodecError},
    sync::CancellationToken,
};

use super::error::WriteFailure;

/// Outbound half of a connection, framed as text lines
type LineWriter = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, LinesCodec>;

/// Unique session identifier. Monotonic, never reused within a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out increasing session ids, starting at 1
#[derive(Debug)]
pub struct SessionIdGenerator {
    next: AtomicU64,
}

impl SessionIdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> SessionId {
        SessionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// Why a session was torn down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer closed the stream
    PeerClosed,
    /// The client sent LOGOUT
    Logout,
    /// A frame could not be decoded
    MalformedFrame(String),
    /// Reading from the stream failed
    ReadError(String),
    /// Writing to the stream failed (broadcast eviction or roster reply)
    WriteFailed(String),
    /// The server is stopping
    ServerShutdown,
    /// The server closed the connection after tearing the session down elsewhere
    ClosedByServer,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::PeerClosed => write!(f, "connection closed by peer"),
            DisconnectReason::Logout => write!(f, "logout"),
            DisconnectReason::MalformedFrame(detail) => write!(f, "{}", detail),
            DisconnectReason::ReadError(detail) => write!(f, "read error: {}", detail),
            DisconnectReason::WriteFailed(detail) => write!(f, "write failed: {}", detail),
            DisconnectReason::ServerShutdown => write!(f, "server shutdown"),
            DisconnectReason::ClosedByServer => write!(f, "closed by server"),
        }
    }
}

/// One connected, handshaken client
pub struct ClientSession {
    id: SessionId,
    display_name: String,
    connected_at: Timestamp,
    /// `None` once the connection has been closed
    writer: Mutex<Option<LineWriter>>,
    write_timeout: Duration,
    /// Single-fire teardown guard
    closing: AtomicBool,
    /// Wakes the read loop when the server closes the connection
    cancel: CancellationToken,
}

impl ClientSession {
    /// Create a session that owns the given write half of a connection
    pub fn new<W>(
        id: SessionId,
        display_name: impl Into<String>,
        connected_at: Timestamp,
        writer: W,
        write_timeout: Duration,
    ) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
        Self {
            id,
            display_name: display_name.into(),
            connected_at,
            writer: Mutex::new(Some(FramedWrite::new(writer, LinesCodec::new()))),
            write_timeout,
            closing: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn connected_at(&self) -> Timestamp {
        self.connected_at
    }

    /// Whether teardown has started
    pub fn is_closed(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Token cancelled when the server closes this session
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Write one line to the client
    pub async fn send_line(&self, line: &str) -> Result<(), WriteFailure> {
        self.send_lines(std::slice::from_ref(&line)).await
    }

    /// Write several lines as one uninterrupted burst
    pub async fn send_lines<S: AsRef<str>>(&self, lines: &[S]) -> Result<(), WriteFailure> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(WriteFailure::Closed)?;

        let write = async {
            for line in lines {
                writer.feed(line.as_ref()).await?;
            }
            SinkExt::<&str>::flush(&mut *writer).await
        };

        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(result) => result.map_err(codec_to_write_failure),
            Err(_) => Err(WriteFailure::Timeout(self.write_timeout)),
        }
    }

    /// Claim teardown. Returns `true` for exactly one caller.
    pub fn begin_close(&self) -> bool {
        !self.closing.swap(true, Ordering::AcqRel)
    }

    /// Close the connection: wake the read loop and shut down the write half.
    ///
    /// Idempotent; the writer is taken out so the stream is closed once.
    pub async fn close_connection(&self) {
        self.cancel.cancel();

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            let close = SinkExt::<&str>::close(&mut writer);
            match tokio::time::timeout(self.write_timeout, close).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::debug!("Error closing connection of session {}: {}", self.id, e)
                }
                Err(_) => tracing::debug!("Timed out closing connection of session {}", self.id),
            }
        }
    }
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("connected_at", &self.connected_at)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn codec_to_write_failure(error: LinesCodecError) -> WriteFailure {
    match error {
        LinesCodecError::Io(e) => WriteFailure::Io(e),
        other => WriteFailure::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, other)),
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, BufReader, duplex};

    use super::*;

    fn create_test_session(
        id: u64,
        name: &str,
    ) -> (ClientSession, BufReader<tokio::io::DuplexStream>) {
        let (server_side, client_side) = duplex(1024);
        let session = ClientSession::new(
            SessionId::new(id),
            name,
            Timestamp::new(1000),
            server_side,
            Duration::from_secs(1),
        );
        (session, BufReader::new(client_side))
    }

    #[test]
    fn test_session_id_generator_is_monotonic() {
        // テスト項目: SessionId が 1 から単調増加で払い出される
        // given (前提条件):
        let generator = SessionIdGenerator::new();

        // when (操作):
        let first = generator.next_id();
        let second = generator.next_id();
        let third = generator.next_id();

        // then (期待する結果):
        assert_eq!(first.value(), 1);
        assert!(first < second && second < third);
    }

    #[tokio::test]
    async fn test_send_line_writes_newline_terminated_text() {
        // テスト項目: send_line が改行区切りの 1 行を書き込む
        // given (前提条件):
        let (session, mut client) = create_test_session(1, "alice");

        // when (操作):
        session.send_line("12:00:00 alice: hi").await.unwrap();

        // then (期待する結果):
        let mut line = String::new();
        client.read_line(&mut line).await.unwrap();
        assert_eq!(line, "12:00:00 alice: hi\n");
    }

    #[tokio::test]
    async fn test_send_lines_writes_all_lines_in_order() {
        // テスト項目: send_lines が複数行を順番通りに書き込む
        // given (前提条件):
        let (session, mut client) = create_test_session(1, "alice");

        // when (操作):
        session
            .send_lines(&["1) alice since x", "2) bob since y"])
            .await
            .unwrap();

        // then (期待する結果):
        let mut first = String::new();
        let mut second = String::new();
        client.read_line(&mut first).await.unwrap();
        client.read_line(&mut second).await.unwrap();
        assert_eq!(first, "1) alice since x\n");
        assert_eq!(second, "2) bob since y\n");
    }

    #[tokio::test]
    async fn test_send_line_fails_when_peer_is_gone() {
        // テスト項目: 相手側が閉じている場合、書き込みが WriteFailure になる
        // given (前提条件):
        let (session, client) = create_test_session(1, "alice");
        drop(client);

        // when (操作):
        let result = session.send_line("hello").await;

        // then (期待する結果):
        assert!(matches!(result, Err(WriteFailure::Io(_))));
    }

    #[tokio::test]
    async fn test_begin_close_fires_once() {
        // テスト項目: begin_close は最初の呼び出しだけ true を返す
        // given (前提条件):
        let (session, _client) = create_test_session(1, "alice");

        // when (操作):
        let first = session.begin_close();
        let second = session.begin_close();

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_close_connection_is_idempotent_and_signals_eof() {
        // テスト項目: close_connection は冪等で、相手側は EOF を受け取る
        // given (前提条件):
        let (session, mut client) = create_test_session(1, "alice");

        // when (操作):
        session.close_connection().await;
        session.close_connection().await;

        // then (期待する結果):
        assert!(session.cancellation().is_cancelled());
        let mut line = String::new();
        let read = client.read_line(&mut line).await.unwrap();
        assert_eq!(read, 0);
        assert!(matches!(
            session.send_line("late").await,
            Err(WriteFailure::Closed)
        ));
    }
}
