//! UseCase: セッション接続処理
//!
//! ハンドシェイクが完了した接続に SessionId を払い出し、
//! `ClientSession` を作成して Registry に登録し、接続イベントを通知します。

use std::{sync::Arc, time::Duration};

use agora_shared::time::Clock;
use tokio::io::AsyncWrite;

use crate::{
    domain::{ClientSession, EventSink, SessionIdGenerator, Timestamp},
    infrastructure::ClientRegistry,
};

/// セッション接続のユースケース
pub struct ConnectSessionUseCase {
    registry: Arc<ClientRegistry>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    ids: SessionIdGenerator,
    write_timeout: Duration,
}

impl ConnectSessionUseCase {
    pub fn new(
        registry: Arc<ClientRegistry>,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            sink,
            clock,
            ids: SessionIdGenerator::new(),
            write_timeout,
        }
    }

    /// Register a new session for a handshaken connection
    ///
    /// # Arguments
    ///
    /// * `display_name` - Name announced in the handshake (already validated as non-empty)
    /// * `writer` - Write half of the connection; the session takes ownership
    pub async fn execute<W>(&self, display_name: &str, writer: W) -> Arc<ClientSession>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let session = Arc::new(ClientSession::new(
            self.ids.next_id(),
            display_name,
            Timestamp::new(self.clock.now_millis()),
            writer,
            self.write_timeout,
        ));

        // Ids are fresh, so the insert cannot collide.
        self.registry.insert(session.clone()).await;
        tracing::info!(
            "Client '{}' connected as session {}",
            display_name,
            session.id()
        );
        self.sink.on_client_connected(display_name);

        session
    }
}
