//! UseCase: セッション切断処理
//!
//! 読み込みループの終了・ブロードキャスト時の書き込み失敗・サーバー停止の
//! いずれから呼ばれても、後始末（Registry からの削除、接続のクローズ、
//! 切断イベントの通知）はセッションごとにちょうど 1 回だけ実行されます。

use std::sync::Arc;

use crate::{
    domain::{ClientSession, DisconnectReason, EventSink},
    infrastructure::ClientRegistry,
};

/// セッション切断のユースケース
pub struct DisconnectSessionUseCase {
    registry: Arc<ClientRegistry>,
    sink: Arc<dyn EventSink>,
}

impl DisconnectSessionUseCase {
    pub fn new(registry: Arc<ClientRegistry>, sink: Arc<dyn EventSink>) -> Self {
        Self { registry, sink }
    }

    /// Tear a session down.
    ///
    /// The session leaves the registry before its connection is closed, so a
    /// registered session always has an open connection.
    ///
    /// # Returns
    ///
    /// `true` if this call performed the teardown, `false` if it had already happened.
    pub async fn execute(&self, session: &ClientSession, reason: DisconnectReason) -> bool {
        if !session.begin_close() {
            return false;
        }

        self.registry.remove(session.id()).await;
        session.close_connection().await;

        tracing::info!(
            "Client '{}' (session {}) disconnected: {}",
            session.display_name(),
            session.id(),
            reason
        );
        self.sink
            .on_client_disconnected(session.display_name(), &reason);

        true
    }
}
