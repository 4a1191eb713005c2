//! EventSink trait 定義
//!
//! コアが発生させるイベント（接続・切断・エラー診断、ルームのチャット行）の
//! 受け口です。コンソールや GUI ペインなどの外部の表示面が実装します。
//!
//! コアは発生した時点で同期的に呼び出すため、実装側は長時間ブロックしてはいけません。
//! 表示が遅い場合は実装側でバッファリングしてください（`ChannelEventSink` を参照）。

use super::session::DisconnectReason;

/// Receiver of human-readable status lines and room broadcast lines.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    /// Connect/disconnect/error diagnostics
    fn on_status(&self, line: &str);

    /// A broadcast chat line, already timestamped
    fn on_room_message(&self, line: &str);

    /// A client completed its handshake and was registered
    fn on_client_connected(&self, display_name: &str) {
        self.on_status(&format!("{} just connected.", display_name));
    }

    /// A session was torn down
    fn on_client_disconnected(&self, display_name: &str, reason: &DisconnectReason) {
        self.on_status(&format!("{} disconnected ({}).", display_name, reason));
    }
}
