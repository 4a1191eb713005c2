//! EventSink の具体的な実装
//!
//! ## 実装
//!
//! - `console`: 標準出力へ書き出す実装（サーバー単体起動時）
//! - `channel`: mpsc チャンネルへ転送する実装（GUI などの外部表示面、テスト）

pub mod channel;
pub mod console;

pub use channel::{ChannelEventSink, SinkEvent};
pub use console::ConsoleEventSink;
