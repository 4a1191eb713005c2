//! UseCase: ルーム全体へのブロードキャスト
//!
//! ## 設計ノート
//!
//! - ブロードキャストは Mutex で直列化され、2 つの行が受信側で混ざることはない
//! - 配送先は Registry の snapshot。ロックを保持したまま I/O は行わない
//! - 各セッションへの書き込みは並行かつ独立。1 件の失敗が他の配送を止めることはない
//! - 書き込みに失敗したセッションは呼び出しが戻る前に Registry から除去される（再送しない）

use std::sync::Arc;

use agora_shared::time::{Clock, format_time_of_day};
use futures_util::future::join_all;
use tokio::sync::Mutex;

use crate::{
    domain::{DisconnectReason, EventSink, SessionId},
    infrastructure::{ClientRegistry, protocol::to_single_line},
};

use super::disconnect_session::DisconnectSessionUseCase;

/// Result of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// The line as delivered (timestamped)
    pub line: String,
    /// Number of sessions that received the line
    pub delivered: usize,
    /// Sessions evicted because the write failed
    pub evicted: Vec<SessionId>,
}

/// Fans rendered lines out to every registered session
pub struct Broadcaster {
    registry: Arc<ClientRegistry>,
    disconnect: Arc<DisconnectSessionUseCase>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    /// Serializes broadcasts relative to each other
    gate: Mutex<()>,
}

impl Broadcaster {
    pub fn new(
        registry: Arc<ClientRegistry>,
        disconnect: Arc<DisconnectSessionUseCase>,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            disconnect,
            sink,
            clock,
            gate: Mutex::new(()),
        }
    }

    /// Timestamp `line`, log it to the room and deliver it to every registered session
    pub async fn broadcast(&self, line: &str) -> BroadcastOutcome {
        let _gate = self.gate.lock().await;

        let rendered = format!(
            "{} {}",
            format_time_of_day(self.clock.now_millis()),
            to_single_line(line)
        );
        self.sink.on_room_message(&rendered);

        let recipients = self.registry.snapshot().await;
        let results = join_all(
            recipients
                .iter()
                .map(|session| session.send_line(&rendered)),
        )
        .await;

        let mut outcome = BroadcastOutcome {
            line: rendered.clone(),
            ..Default::default()
        };
        for (session, result) in recipients.iter().zip(results) {
            match result {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        "Failed to deliver broadcast to '{}' (session {}): {}",
                        session.display_name(),
                        session.id(),
                        e
                    );
                    let evicted = self
                        .disconnect
                        .execute(session, DisconnectReason::WriteFailed(e.to_string()))
                        .await;
                    if evicted {
                        self.sink.on_status(&format!(
                            "Disconnected client {} removed from list.",
                            session.display_name()
                        ));
                    }
                    outcome.evicted.push(session.id());
                }
            }
        }

        tracing::debug!(
            "Broadcast delivered to {} session(s), {} evicted",
            outcome.delivered,
            outcome.evicted.len()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use agora_shared::time::FixedClock;
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream, duplex};

    use super::*;
    use crate::{
        domain::{ClientSession, Timestamp},
        infrastructure::{ChannelEventSink, SinkEvent},
    };

    const NOW: i64 = 1672574400000;

    struct TestRoom {
        registry: Arc<ClientRegistry>,
        broadcaster: Arc<Broadcaster>,
        events: tokio::sync::mpsc::UnboundedReceiver<SinkEvent>,
    }

    fn create_test_room() -> TestRoom {
        let registry = Arc::new(ClientRegistry::new());
        let (sink, events) = ChannelEventSink::new();
        let sink: Arc<dyn EventSink> = Arc::new(sink);
        let disconnect = Arc::new(DisconnectSessionUseCase::new(registry.clone(), sink.clone()));
        let broadcaster = Arc::new(Broadcaster::new(
            registry.clone(),
            disconnect,
            sink,
            Arc::new(FixedClock::new(NOW)),
        ));
        TestRoom {
            registry,
            broadcaster,
            events,
        }
    }

    async fn join(
        registry: &ClientRegistry,
        id: u64,
        name: &str,
    ) -> (Arc<ClientSession>, BufReader<DuplexStream>) {
        let (server_side, client_side) = duplex(4096);
        let session = Arc::new(ClientSession::new(
            SessionId::new(id),
            name,
            Timestamp::new(NOW),
            server_side,
            Duration::from_secs(1),
        ));
        registry.insert(session.clone()).await;
        (session, BufReader::new(client_side))
    }

    async fn read_line(reader: &mut BufReader<DuplexStream>) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        line
    }

    #[tokio::test]
    async fn test_broadcast_delivers_one_copy_to_every_session() {
        // テスト項目: 登録済みの全セッションに 1 行ずつ配送され、ルームログにも記録される
        // given (前提条件):
        let mut room = create_test_room();
        let (_a, mut alice) = join(&room.registry, 1, "alice").await;
        let (_b, mut bob) = join(&room.registry, 2, "bob").await;
        let (_c, mut carol) = join(&room.registry, 3, "carol").await;

        // when (操作):
        let outcome = room.broadcaster.broadcast("alice: hello").await;

        // then (期待する結果):
        let expected = format!("{} alice: hello", format_time_of_day(NOW));
        assert_eq!(outcome.delivered, 3);
        assert!(outcome.evicted.is_empty());
        assert_eq!(outcome.line, expected);
        for reader in [&mut alice, &mut bob, &mut carol] {
            assert_eq!(read_line(reader).await, format!("{}\n", expected));
        }
        assert_eq!(room.events.recv().await, Some(SinkEvent::Room(expected)));
    }

    #[tokio::test]
    async fn test_broadcast_evicts_failed_session_and_keeps_delivering() {
        // テスト項目: 書き込みに失敗したセッションは除去され、他のセッションへの配送は継続される
        // given (前提条件):
        let mut room = create_test_room();
        let (_a, mut alice) = join(&room.registry, 1, "alice").await;
        let (b, bob) = join(&room.registry, 2, "bob").await;
        let (_c, mut carol) = join(&room.registry, 3, "carol").await;
        drop(bob);

        // when (操作):
        let outcome = room.broadcaster.broadcast("carol: anyone?").await;

        // then (期待する結果):
        assert_eq!(outcome.delivered, 2);
        assert_eq!(outcome.evicted, vec![b.id()]);
        assert!(!room.registry.contains(b.id()).await);
        assert!(b.is_closed());
        assert!(read_line(&mut alice).await.ends_with("carol: anyone?\n"));
        assert!(read_line(&mut carol).await.ends_with("carol: anyone?\n"));

        let mut statuses = Vec::new();
        while let Ok(event) = room.events.try_recv() {
            if let SinkEvent::Status(line) = event {
                statuses.push(line);
            }
        }
        assert!(statuses.iter().any(|s| s.starts_with("bob disconnected (write failed")));
        assert!(statuses.contains(&"Disconnected client bob removed from list.".to_string()));
    }

    #[tokio::test]
    async fn test_broadcast_with_empty_registry() {
        // テスト項目: 登録セッションがなくてもルームログには記録される
        // given (前提条件):
        let mut room = create_test_room();

        // when (操作):
        let outcome = room.broadcaster.broadcast("nobody: here").await;

        // then (期待する結果):
        assert_eq!(outcome.delivered, 0);
        assert!(matches!(room.events.recv().await, Some(SinkEvent::Room(_))));
    }

    #[tokio::test]
    async fn test_broadcast_flattens_embedded_newlines() {
        // テスト項目: 本文に改行が含まれても受信側では 1 行として届く
        // given (前提条件):
        let room = create_test_room();
        let (_a, mut alice) = join(&room.registry, 1, "alice").await;

        // when (操作):
        room.broadcaster.broadcast("alice: one\ntwo").await;

        // then (期待する結果):
        assert!(read_line(&mut alice).await.ends_with("alice: one two\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_broadcasts_never_interleave() {
        // テスト項目: 同時に行われた 2 つのブロードキャストが受信側で混ざらず、2 行として届く
        // given (前提条件):
        let room = create_test_room();
        let (_a, mut alice) = join(&room.registry, 1, "alice").await;
        let (_b, mut bob) = join(&room.registry, 2, "bob").await;

        // when (操作):
        let first = {
            let broadcaster = room.broadcaster.clone();
            tokio::spawn(async move { broadcaster.broadcast("alice: hi").await })
        };
        let second = {
            let broadcaster = room.broadcaster.clone();
            tokio::spawn(async move { broadcaster.broadcast("bob: yo").await })
        };
        first.await.unwrap();
        second.await.unwrap();

        // then (期待する結果):
        let prefix = format_time_of_day(NOW);
        let alice_lines = vec![read_line(&mut alice).await, read_line(&mut alice).await];
        let bob_lines = vec![read_line(&mut bob).await, read_line(&mut bob).await];
        // 全ての受信者が同じ順序で受け取る
        assert_eq!(alice_lines, bob_lines);
        let mut sorted = alice_lines;
        sorted.sort();
        assert_eq!(
            sorted,
            vec![
                format!("{} alice: hi\n", prefix),
                format!("{} bob: yo\n", prefix),
            ]
        );
    }
}
