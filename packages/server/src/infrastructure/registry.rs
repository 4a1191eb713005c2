//! InMemory session registry
//!
//! 接続中のセッションを SessionId をキーとして保持します。
//! 全ての変更と列挙は 1 つの Mutex で直列化されます。
//!
//! SessionId は単調増加で払い出されるため、`BTreeMap` のキー順は登録順と一致します。
//! ロスター応答の順序はこれに依存します。

use std::{collections::BTreeMap, sync::Arc};

use tokio::sync::Mutex;

use crate::domain::{ClientSession, SessionId};

/// Authoritative set of currently active sessions
#[derive(Debug, Default)]
pub struct ClientRegistry {
    sessions: Mutex<BTreeMap<SessionId, Arc<ClientSession>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session.
    ///
    /// Returns `false` and leaves the registry untouched if the id is already present.
    pub async fn insert(&self, session: Arc<ClientSession>) -> bool {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&session.id()) {
            tracing::warn!("Session {} is already registered", session.id());
            return false;
        }
        tracing::debug!(
            "Session {} ('{}') registered",
            session.id(),
            session.display_name()
        );
        sessions.insert(session.id(), session);
        true
    }

    /// Remove a session. No-op if absent.
    pub async fn remove(&self, id: SessionId) -> Option<Arc<ClientSession>> {
        let removed = self.sessions.lock().await.remove(&id);
        if removed.is_some() {
            tracing::debug!("Session {} unregistered", id);
        }
        removed
    }

    /// Point-in-time copy of the registered sessions, in registration order.
    ///
    /// The lock is released before returning, so callers may perform I/O on the entries.
    pub async fn snapshot(&self) -> Vec<Arc<ClientSession>> {
        self.sessions.lock().await.values().cloned().collect()
    }

    pub async fn contains(&self, id: SessionId) -> bool {
        self.sessions.lock().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
