//! UseCase: ロスター（接続中ユーザー一覧）の取得
//!
//! 問い合わせ時点の Registry の snapshot から毎回生成します（キャッシュしない）。

use std::sync::Arc;

use agora_shared::time::format_since;

use crate::{domain::ClientSession, infrastructure::ClientRegistry};

/// ロスター取得のユースケース
pub struct RosterQueryUseCase {
    registry: Arc<ClientRegistry>,
}

impl RosterQueryUseCase {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Render the current roster, one line per active session, numbered from 1
    pub async fn execute(&self) -> Vec<String> {
        render_roster(&self.registry.snapshot().await)
    }
}

/// `"<index>) <displayName> since <connectedAt>"` for each session, in order
pub fn render_roster(sessions: &[Arc<ClientSession>]) -> Vec<String> {
    sessions
        .iter()
        .enumerate()
        .map(|(index, session)| {
            format!(
                "{}) {} since {}",
                index + 1,
                session.display_name(),
                format_since(session.connected_at().value())
            )
        })
        .collect()
}
