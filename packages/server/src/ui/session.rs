//! Per-connection read loop.
//!
//! Decodes one frame at a time and dispatches it:
//!
//! - `text`: rendered as `"<name>: <body>"` and handed to the broadcaster
//! - `roster_query`: the current roster is written back to this session only
//! - `logout`: the loop ends
//!
//! Any read or decode failure ends the loop as well; there is no retry at this layer.
//! Whatever ends the loop, the session is torn down through the single-fire cleanup.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec};

use crate::{
    domain::{ClientSession, DisconnectReason, MessageKind},
    infrastructure::protocol::{FrameReadError, decode_with_limits},
};

use super::state::AppState;

/// Run the read loop of a registered session, then tear it down
pub async fn run_session<R>(
    session: Arc<ClientSession>,
    mut frames: FramedRead<R, LinesCodec>,
    state: Arc<AppState>,
) where
    R: AsyncRead + Unpin,
{
    let reason = read_loop(&session, &mut frames, &state).await;
    state
        .disconnect_session_usecase
        .execute(&session, reason)
        .await;
}

async fn read_loop<R>(
    session: &ClientSession,
    frames: &mut FramedRead<R, LinesCodec>,
    state: &AppState,
) -> DisconnectReason
where
    R: AsyncRead + Unpin,
{
    loop {
        // Cancelled only once the session is already torn down (eviction or stop),
        // so the reason returned here never reaches the event sink.
        let next = tokio::select! {
            _ = session.cancellation().cancelled() => return DisconnectReason::ClosedByServer,
            next = frames.next() => next,
        };

        let line = match next {
            None => return DisconnectReason::PeerClosed,
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                return match FrameReadError::from(e) {
                    FrameReadError::Malformed(e) => {
                        tracing::warn!("Session {}: {}", session.id(), e);
                        DisconnectReason::MalformedFrame(e.to_string())
                    }
                    FrameReadError::Io(e) => {
                        tracing::warn!("Session {}: read error: {}", session.id(), e);
                        DisconnectReason::ReadError(e.to_string())
                    }
                };
            }
        };

        let message = match decode_with_limits(line.as_bytes(), &state.config.limits) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Session {}: {}", session.id(), e);
                return DisconnectReason::MalformedFrame(e.to_string());
            }
        };
        tracing::debug!(
            "Session {} sent a {:?} frame",
            session.id(),
            message.kind()
        );

        match message.kind() {
            MessageKind::Text => {
                let line = format!("{}: {}", session.display_name(), message.body());
                state.broadcaster.broadcast(&line).await;
            }
            MessageKind::Logout => {
                state.sink.on_status(&format!(
                    "{} disconnected with a LOGOUT message.",
                    session.display_name()
                ));
                return DisconnectReason::Logout;
            }
            MessageKind::RosterQuery => {
                let roster = state.roster_query_usecase.execute().await;
                if let Err(e) = session.send_lines(&roster).await {
                    return DisconnectReason::WriteFailed(e.to_string());
                }
            }
        }
    }
}
