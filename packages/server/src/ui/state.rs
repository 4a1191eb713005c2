//! Server state shared by the accept loop and every connection task.

use std::sync::Arc;

use agora_shared::time::Clock;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ServerConfig,
    domain::EventSink,
    infrastructure::ClientRegistry,
    usecase::{Broadcaster, ConnectSessionUseCase, DisconnectSessionUseCase, RosterQueryUseCase},
};

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    /// Registry of active sessions
    pub registry: Arc<ClientRegistry>,
    /// Display surface for status and room lines
    pub sink: Arc<dyn EventSink>,
    pub connect_session_usecase: Arc<ConnectSessionUseCase>,
    pub disconnect_session_usecase: Arc<DisconnectSessionUseCase>,
    pub broadcaster: Arc<Broadcaster>,
    pub roster_query_usecase: Arc<RosterQueryUseCase>,
    /// Cancelled by `stop()`
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire up the registry and use cases
    pub fn new(config: ServerConfig, sink: Arc<dyn EventSink>, clock: Arc<dyn Clock>) -> Self {
        let registry = Arc::new(ClientRegistry::new());
        let connect_session_usecase = Arc::new(ConnectSessionUseCase::new(
            registry.clone(),
            sink.clone(),
            clock.clone(),
            config.write_timeout,
        ));
        let disconnect_session_usecase = Arc::new(DisconnectSessionUseCase::new(
            registry.clone(),
            sink.clone(),
        ));
        let broadcaster = Arc::new(Broadcaster::new(
            registry.clone(),
            disconnect_session_usecase.clone(),
            sink.clone(),
            clock,
        ));
        let roster_query_usecase = Arc::new(RosterQueryUseCase::new(registry.clone()));

        Self {
            config,
            registry,
            sink,
            connect_session_usecase,
            disconnect_session_usecase,
            broadcaster,
            roster_query_usecase,
            shutdown: CancellationToken::new(),
        }
    }
}
