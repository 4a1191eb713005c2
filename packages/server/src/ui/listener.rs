//! Accept loop and server lifecycle.

use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use agora_shared::time::{Clock, SystemClock};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::{
    codec::{FramedRead, LinesCodec},
    sync::CancellationToken,
    task::TaskTracker,
};

use crate::{
    config::ServerConfig,
    domain::{DisconnectReason, EventSink, ServerError},
    infrastructure::ClientRegistry,
};

use super::{handshake::read_handshake, session::run_session, state::AppState};

/// Back-off after the process runs out of file descriptors
const RESOURCE_EXHAUSTED_BACKOFF: Duration = Duration::from_millis(100);

/// Cloneable handle that stops a running server from another task
#[derive(Debug, Clone)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    /// Ask the server to stop. Subsequent calls are no-ops.
    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("Stop requested");
        }
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Broadcast chat server
///
/// # Example
///
/// ```no_run
/// # async fn run() -> Result<(), agora_server::domain::ServerError> {
/// use std::sync::Arc;
///
/// use agora_server::{ServerConfig, infrastructure::ConsoleEventSink, ui::Server};
///
/// let server = Server::new(ServerConfig::default(), Arc::new(ConsoleEventSink::new()));
/// let stop = server.stop_handle();
/// tokio::spawn(async move {
///     tokio::signal::ctrl_c().await.ok();
///     stop.stop();
/// });
/// server.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    /// Create a server that reports to `sink`
    pub fn new(config: ServerConfig, sink: Arc<dyn EventSink>) -> Self {
        Self::with_clock(config, sink, Arc::new(SystemClock))
    }

    /// Create a server with an explicit clock (deterministic timestamps in tests)
    pub fn with_clock(
        config: ServerConfig,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state: Arc::new(AppState::new(config, sink, clock)),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Registry of active sessions
    pub fn registry(&self) -> Arc<ClientRegistry> {
        self.state.registry.clone()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            token: self.state.shutdown.clone(),
        }
    }

    /// Stop the server. Idempotent.
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    /// Bind the configured address
    ///
    /// # Errors
    ///
    /// `ServerError::Bind` if the address is unavailable.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self.state.config.bind_addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Bind and serve until `stop()` is called
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is unusable or the address cannot
    /// be bound (the accept loop never starts), or if the listening socket fails.
    pub async fn start(&self) -> Result<(), ServerError> {
        self.check_config()?;
        let listener = match self.bind().await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!("{}", e);
                self.state
                    .sink
                    .on_status(&format!("Exception on new server socket: {}", e));
                return Err(e);
            }
        };
        self.serve(listener).await
    }

    /// Serve connections on an already bound listener until `stop()` is called.
    ///
    /// Shutdown is two-phase: the accept loop exits, then every session still
    /// registered is closed and cleaned up.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        self.check_config()?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Chat server listening on {}", local_addr);
        self.state.sink.on_status(&format!(
            "Server waiting for clients on port {}.",
            local_addr.port()
        ));

        let tracker = TaskTracker::new();
        let result = self.accept_loop(&listener, &tracker).await;
        drop(listener);

        self.shutdown_sessions(&tracker).await;
        result
    }

    fn check_config(&self) -> Result<(), ServerError> {
        self.state.config.validate().map_err(|e| {
            tracing::error!("Invalid configuration: {}", e);
            ServerError::from(e)
        })
    }

    async fn accept_loop(
        &self,
        listener: &TcpListener,
        tracker: &TaskTracker,
    ) -> Result<(), ServerError> {
        loop {
            let accepted = tokio::select! {
                _ = self.state.shutdown.cancelled() => return Ok(()),
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    tracing::debug!("Accepted connection from {}", addr);
                    tracker.spawn(handle_connection(self.state.clone(), stream, addr));
                }
                Err(e) if is_transient_accept_error(&e) => {
                    tracing::warn!("Transient accept error: {}", e);
                    self.state
                        .sink
                        .on_status(&format!("Error accepting connection: {}", e));
                    if is_resource_exhausted(&e) {
                        tokio::time::sleep(RESOURCE_EXHAUSTED_BACKOFF).await;
                    }
                }
                Err(e) => {
                    tracing::error!("Listening socket failed: {}", e);
                    self.state
                        .sink
                        .on_status(&format!("Listening socket failed: {}", e));
                    return Err(ServerError::AcceptLoop(e));
                }
            }
        }
    }

    async fn shutdown_sessions(&self, tracker: &TaskTracker) {
        // Also covers exits caused by a failed listener.
        self.state.shutdown.cancel();

        let sessions = self.state.registry.snapshot().await;
        tracing::info!("Closing {} remaining session(s)", sessions.len());
        for session in sessions {
            self.state
                .disconnect_session_usecase
                .execute(&session, DisconnectReason::ServerShutdown)
                .await;
        }

        tracker.close();
        if tokio::time::timeout(self.state.config.shutdown_grace, tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                "Connection tasks still running after {:?}",
                self.state.config.shutdown_grace
            );
        }

        self.state.sink.on_status("Server stopped.");
        tracing::info!("Server shutdown complete");
    }
}

/// Handshake, register, then run the read loop of one connection
async fn handle_connection(state: Arc<AppState>, stream: TcpStream, addr: SocketAddr) {
    let (read_half, write_half) = stream.into_split();
    let mut frames = FramedRead::new(
        read_half,
        LinesCodec::new_with_max_length(state.config.limits.max_frame_len),
    );

    let handshake = tokio::select! {
        _ = state.shutdown.cancelled() => {
            tracing::debug!("Dropping {} during handshake: server stopping", addr);
            return;
        }
        handshake = read_handshake(&mut frames, state.config.handshake_timeout) => handshake,
    };
    let display_name = match handshake {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!("Rejected connection from {}: {}", addr, e);
            state
                .sink
                .on_status(&format!("Rejected connection from {}: {}", addr, e));
            return;
        }
    };

    let session = state
        .connect_session_usecase
        .execute(&display_name, write_half)
        .await;

    // stop() may have taken its final snapshot before this session was registered.
    if state.shutdown.is_cancelled() {
        state
            .disconnect_session_usecase
            .execute(&session, DisconnectReason::ServerShutdown)
            .await;
        return;
    }

    run_session(session, frames, state).await;
}

/// Errors after which the listening socket is still usable
fn is_transient_accept_error(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::OutOfMemory
    ) || is_resource_exhausted(error)
}

/// EMFILE / ENFILE (and WSAEMFILE on Windows)
fn is_resource_exhausted(error: &io::Error) -> bool {
    matches!(error.raw_os_error(), Some(23) | Some(24) | Some(10024))
}
