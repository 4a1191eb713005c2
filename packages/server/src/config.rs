//! Server configuration.

use std::time::Duration;

use crate::{domain::ConfigError, infrastructure::protocol::FrameLimits};

/// Default TCP port
pub const DEFAULT_PORT: u16 = 1500;

/// Default bind address (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Runtime settings of the chat server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// How long a new connection may take to announce its display name
    pub handshake_timeout: Duration,
    /// Upper bound for a single write to a client; slower clients are evicted
    pub write_timeout: Duration,
    /// Size limits for incoming frames
    pub limits: FrameLimits,
    /// How long `serve` waits for connection tasks to wind down after stop
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject settings under which no client could ever be served
    ///
    /// # Errors
    ///
    /// `ConfigError::ZeroTimeout` for a zero handshake or write timeout, and
    /// `ConfigError::FrameTooSmall` if an escaped body could exceed the line limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.handshake_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("handshake timeout"));
        }
        if self.write_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("write timeout"));
        }
        self.limits.validate()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            handshake_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            limits: FrameLimits::default(),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}
