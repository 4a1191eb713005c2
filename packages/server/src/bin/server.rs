//! Broadcast chat server over TCP.
//!
//! Every line a client sends is relayed to all connected clients.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin agora-server
//! cargo run --bin agora-server -- 4000
//! cargo run --bin agora-server -- 4000 --host 127.0.0.1 --handshake-timeout-secs 5
//! ```

use std::{sync::Arc, time::Duration};

use agora_server::{
    ServerConfig,
    config::{DEFAULT_HOST, DEFAULT_PORT},
    domain::ConfigError,
    infrastructure::{
        ConsoleEventSink,
        protocol::{DEFAULT_MAX_BODY_LEN, FrameLimits},
    },
    ui::{Server, signal::shutdown_signal},
};
use agora_shared::logger::setup_logger;
use clap::{CommandFactory, Parser, error::ErrorKind};

#[derive(Parser, Debug)]
#[command(name = "agora-server")]
#[command(about = "Broadcast chat server over TCP", long_about = None)]
struct Args {
    /// Port number to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Seconds a new connection may take to send its display name
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    handshake_timeout_secs: u64,

    /// Seconds a single write to a client may take before the client is dropped
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    write_timeout_secs: u64,

    /// Maximum length of one incoming line, in bytes [default: derived from --max-body-len]
    #[arg(long)]
    max_frame_len: Option<usize>,

    /// Maximum length of a message body, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_LEN)]
    max_body_len: usize,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let mut limits = FrameLimits::for_body_len(self.max_body_len);
        if let Some(max_frame_len) = self.max_frame_len {
            limits.max_frame_len = max_frame_len;
        }

        let config = ServerConfig {
            host: self.host,
            port: self.port,
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
            write_timeout: Duration::from_secs(self.write_timeout_secs),
            limits,
            ..ServerConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_PKG_NAME"), env!("CARGO_BIN_NAME"), "info");

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => Args::command().error(ErrorKind::ValueValidation, e).exit(),
    };
    let server = Server::new(config, Arc::new(ConsoleEventSink::new()));

    let stop = server.stop_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        stop.stop();
    });

    if let Err(e) = server.start().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
