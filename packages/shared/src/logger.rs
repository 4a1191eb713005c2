//! Logging setup utilities for the Agora chat application.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The filter covers the library crate that owns the binary as well as the
/// binary itself. It can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `crate_name` - The package name of the calling crate (e.g., `env!("CARGO_PKG_NAME")`)
/// * `binary_name` - The name of the binary (e.g., "agora-server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use agora_shared::logger::setup_logger;
///
/// setup_logger("agora-server", "agora-server", "info");
/// ```
pub fn setup_logger(crate_name: &str, binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                default_filter(crate_name, binary_name, default_log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the default `EnvFilter` directive string.
///
/// Cargo names use hyphens while tracing targets use underscores.
fn default_filter(crate_name: &str, binary_name: &str, default_log_level: &str) -> String {
    format!(
        "{}={},{}={}",
        crate_name.replace('-', "_"),
        default_log_level,
        binary_name.replace('-', "_"),
        default_log_level
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_uses_tracing_target_names() {
        // テスト項目: クレート名・バイナリ名のハイフンがアンダースコアに変換される
        // given (前提条件):
        let crate_name = "agora-server";
        let binary_name = "agora-server";

        // when (操作):
        let filter = default_filter(crate_name, binary_name, "debug");

        // then (期待する結果):
        assert_eq!(filter, "agora_server=debug,agora_server=debug");
    }

    #[test]
    fn test_default_filter_keeps_log_level() {
        // テスト項目: 指定したログレベルがそのまま反映される
        // given (前提条件):

        // when (操作):
        let filter = default_filter("agora-shared", "tool", "warn");

        // then (期待する結果):
        assert_eq!(filter, "agora_shared=warn,tool=warn");
    }
}
