//! Logging setup utilities for the TCP chat server.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// This function sets up logging for the server library, this shared crate and
/// the binary itself. The log level can be overridden using the `RUST_LOG`
/// environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "tcpchat")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use tcpchat_shared::logger::setup_logger;
///
/// setup_logger("tcpchat", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_directives(binary_name: &str, default_log_level: &str) -> String {
    format!(
        "tcpchat_server={level},{shared}={level},{binary}={level}",
        level = default_log_level,
        shared = env!("CARGO_PKG_NAME").replace("-", "_"),
        binary = binary_name.replace("-", "_"),
    )
}
