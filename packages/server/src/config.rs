//! Server configuration.

use std::{path::PathBuf, time::Duration};

use crate::infrastructure::{codec::DEFAULT_MAX_LINE_LENGTH, registry::DEFAULT_CAPACITY};

pub const DEFAULT_PORT: u16 = 8989;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_OUTBOX_CAPACITY: usize = 64;
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Configuration options for the chat server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port number to listen on (0 picks a free port)
    pub port: u16,

    /// Maximum number of named participants
    pub capacity: usize,

    /// Outbound queue length per client before it is considered stalled
    pub outbox_capacity: usize,

    /// Upper bound for one socket write + flush
    pub write_timeout: Duration,

    /// Longest accepted inbound line, in bytes
    pub max_line_length: usize,

    /// Directory for the event log and history dumps
    pub log_dir: PathBuf,

    /// Rewrite the history dump this often; `None` dumps only at shutdown
    pub history_dump_interval: Option<Duration>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            capacity: DEFAULT_CAPACITY,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            history_dump_interval: None,
        }
    }
}
