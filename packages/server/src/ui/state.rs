//! Shared application state.

use std::sync::Arc;

use tcpchat_shared::time::Clock;
use tokio_util::sync::CancellationToken;

use crate::{config::ServerConfig, domain::EventLog, usecase::Broadcaster};

/// State shared by the listener and every session
pub struct AppState {
    /// Fan-out to the registry, backed by the history log
    pub broadcaster: Broadcaster,
    /// Lifecycle event sink
    pub events: Arc<dyn EventLog>,
    /// Source of chat timestamps
    pub clock: Arc<dyn Clock>,
    pub config: ServerConfig,
    /// Cancelled once the server starts shutting down; sessions derive theirs from it
    pub shutdown: CancellationToken,
}
