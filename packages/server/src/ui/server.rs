//! Listener and shutdown coordinator.

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use tcpchat_shared::time::Clock;
use tokio::net::TcpListener;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    config::ServerConfig,
    domain::{EventKind, EventLog, ServerError},
    infrastructure::{history::HistoryLog, registry::ClientRegistry},
    usecase::Broadcaster,
};

use super::{session::handle_connection, state::AppState};

/// Pause after a failed accept; errors such as EMFILE tend to persist
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP chat server
///
/// # Example
///
/// ```ignore
/// let server = ChatServer::bind(config, events, clock).await?;
/// server.run(shutdown_signal()).await?;
/// ```
pub struct ChatServer {
    listener: TcpListener,
    state: Arc<AppState>,
    /// Outstanding sessions
    tracker: TaskTracker,
}

impl ChatServer {
    /// Bind the listening socket and build the shared state
    ///
    /// # Errors
    ///
    /// `ServerError::Bind` if the address cannot be bound.
    pub async fn bind(
        config: ServerConfig,
        events: Arc<dyn EventLog>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ServerError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        let broadcaster = Broadcaster::new(
            Arc::new(ClientRegistry::new(config.capacity)),
            Arc::new(HistoryLog::new()),
        );
        let state = Arc::new(AppState {
            broadcaster,
            events,
            clock,
            config,
            shutdown: CancellationToken::new(),
        });

        Ok(Self {
            listener,
            state,
            tracker: TaskTracker::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn history(&self) -> Arc<HistoryLog> {
        self.state.broadcaster.history().clone()
    }

    pub fn registry(&self) -> Arc<ClientRegistry> {
        self.state.broadcaster.registry().clone()
    }

    /// Token cancelled when shutdown begins
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    /// Accept connections until `shutdown_signal` resolves, then close every
    /// session and wait for all of them to finish.
    ///
    /// # Errors
    ///
    /// Only if the local address cannot be read; accept errors are logged and
    /// skipped.
    pub async fn run(self, shutdown_signal: impl Future<Output = ()>) -> Result<(), ServerError> {
        let local_addr = self.listener.local_addr()?;
        tracing::info!("TCP chat server listening on {}", local_addr);
        tracing::info!("Connect with: nc {} {}", local_addr.ip(), local_addr.port());
        self.state
            .events
            .log_event(EventKind::Start, "server", &format!("Listening on {local_addr}"));

        tokio::pin!(shutdown_signal);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_signal => break,
                _ = self.state.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::info!("Accepted connection from {}", peer);
                        self.tracker
                            .spawn(handle_connection(stream, peer, self.state.clone()));
                    }
                    Err(e) => accept_failed(&e).await,
                },
            }
        }

        drop(self.listener);
        self.state.shutdown.cancel();
        self.tracker.close();
        tracing::info!("Waiting for {} sessions to close", self.tracker.len());
        self.tracker.wait().await;

        self.state
            .events
            .log_event(EventKind::Shutdown, "server", "Server shut down");
        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

async fn accept_failed(e: &std::io::Error) {
    tracing::warn!("Failed to accept connection: {}", e);
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}
