//! Fan-out of chat lines to every registered session.
//!
//! Both `publish` and `join` run inside one registry critical section. A
//! publish appends to the history and enqueues to the members it sees while
//! holding the registry lock; a join registers and replays the history while
//! holding the same lock. Any message is therefore either part of a
//! newcomer's replay or delivered to it live, never both and never neither,
//! and every session receives live lines in history order.
//!
//! Enqueueing never waits on a socket: each session's writer task does the
//! actual I/O outside of any lock.

use std::sync::Arc;

use crate::{
    domain::{DisplayName, RegistryError, SessionError},
    infrastructure::{
        codec::Outbound,
        history::HistoryLog,
        registry::{ClientRegistry, SessionHandle, SessionId},
    },
};

/// Outcome of one publish
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Sessions the line was enqueued for
    pub delivered: usize,
    /// Sessions dropped because their queue was full or closed
    pub evicted: Vec<SessionId>,
}

pub struct Broadcaster {
    registry: Arc<ClientRegistry>,
    history: Arc<HistoryLog>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ClientRegistry>, history: Arc<HistoryLog>) -> Self {
        Self { registry, history }
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    pub fn history(&self) -> &Arc<HistoryLog> {
        &self.history
    }

    /// Append `line` to the history and deliver it to every registered session.
    ///
    /// A recipient whose queue is full or closed is removed from the registry
    /// and closed; the others still receive the line. Publishing itself never
    /// fails.
    pub async fn publish(&self, line: impl Into<String>) -> Delivery {
        let line = line.into();
        let mut members = self.registry.lock().await;
        self.history.append(line.clone()).await;

        let mut delivery = Delivery::default();
        for session in members.snapshot() {
            match session.deliver(Outbound::Line(line.clone())) {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    tracing::warn!("Dropping session {} during broadcast: {}", session.id(), e);
                    members.remove(session.id());
                    session.close();
                    delivery.evicted.push(session.id());
                }
            }
        }
        tracing::debug!(
            "Broadcasted to {} sessions ({} evicted): {}",
            delivery.delivered,
            delivery.evicted.len(),
            line
        );
        delivery
    }

    /// Register `session` under `name` and replay the history into its outbox.
    ///
    /// Returns the number of replayed lines.
    ///
    /// # Errors
    ///
    /// Registration errors from the registry; `OutboxClosed` if the replay
    /// could not be enqueued, in which case the session is not left registered.
    pub async fn join(
        &self,
        name: &DisplayName,
        session: &SessionHandle,
    ) -> Result<usize, RegistryError> {
        let mut members = self.registry.lock().await;
        members.register(name, session.clone())?;

        let replayed = self
            .history
            .replay_to(|lines| session.deliver(Outbound::Lines(lines)))
            .await;
        replayed.map_err(|e: SessionError| {
            tracing::warn!("Failed to replay history to {}: {}", session.id(), e);
            members.remove(session.id());
            RegistryError::OutboxClosed
        })
    }
}
