//! Error types for the chat server domain.

use std::time::Duration;

use thiserror::Error;

use crate::infrastructure::codec::LineCodecError;

/// Errors returned by the client registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Another live session already uses the requested name
    #[error("name '{0}' is already taken")]
    NameTaken(String),

    /// The room is at capacity
    #[error("chat room is full ({capacity} participants)")]
    RoomFull { capacity: usize },

    /// The proposed name is empty after cleaning
    #[error("display name must not be empty")]
    InvalidName,

    /// The session's outbound queue was already closed when it tried to join
    #[error("session outbox is closed")]
    OutboxClosed,

    /// The session is not (or no longer) in the registry
    #[error("session is not registered")]
    NotRegistered,
}

/// Errors that end a single session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading or framing inbound data failed
    #[error("read failed: {0}")]
    Read(#[source] LineCodecError),

    /// Writing to the socket failed
    #[error("write failed: {0}")]
    Write(#[source] LineCodecError),

    /// A single write did not complete in time
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// The outbound queue overflowed (slow client)
    #[error("outbound queue is full")]
    QueueFull,

    /// The outbound queue has no writer any more
    #[error("outbound queue is closed")]
    QueueClosed,
}

/// Errors that stop the whole server
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
