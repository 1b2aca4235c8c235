//! Lifecycle event log contract.
//!
//! Every connect, disconnect, rename, message and error is recorded as one line
//! `[<KIND>] [<client>]: <details>`. Where the lines end up is decided by the
//! implementation (see `infrastructure::event_log`).

use std::fmt;

/// Kinds of lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Start,
    Shutdown,
    Connect,
    Disconnect,
    InvalidName,
    NameTaken,
    RoomFull,
    NewName,
    Message,
    NotSent,
    MsgHistory,
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Shutdown => "SHUTDOWN",
            Self::Connect => "CONNECT",
            Self::Disconnect => "DISCONNECT",
            Self::InvalidName => "INVALID_NAME",
            Self::NameTaken => "NAME_TAKEN",
            Self::RoomFull => "ROOM_FULL",
            Self::NewName => "NEW_NAME",
            Self::Message => "MESSAGE",
            Self::NotSent => "NOT_SENT",
            Self::MsgHistory => "MSG_HISTORY",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for lifecycle events.
///
/// Implementations must not block for long: it is called from session tasks.
pub trait EventLog: Send + Sync {
    fn log_event(&self, kind: EventKind, client: &str, details: &str);
}

/// Render an event the way it is stored: `[KIND] [client]: details`
pub fn format_event(kind: EventKind, client: &str, details: &str) -> String {
    format!("[{kind}] [{client}]: {details}")
}
