//! Chat values: display names, chat messages and system notices.

use std::fmt;

use chrono::NaiveDateTime;
use tcpchat_shared::time::format_chat_timestamp;

use super::error::RegistryError;

/// A non-empty, cleaned display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayName(String);

impl DisplayName {
    /// Create a display name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidName`] if nothing is left after trimming.
    pub fn new(name: impl Into<String>) -> Result<Self, RegistryError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(RegistryError::InvalidName);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A chat line as sent by a participant.
///
/// The sender is captured at send time, so later renames never rewrite it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sent_at: NaiveDateTime,
    pub sender: DisplayName,
    pub body: String,
}

impl ChatMessage {
    pub fn new(sent_at: NaiveDateTime, sender: DisplayName, body: impl Into<String>) -> Self {
        Self {
            sent_at,
            sender,
            body: body.into(),
        }
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}][{}]: {}",
            format_chat_timestamp(self.sent_at),
            self.sender,
            self.body
        )
    }
}

/// Sender-less lines announcing membership changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemNotice {
    Joined(DisplayName),
    Left(DisplayName),
    Renamed { from: DisplayName, to: DisplayName },
}

impl fmt::Display for SystemNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Joined(name) => write!(f, "{name} has joined the chat..."),
            Self::Left(name) => write!(f, "{name} has left the chat..."),
            Self::Renamed { from, to } => write!(f, "{from} has changed their name to {to}"),
        }
    }
}
