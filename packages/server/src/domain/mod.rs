//! Domain layer: values, errors and the contracts the other layers rely on.

pub mod error;
pub mod event_log;
pub mod input;
pub mod message;

pub use error::{RegistryError, ServerError, SessionError};
pub use event_log::{EventKind, EventLog, format_event};
pub use input::{ClientInput, RENAME_PREFIX};
pub use message::{ChatMessage, DisplayName, SystemNotice};
