//! Infrastructure layer: wire codec, in-memory state and file sinks.

pub mod codec;
pub mod event_log;
pub mod history;
pub mod history_dump;
pub mod registry;

pub use codec::{ChatLineCodec, LineCodecError, Outbound};
pub use event_log::{FileEventLog, MemoryEventLog, RecordedEvent};
pub use history::HistoryLog;
pub use history_dump::HistoryDump;
pub use registry::{ClientRegistry, Members, Outbox, SessionHandle, SessionId};
