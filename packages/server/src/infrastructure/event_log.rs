//! `EventLog` implementations.
//!
//! - `FileEventLog`: one append-only file per server run
//! - `MemoryEventLog`: keeps events in memory, for tests and embedding

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use tcpchat_shared::time::{Clock, LOG_TIMESTAMP_FORMAT, format_file_stamp};
use tokio::{
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc,
    task::JoinHandle,
};

use crate::domain::{EventKind, EventLog, format_event};

/// Writes `<date time> [KIND] [client]: details` lines to `<dir>/server<stamp>.log`
///
/// `log_event` only formats and enqueues; a background task owns the file.
pub struct FileEventLog {
    path: PathBuf,
    sender: mpsc::UnboundedSender<String>,
    clock: Arc<dyn Clock>,
}

impl FileEventLog {
    /// Create `dir` if needed, open a fresh log file named after the current
    /// time and spawn its writer task.
    ///
    /// The returned handle finishes once every `FileEventLog` clone is dropped
    /// and the queued lines are flushed.
    pub fn create(dir: &Path, clock: Arc<dyn Clock>) -> std::io::Result<(Self, JoinHandle<()>)> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("server{}.log", format_file_stamp(clock.now())));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let (sender, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(
            tokio::fs::File::from_std(file),
            rx,
            path.clone(),
        ));
        Ok((
            Self {
                path,
                sender,
                clock,
            },
            writer,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn write_loop(file: tokio::fs::File, mut rx: mpsc::UnboundedReceiver<String>, path: PathBuf) {
    let mut writer = BufWriter::new(file);
    while let Some(line) = rx.recv().await {
        let mut batch = line;
        while let Ok(more) = rx.try_recv() {
            batch.push_str(&more);
        }
        let written = async {
            writer.write_all(batch.as_bytes()).await?;
            writer.flush().await
        };
        if let Err(e) = written.await {
            tracing::warn!("Failed to write event log {}: {}", path.display(), e);
        }
    }
}

impl EventLog for FileEventLog {
    fn log_event(&self, kind: EventKind, client: &str, details: &str) {
        let line = format!(
            "{} {}\n",
            self.clock.now().format(LOG_TIMESTAMP_FORMAT),
            format_event(kind, client, details)
        );
        if self.sender.send(line).is_err() {
            tracing::warn!("Event log writer for {} has stopped", self.path.display());
        }
    }
}

/// One recorded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub kind: EventKind,
    pub client: String,
    pub details: String,
}

/// In-memory event log
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.lock().clone()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.lock().iter().filter(|e| e.kind == kind).count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventLog for MemoryEventLog {
    fn log_event(&self, kind: EventKind, client: &str, details: &str) {
        self.lock().push(RecordedEvent {
            kind,
            client: client.to_string(),
            details: details.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tcpchat_shared::time::FixedClock;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "tcpchat-event-log-{}-{}",
            std::process::id(),
            name
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn fixed_clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::new(
            NaiveDate::from_ymd_opt(2024, 3, 4)
                .and_then(|d| d.and_hms_opt(5, 6, 7))
                .unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_file_event_log_writes_lines() {
        // テスト項目: イベントが時刻付きの 1 行としてファイルに追記される
        // given (前提条件):
        let dir = test_dir("writes");
        let (log, writer) = FileEventLog::create(&dir, fixed_clock()).unwrap();
        let path = log.path().to_path_buf();

        // when (操作):
        log.log_event(EventKind::Connect, "127.0.0.1:4000", "Client \"alice\" joined");
        log.log_event(EventKind::Disconnect, "127.0.0.1:4000", "\"alice\" left the chat");
        drop(log);
        writer.await.unwrap();

        // then (期待する結果):
        assert_eq!(path, dir.join("server20240304050607.log"));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "2024/03/04 05:06:07 [CONNECT] [127.0.0.1:4000]: Client \"alice\" joined\n\
             2024/03/04 05:06:07 [DISCONNECT] [127.0.0.1:4000]: \"alice\" left the chat\n"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_file_event_log_does_not_write_on_caller() {
        // テスト項目: log_event は呼び出し側でファイルに書き込まず、書き込みタスクに任せる
        // given (前提条件):
        let dir = test_dir("deferred");
        let (log, writer) = FileEventLog::create(&dir, fixed_clock()).unwrap();
        let path = log.path().to_path_buf();

        // when (操作):
        log.log_event(EventKind::Message, "c1", "\"alice\": hi");

        // then (期待する結果): 書き込みタスクが動くまではファイルは空のまま
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
        drop(log);
        writer.await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "2024/03/04 05:06:07 [MESSAGE] [c1]: \"alice\": hi\n"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_memory_event_log_counts_by_kind() {
        // テスト項目: 種別ごとにイベント数を数えられる
        // given (前提条件):
        let log = MemoryEventLog::new();

        // when (操作):
        log.log_event(EventKind::NameTaken, "a", "x");
        log.log_event(EventKind::NameTaken, "b", "y");
        log.log_event(EventKind::Message, "a", "hi");

        // then (期待する結果):
        assert_eq!(log.count(EventKind::NameTaken), 2);
        assert_eq!(log.count(EventKind::Message), 1);
        assert_eq!(log.events()[2].details, "hi");
    }
}
