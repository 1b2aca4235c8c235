//! Append-only in-memory message history.

use tokio::sync::RwLock;

/// Ordered record of every broadcast line, replayed to newcomers
#[derive(Debug, Default)]
pub struct HistoryLog {
    lines: RwLock<Vec<String>>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, line: impl Into<String>) {
        self.lines.write().await.push(line.into());
    }

    /// Hand every stored line, oldest first, to `sink` as one batch.
    ///
    /// The read lock is held while `sink` runs, so `sink` must not block. Nothing
    /// is handed over when the history is empty. Returns how many lines were
    /// replayed.
    pub async fn replay_to<F, E>(&self, sink: F) -> Result<usize, E>
    where
        F: FnOnce(Vec<String>) -> Result<(), E>,
    {
        let lines = self.lines.read().await;
        if lines.is_empty() {
            return Ok(0);
        }
        sink(lines.clone())?;
        Ok(lines.len())
    }

    /// Read-only copy for persistence and inspection
    pub async fn snapshot(&self) -> Vec<String> {
        self.lines.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.lines.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.lines.read().await.is_empty()
    }
}
