//! Persisting the in-memory history to a text file.
//!
//! The file holds a `Session started` marker, every history line in order and,
//! once the server has stopped, a `Session terminated` marker. Each dump
//! rewrites the whole file through a temporary sibling and a rename.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::NaiveDateTime;
use tcpchat_shared::time::{Clock, format_chat_timestamp, format_file_stamp};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::history::HistoryLog;

pub struct HistoryDump {
    path: PathBuf,
    started_at: NaiveDateTime,
    clock: Arc<dyn Clock>,
}

impl HistoryDump {
    /// Target `<dir>/chat_history<stamp>.txt`, stamped with the current time
    pub fn new(dir: &Path, clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now();
        Self {
            path: dir.join(format!("chat_history{}.txt", format_file_stamp(started_at))),
            started_at,
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the dump file contents
    pub fn render(&self, lines: &[String], terminated_at: Option<NaiveDateTime>) -> String {
        let mut contents = format!("{} Session started\n", format_chat_timestamp(self.started_at));
        for line in lines {
            contents.push_str(line);
            contents.push('\n');
        }
        if let Some(at) = terminated_at {
            contents.push_str(&format!("{} Session terminated\n", format_chat_timestamp(at)));
        }
        contents
    }

    /// Write the current history. `finished` appends the termination marker.
    pub async fn write(&self, history: &HistoryLog, finished: bool) -> std::io::Result<()> {
        let lines = history.snapshot().await;
        let terminated_at = finished.then(|| self.clock.now());
        let contents = self.render(&lines, terminated_at);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("txt.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(
            "Dumped {} history lines to {}",
            lines.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Rewrite the dump every `every` until `stop` is cancelled
    pub fn spawn_periodic(
        self: Arc<Self>,
        history: Arc<HistoryLog>,
        every: Duration,
        stop: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.write(&history, false).await {
                            tracing::warn!("Failed to dump history to {}: {}", self.path.display(), e);
                        }
                    }
                }
            }
        })
    }
}
