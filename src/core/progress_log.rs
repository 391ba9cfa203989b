//! Append-only progress log with file-based persistence.
//!
//! Events are stored as newline-delimited JSON (JSONL) next to the generated
//! images, so a finished job folder documents how it was produced.
//!
//! [`ProgressSink::emit`] is synchronous, so the sink only queues events; a
//! background task owns the file and appends them in order.
//!
//! The log never creates the job folder: that is the storage's job during
//! run setup. Events emitted while the folder does not exist yet (a request
//! rejected before setup) are dropped, so a rejected run leaves nothing on
//! disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::{ProgressEvent, ProgressSink};

/// File name of the log inside a job folder
pub const PROGRESS_LOG_FILE: &str = "progress.jsonl";

/// Sink that persists every event to a JSONL file
#[derive(Debug, Clone)]
pub struct ProgressLog {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

/// Handle on the writer task
#[derive(Debug)]
pub struct ProgressLogWriter {
    path: PathBuf,
    handle: JoinHandle<Result<usize>>,
}

impl ProgressLog {
    /// Start a writer task appending to `path`
    ///
    /// The file is created on the first event whose parent directory exists.
    pub fn spawn(path: impl Into<PathBuf>) -> (Self, ProgressLogWriter) {
        let path = path.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(write_events(path.clone(), rx));

        (Self { tx }, ProgressLogWriter { path, handle })
    }
}

impl ProgressSink for ProgressLog {
    fn emit(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            warn!("Progress log writer stopped, dropping event");
        }
    }
}

impl ProgressLogWriter {
    /// Get the path to the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait until every queued event is written
    ///
    /// Resolves once all [`ProgressLog`] clones are dropped. Returns the number
    /// of events written.
    pub async fn finish(self) -> Result<usize> {
        self.handle.await.context("Progress log writer panicked")?
    }
}

async fn write_events(path: PathBuf, mut rx: mpsc::UnboundedReceiver<ProgressEvent>) -> Result<usize> {
    let mut file: Option<File> = None;
    let mut written = 0;

    while let Some(event) = rx.recv().await {
        if file.is_none() {
            let folder_ready = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => fs::try_exists(parent)
                    .await
                    .with_context(|| format!("Failed to check directory: {}", parent.display()))?,
                _ => true,
            };
            if !folder_ready {
                debug!(kind = ?event.kind, "Job folder missing, event not logged");
                continue;
            }

            let opened = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .with_context(|| format!("Failed to open progress log: {}", path.display()))?;
            file = Some(opened);
        }

        if let Some(f) = file.as_mut() {
            let json = serde_json::to_string(&event).context("Failed to serialize event")?;
            f.write_all(format!("{}\n", json).as_bytes())
                .await
                .context("Failed to write event")?;
            f.flush().await.context("Failed to flush event")?;
            written += 1;
        }
    }

    Ok(written)
}

/// Replay all events of a log in order
pub async fn replay(path: &Path) -> Result<Vec<ProgressEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .await
        .with_context(|| format!("Failed to open progress log: {}", path.display()))?;

    let reader = BufReader::new(file);
    let mut lines = reader.lines();
    let mut events = Vec::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let event: ProgressEvent = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse event: {}", line))?;
        events.push(event);
    }

    Ok(events)
}
