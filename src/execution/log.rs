//! Per-task log files.
//!
//! Each task mirrors its captured output into `<logs_dir>/<task_id>.log`.
//! The file is only ever opened for append and every chunk is flushed before
//! the in-memory copy is updated, so the file always holds at least what a
//! reader of the task's `output` field can see.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::core::types::TaskId;

/// Deterministic log file location for a task.
pub fn log_path(logs_dir: &Path, id: &TaskId) -> PathBuf {
    logs_dir.join(format!("{}.log", id))
}

/// Read a log file, treating a file that does not exist yet as empty.
pub async fn read_log(path: &Path) -> std::io::Result<String> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}

/// Append-only writer for one task's log file.
#[derive(Debug)]
pub struct TaskLog {
    file: File,
}

impl TaskLog {
    /// Open (creating if needed) a log file for append.
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self { file })
    }

    /// Append a chunk and flush it to disk.
    pub async fn append(&mut self, chunk: &str) -> std::io::Result<()> {
        self.file.write_all(chunk.as_bytes()).await?;
        self.file.flush().await?;
        Ok(())
    }
}
