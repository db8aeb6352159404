//! Supervised execution of one task.
//!
//! An [`ExecutionUnit`] owns a single task's child process from launch to
//! exit. It is the only writer of that task's record once execution has
//! been dispatched, and it always leaves the record in a terminal state:
//! launch errors, nonzero exits and capture failures are all folded into
//! `status = failed` with a descriptive `error`.
//!
//! Output capture: two reader tasks drain stdout and stderr line by line and
//! forward each line over an unbounded channel, so the unit sees one combined
//! sequence in arrival order and the child never blocks on a full pipe while
//! the unit is busy recording. Every line is appended to the log file first
//! and then to the in-memory record.
//!
//! Supervision itself runs in its own spawned task. If it panics (for
//! example inside an event handler) or stops on an internal error, the task
//! is still marked failed and the child is killed when its handle drops.

use std::any::Any;
use std::io;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::command::ScriptCommand;
use super::log::TaskLog;
use crate::core::task::Task;
use crate::core::types::TaskId;
use crate::events::{Event, EventBus};
use crate::storage::{StorageError, TaskTable};

/// Which output stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Errors that interrupt supervision.
#[derive(Debug, Error)]
enum SupervisorError {
    /// Reading the child's output or writing the log failed.
    #[error("{0}")]
    Io(#[from] io::Error),

    /// The task table became unusable; nothing more can be recorded.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Background unit that runs one task to completion.
pub struct ExecutionUnit {
    table: Arc<TaskTable>,
    events: Arc<EventBus>,
    task: Task,
}

impl ExecutionUnit {
    /// Create a unit for a task that has been claimed for execution.
    pub fn new(table: Arc<TaskTable>, events: Arc<EventBus>, task: Task) -> Self {
        Self {
            table,
            events,
            task,
        }
    }

    /// Run the task to a terminal state.
    pub async fn run(self) {
        let id = self.task.id;
        let table = Arc::clone(&self.table);
        let events = Arc::clone(&self.events);

        let outcome = tokio::spawn(async move { self.supervise().await }).await;
        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => format!("execution unit failed: {}", e),
            Err(e) if e.is_panic() => {
                format!("execution unit panicked: {}", panic_message(e.into_panic()))
            }
            Err(_) => "execution unit was cancelled".to_string(),
        };

        error!("Task {} supervision aborted: {}", id, error);
        match table.update(&id, |task| task.mark_failed(error.clone(), None)) {
            Ok(true) => events.emit(Event::task_failed(id, error, None)).await,
            Ok(false) => {}
            Err(e) => error!("Task {} could not be marked failed: {}", id, e),
        }
    }

    async fn supervise(&self) -> Result<(), StorageError> {
        let id = self.task.id;

        let mut log = match TaskLog::open(&self.task.log_file).await {
            Ok(log) => log,
            Err(e) => {
                let message = format!(
                    "failed to open log file {}: {}",
                    self.task.log_file.display(),
                    e
                );
                return self.fail(message, None).await;
            }
        };

        let command = ScriptCommand::for_task(&self.task);
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return self
                    .fail(format!("failed to launch '{}': {}", command, e), None)
                    .await;
            }
        };

        self.table.update(&id, |task| task.mark_running())?;
        info!("Task {} running: {}", id, command);
        self.events.emit(Event::task_started(id)).await;
        let started = Instant::now();

        let stderr_text = match self.capture(&mut child, &mut log).await {
            Ok(stderr_text) => stderr_text,
            Err(SupervisorError::Storage(e)) => {
                let _ = child.start_kill();
                return Err(e);
            }
            Err(SupervisorError::Io(e)) => {
                let _ = child.start_kill();
                let code = child.wait().await.ok().and_then(|status| status.code());
                return self
                    .fail(format!("output capture failed: {}", e), code)
                    .await;
            }
        };

        let status = match child.wait().await {
            Ok(status) => status,
            Err(e) => {
                return self
                    .fail(format!("failed to wait for script: {}", e), None)
                    .await;
            }
        };

        match status.code() {
            Some(0) => {
                self.table.update(&id, |task| task.mark_succeeded(0))?;
                let duration = started.elapsed();
                info!("Task {} succeeded in {:?}", id, duration);
                self.events
                    .emit(Event::task_completed(id, 0, duration))
                    .await;
                Ok(())
            }
            Some(code) => {
                let message = if stderr_text.trim().is_empty() {
                    format!("script exited with code {}", code)
                } else {
                    stderr_text
                };
                self.fail(message, Some(code)).await
            }
            None => self.fail("script terminated by signal", None).await,
        }
    }

    /// Stream the child's output into the log and the record.
    ///
    /// Returns everything the child wrote to stderr.
    async fn capture(&self, child: &mut Child, log: &mut TaskLog) -> Result<String, SupervisorError> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("stderr was not captured"))?;

        let (line_tx, mut line_rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_lines(stdout, Stream::Stdout, line_tx.clone()));
        tokio::spawn(forward_lines(stderr, Stream::Stderr, line_tx));

        let mut lines_seen = 0usize;
        let mut stderr_text = String::new();

        while let Some((stream, line)) = line_rx.recv().await {
            let line = line?;
            lines_seen += 1;
            if stream == Stream::Stderr {
                stderr_text.push_str(&line);
            }
            self.record_line(log, line, lines_seen).await?;
        }

        Ok(stderr_text)
    }

    async fn record_line(
        &self,
        log: &mut TaskLog,
        line: String,
        lines_seen: usize,
    ) -> Result<(), SupervisorError> {
        let id = self.task.id;
        log.append(&line).await?;
        let progress = self.table.update(&id, |task| {
            task.append_output(&line, lines_seen);
            task.progress
        })?;
        debug!("Task {} [{}%] {}", id, progress, line.trim_end());
        self.events
            .emit(Event::task_output(id, line, progress))
            .await;
        Ok(())
    }

    async fn fail(&self, error: impl Into<String>, return_code: Option<i32>) -> Result<(), StorageError> {
        let id: TaskId = self.task.id;
        let error = error.into();
        self.table
            .update(&id, |task| task.mark_failed(error.clone(), return_code))?;
        warn!("Task {} failed: {}", id, error.trim_end());
        self.events
            .emit(Event::task_failed(id, error, return_code))
            .await;
        Ok(())
    }
}

/// Text of a panic payload, when it carries one.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => message.to_string(),
            Err(_) => "unknown panic".to_string(),
        },
    }
}

/// Read `reader` line by line and forward each line, newline included.
///
/// Bytes are decoded lossily so non-UTF-8 output cannot stall capture. A
/// final line without a trailing newline is forwarded as-is.
async fn forward_lines<R>(
    reader: R,
    stream: Stream,
    tx: mpsc::UnboundedSender<(Stream, io::Result<String>)>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send((stream, Ok(line))).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send((stream, Err(e)));
                break;
            }
        }
    }
}
