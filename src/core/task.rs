//! Task records and their state machine.
//!
//! A [`Task`] is the engine's record of one requested script execution.
//! Every mutation goes through one of the `mark_*` / [`Task::append_output`]
//! methods below, each of which moves all dependent fields together so a
//! snapshot taken under the table lock is always self-consistent:
//!
//! ```text
//! pending ──► running ──► success
//!    │           │
//!    │           └──────► failed
//!    └──────────────────► failed   (launch failure)
//! ```
//!
//! Terminal states are sticky: once a task is `success` or `failed`, every
//! further transition is refused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::types::TaskId;

/// Highest progress value a task can report while still running.
pub const MAX_RUNNING_PROGRESS: u8 = 95;

/// Progress credited for each captured line of output.
pub const PROGRESS_PER_LINE: u8 = 5;

/// Heuristic progress for a running task that has emitted `lines_seen` lines.
///
/// Each line is worth [`PROGRESS_PER_LINE`], capped at
/// [`MAX_RUNNING_PROGRESS`]. Only a terminal transition sets 100.
pub fn running_progress(lines_seen: usize) -> u8 {
    let credited = lines_seen.saturating_mul(PROGRESS_PER_LINE as usize);
    credited.min(MAX_RUNNING_PROGRESS as usize) as u8
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, execution not started.
    Pending,
    /// Child process is alive and being supervised.
    Running,
    /// Child exited with code 0.
    Success,
    /// Child exited nonzero, could not be launched, or supervision failed.
    Failed,
}

impl TaskStatus {
    /// Whether no further transition can leave this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }

    /// Lowercase name, as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked script execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, the sole lookup key.
    pub id: TaskId,
    /// Free-text label supplied by the caller.
    pub user_name: String,
    /// Path of the script to execute.
    pub script_path: PathBuf,
    /// Program used to run `script_path`, if it is not directly executable.
    pub interpreter: Option<String>,
    /// Arguments passed verbatim to the script.
    pub args: Vec<String>,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Heuristic completion estimate, 0-100.
    pub progress: u8,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the child process was launched.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Combined output captured so far.
    pub output: String,
    /// Error-stream text or a failure description.
    pub error: String,
    /// Exit code of the child process.
    pub return_code: Option<i32>,
    /// On-disk mirror of `output`.
    pub log_file: PathBuf,
}

impl Task {
    /// Create a new pending task.
    pub fn new(
        id: TaskId,
        user_name: impl Into<String>,
        script_path: impl Into<PathBuf>,
        args: Vec<String>,
        log_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            user_name: user_name.into(),
            script_path: script_path.into(),
            interpreter: None,
            args,
            status: TaskStatus::Pending,
            progress: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            output: String::new(),
            error: String::new(),
            return_code: None,
            log_file: log_file.into(),
        }
    }

    /// Set the interpreter used to launch the script.
    pub fn with_interpreter(mut self, interpreter: Option<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Whether the task has finished, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move `pending -> running`. Returns false if the task was not pending.
    pub fn mark_running(&mut self) -> bool {
        if self.status != TaskStatus::Pending {
            return false;
        }
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
        true
    }

    /// Append one captured chunk of output and refresh progress.
    ///
    /// `lines_seen` is the total number of lines captured so far, including
    /// this one. Ignored unless the task is running.
    pub fn append_output(&mut self, chunk: &str, lines_seen: usize) -> bool {
        if self.status != TaskStatus::Running {
            return false;
        }
        self.output.push_str(chunk);
        self.progress = self.progress.max(running_progress(lines_seen));
        true
    }

    /// Move `running -> success` with the child's exit code.
    pub fn mark_succeeded(&mut self, return_code: i32) -> bool {
        if self.status != TaskStatus::Running {
            return false;
        }
        self.status = TaskStatus::Success;
        self.return_code = Some(return_code);
        self.finish();
        true
    }

    /// Move a non-terminal task to `failed`.
    ///
    /// Covers both a running child that exited nonzero and a pending task
    /// whose child never launched.
    pub fn mark_failed(&mut self, error: impl Into<String>, return_code: Option<i32>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Failed;
        self.error = error.into();
        self.return_code = return_code;
        self.finish();
        true
    }

    fn finish(&mut self) {
        self.progress = 100;
        self.completed_at = Some(Utc::now());
    }

    /// Wall-clock time between launch and completion, if both happened.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}
