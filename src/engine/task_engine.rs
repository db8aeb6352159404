//! The task engine.
//!
//! [`TaskEngine`] is the single source of truth for task existence and
//! state. It is explicitly constructed, cheap to clone (all clones share one
//! table), and handed to whatever layer routes requests to it.
//!
//! # Example
//!
//! ```no_run
//! use taskdeck::TaskEngine;
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), taskdeck::EngineError> {
//! let engine = TaskEngine::new("logs")?;
//! let id = engine.create_task("alice", "/opt/scripts/backup.sh", vec!["--full".into()])?;
//! engine.execute_task(&id)?;
//!
//! let task = engine.wait_for_completion(&id, Duration::from_millis(250)).await?;
//! println!("{} finished: {}", task.id, task.status);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::types::{EngineError, NewTask};
use crate::core::task::Task;
use crate::core::types::TaskId;
use crate::events::EventBus;
use crate::execution::{ExecutionUnit, log_path, read_log};
use crate::storage::TaskTable;

/// Creates, runs and tracks script tasks.
#[derive(Clone)]
pub struct TaskEngine {
    table: Arc<TaskTable>,
    events: Arc<EventBus>,
    logs_dir: PathBuf,
}

impl TaskEngine {
    /// Create an engine writing task logs under `logs_dir`.
    ///
    /// The directory is created if it does not exist.
    pub fn new(logs_dir: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let logs_dir = logs_dir.into();
        std::fs::create_dir_all(&logs_dir)?;
        Ok(Self {
            table: Arc::new(TaskTable::new()),
            events: Arc::new(EventBus::new()),
            logs_dir,
        })
    }

    /// Use the given event bus for lifecycle notifications.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Arc::new(events);
        self
    }

    /// The event bus execution units report to.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Directory holding the per-task log files.
    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Create a pending task. Does not start it.
    pub fn create_task(
        &self,
        user_name: impl Into<String>,
        script_path: impl Into<PathBuf>,
        args: Vec<String>,
    ) -> Result<TaskId, EngineError> {
        self.create_task_with(NewTask::new(user_name, script_path).with_args(args))
    }

    /// Create a pending task from a full request.
    pub fn create_task_with(&self, new: NewTask) -> Result<TaskId, EngineError> {
        let id = TaskId::new();
        let task = Task::new(
            id,
            new.user_name,
            new.script_path,
            new.args,
            log_path(&self.logs_dir, &id),
        )
        .with_interpreter(new.interpreter);

        info!(
            "Task {} created for '{}': {}",
            id,
            task.user_name,
            task.script_path.display()
        );
        self.table.insert(task)?;
        Ok(id)
    }

    /// Start a pending task in the background and return immediately.
    ///
    /// Must be called from within a Tokio runtime. Script failures are not
    /// reported here; poll [`TaskEngine::get_task`] to observe them.
    pub fn execute_task(&self, id: &TaskId) -> Result<(), EngineError> {
        let task = self.table.claim(id)?;
        let unit = ExecutionUnit::new(Arc::clone(&self.table), Arc::clone(&self.events), task);
        tokio::spawn(unit.run());
        info!("Task {} dispatched", id);
        Ok(())
    }

    /// Snapshot of one task.
    pub fn get_task(&self, id: &TaskId) -> Result<Task, EngineError> {
        Ok(self.table.get(id)?)
    }

    /// Snapshot of every task created by this engine, in no particular order.
    pub fn get_all_tasks(&self) -> Result<Vec<Task>, EngineError> {
        Ok(self.table.list()?)
    }

    /// Full output captured so far for a task.
    pub fn get_task_logs(&self, id: &TaskId) -> Result<String, EngineError> {
        Ok(self.table.output(id)?)
    }

    /// Contents of a task's on-disk log file.
    ///
    /// Empty if execution has not opened the file yet.
    pub async fn read_log_file(&self, id: &TaskId) -> Result<String, EngineError> {
        let task = self.table.get(id)?;
        Ok(read_log(&task.log_file).await?)
    }

    /// Poll a task every `poll_interval` until it reaches a terminal state.
    pub async fn wait_for_completion(
        &self,
        id: &TaskId,
        poll_interval: Duration,
    ) -> Result<Task, EngineError> {
        loop {
            let task = self.get_task(id)?;
            if task.is_finished() {
                return Ok(task);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
