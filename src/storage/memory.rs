//! In-memory task table.
//!
//! Thread-safe storage using a single RwLock for the whole table.
//! Data is not persisted across restarts.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::StorageError;
use crate::core::task::{Task, TaskStatus};
use crate::core::types::TaskId;

#[derive(Default)]
struct TableInner {
    tasks: HashMap<TaskId, Task>,
    /// Tasks whose execution unit has been scheduled.
    dispatched: HashSet<TaskId>,
}

/// In-memory table of every task created in this process.
pub struct TaskTable {
    inner: RwLock<TableInner>,
}

impl TaskTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(TableInner::default()),
        }
    }

    /// Insert a freshly created task.
    pub fn insert(&self, task: Task) -> Result<(), StorageError> {
        let mut inner = self.inner.write().map_err(|_| StorageError::LockPoisoned)?;
        if inner.tasks.contains_key(&task.id) {
            return Err(StorageError::DuplicateKey(format!("task: {}", task.id)));
        }
        inner.tasks.insert(task.id, task);
        Ok(())
    }

    /// Get a snapshot of a task.
    pub fn get(&self, id: &TaskId) -> Result<Task, StorageError> {
        let inner = self.inner.read().map_err(|_| StorageError::LockPoisoned)?;
        inner
            .tasks
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("task: {}", id)))
    }

    /// Snapshot every task, in no particular order.
    pub fn list(&self) -> Result<Vec<Task>, StorageError> {
        let inner = self.inner.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(inner.tasks.values().cloned().collect())
    }

    /// Current accumulated output of a task.
    pub fn output(&self, id: &TaskId) -> Result<String, StorageError> {
        let inner = self.inner.read().map_err(|_| StorageError::LockPoisoned)?;
        inner
            .tasks
            .get(id)
            .map(|task| task.output.clone())
            .ok_or_else(|| StorageError::NotFound(format!("task: {}", id)))
    }

    /// Number of tasks in the table.
    pub fn len(&self) -> Result<usize, StorageError> {
        let inner = self.inner.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(inner.tasks.len())
    }

    /// Whether the table has no tasks.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Reserve a pending task for execution and return its snapshot.
    ///
    /// Succeeds at most once per task, so only one execution unit is ever
    /// scheduled for it.
    pub fn claim(&self, id: &TaskId) -> Result<Task, StorageError> {
        let mut inner = self.inner.write().map_err(|_| StorageError::LockPoisoned)?;
        let task = inner
            .tasks
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("task: {}", id)))?;
        if task.status != TaskStatus::Pending || !inner.dispatched.insert(*id) {
            return Err(StorageError::AlreadyDispatched(format!(
                "task: {} ({})",
                id, task.status
            )));
        }
        Ok(task)
    }

    /// Apply a mutation to one task under the write lock.
    ///
    /// Everything `f` changes becomes visible to readers atomically.
    pub fn update<R>(&self, id: &TaskId, f: impl FnOnce(&mut Task) -> R) -> Result<R, StorageError> {
        let mut inner = self.inner.write().map_err(|_| StorageError::LockPoisoned)?;
        let task = inner
            .tasks
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("task: {}", id)))?;
        Ok(f(task))
    }
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}
