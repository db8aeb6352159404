//! Lifecycle events and event handling.
//!
//! This module provides event emission for task lifecycle transitions,
//! giving observers a push-based view of what pollers see through the
//! engine's read operations.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::types::TaskId;

/// Lifecycle events emitted by a task's execution unit.
#[derive(Debug, Clone)]
pub enum Event {
    /// The child process launched and the task is running.
    TaskStarted { task_id: TaskId, timestamp: Instant },

    /// A line of output was captured.
    TaskOutput {
        task_id: TaskId,
        line: String,
        /// Progress after this line was recorded.
        progress: u8,
        timestamp: Instant,
    },

    /// The child exited with code 0.
    TaskCompleted {
        task_id: TaskId,
        return_code: i32,
        duration: Duration,
        timestamp: Instant,
    },

    /// The task failed to launch, exited nonzero, or its supervision broke.
    TaskFailed {
        task_id: TaskId,
        error: String,
        return_code: Option<i32>,
        timestamp: Instant,
    },
}

impl Event {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> Instant {
        match self {
            Event::TaskStarted { timestamp, .. } => *timestamp,
            Event::TaskOutput { timestamp, .. } => *timestamp,
            Event::TaskCompleted { timestamp, .. } => *timestamp,
            Event::TaskFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the task the event is about.
    pub fn task_id(&self) -> &TaskId {
        match self {
            Event::TaskStarted { task_id, .. } => task_id,
            Event::TaskOutput { task_id, .. } => task_id,
            Event::TaskCompleted { task_id, .. } => task_id,
            Event::TaskFailed { task_id, .. } => task_id,
        }
    }

    /// Whether this is the last event a task will emit.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::TaskCompleted { .. } | Event::TaskFailed { .. })
    }

    /// Create a TaskStarted event.
    pub fn task_started(task_id: TaskId) -> Self {
        Event::TaskStarted {
            task_id,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskOutput event.
    pub fn task_output(task_id: TaskId, line: impl Into<String>, progress: u8) -> Self {
        Event::TaskOutput {
            task_id,
            line: line.into(),
            progress,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskCompleted event.
    pub fn task_completed(task_id: TaskId, return_code: i32, duration: Duration) -> Self {
        Event::TaskCompleted {
            task_id,
            return_code,
            duration,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskFailed event.
    pub fn task_failed(task_id: TaskId, error: impl Into<String>, return_code: Option<i32>) -> Self {
        Event::TaskFailed {
            task_id,
            error: error.into(),
            return_code,
            timestamp: Instant::now(),
        }
    }
}

/// Handler for receiving lifecycle events.
///
/// Handlers run inline on the task's execution unit, one event at a time.
/// A slow handler delays how soon later lines reach the task record, but
/// not the script itself. A panicking handler fails the task.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: &Event);
}

/// Event bus for distributing events to registered handlers.
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    /// Create a new event bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register an event handler.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);
    }

    /// Emit an event to all registered handlers.
    pub async fn emit(&self, event: Event) {
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            handler.handle(&event).await;
        }
    }

    /// Get the number of registered handlers.
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
