//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::core::task::Task;

/// Body of `POST /api/execute`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecuteRequest {
    /// Who is asking for the run. Required and non-blank.
    pub user_name: Option<String>,
    /// Catalog name of the script; defaults to the sample script.
    pub script_type: Option<String>,
    /// Arguments passed verbatim to the script.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// A single task snapshot.
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub success: bool,
    pub task: Task,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            success: true,
            task,
        }
    }
}

/// List of task snapshots, newest first.
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub success: bool,
    pub tasks: Vec<Task>,
    pub count: usize,
}

impl From<Vec<Task>> for TaskListResponse {
    fn from(mut tasks: Vec<Task>) -> Self {
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let count = tasks.len();
        Self {
            success: true,
            tasks,
            count,
        }
    }
}

/// Accumulated output of a task.
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub success: bool,
    pub logs: String,
}

/// Catalog entry summary.
#[derive(Debug, Serialize)]
pub struct ScriptSummary {
    pub name: String,
    pub description: Option<String>,
}

/// List of runnable scripts.
#[derive(Debug, Serialize)]
pub struct ScriptListResponse {
    pub success: bool,
    pub scripts: Vec<ScriptSummary>,
    pub count: usize,
}
