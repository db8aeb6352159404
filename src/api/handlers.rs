//! API request handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;

use crate::core::types::TaskId;
use crate::engine::{NewTask, TaskEngine};
use crate::scripts::ScriptCatalog;

use super::errors::ApiError;
use super::responses::{
    ExecuteRequest, HealthResponse, LogsResponse, ScriptListResponse, ScriptSummary,
    TaskListResponse, TaskResponse,
};

/// Shared application state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub engine: TaskEngine,
    pub catalog: Arc<ScriptCatalog>,
}

fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    TaskId::from_string(raw).map_err(|_| ApiError::NotFound(format!("task not found: {}", raw)))
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Create a task for a catalog script and start it.
pub async fn execute(
    State(state): State<ApiState>,
    body: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let Json(request) = body?;

    let user_name = request
        .user_name
        .ok_or_else(|| ApiError::BadRequest("user_name is required".to_string()))?;
    let user_name = user_name.trim();
    if user_name.is_empty() {
        return Err(ApiError::BadRequest("user_name cannot be empty".to_string()));
    }

    let script_type = request
        .script_type
        .unwrap_or_else(|| ScriptCatalog::default_script_type().to_string());
    let script = state.catalog.resolve(&script_type)?;

    let new = NewTask::new(user_name, script.path)
        .with_args(request.args)
        .with_interpreter(script.interpreter);
    let id = state.engine.create_task_with(new)?;
    state.engine.execute_task(&id)?;

    let task = state.engine.get_task(&id)?;
    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

/// List all tasks, newest first.
pub async fn list_tasks(State(state): State<ApiState>) -> Result<Json<TaskListResponse>, ApiError> {
    let tasks = state.engine.get_all_tasks()?;
    Ok(Json(TaskListResponse::from(tasks)))
}

/// Get a specific task.
pub async fn get_task(
    State(state): State<ApiState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let id = parse_task_id(&task_id)?;
    let task = state.engine.get_task(&id)?;
    Ok(Json(TaskResponse::from(task)))
}

/// Get the accumulated output of a task.
pub async fn get_task_logs(
    State(state): State<ApiState>,
    Path(task_id): Path<String>,
) -> Result<Json<LogsResponse>, ApiError> {
    let id = parse_task_id(&task_id)?;
    let logs = state.engine.get_task_logs(&id)?;
    Ok(Json(LogsResponse {
        success: true,
        logs,
    }))
}

/// List the scripts that can be executed.
pub async fn list_scripts(State(state): State<ApiState>) -> Json<ScriptListResponse> {
    let scripts: Vec<ScriptSummary> = state
        .catalog
        .names()
        .map(|name| ScriptSummary {
            name: name.to_string(),
            description: state
                .catalog
                .describe(name)
                .map(ToString::to_string),
        })
        .collect();
    let count = scripts.len();
    Json(ScriptListResponse {
        success: true,
        scripts,
        count,
    })
}
