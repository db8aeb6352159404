//! HTTP API module.
//!
//! Provides REST endpoints for starting scripts and polling their tasks.
//! Every handler is a thin translation onto [`TaskEngine`] operations.

mod errors;
mod handlers;
mod responses;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::ApiState;
pub use responses::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiSettings;
use crate::engine::TaskEngine;
use crate::scripts::ScriptCatalog;

/// Build the API router with all endpoints.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(handlers::health))
        // Scripts
        .route("/api/scripts", get(handlers::list_scripts))
        .route("/api/execute", post(handlers::execute))
        // Tasks
        .route("/api/tasks", get(handlers::list_tasks))
        .route("/api/tasks/{task_id}", get(handlers::get_task))
        .route("/api/tasks/{task_id}/logs", get(handlers::get_task_logs))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Create the API state from an engine and a script catalog.
pub fn create_api_state(engine: TaskEngine, catalog: ScriptCatalog) -> ApiState {
    ApiState {
        engine,
        catalog: Arc::new(catalog),
    }
}

/// Start the API server.
///
/// This function spawns the server and returns a handle to the task.
/// The server runs until the task is aborted or the process exits.
pub async fn start_server(
    settings: &ApiSettings,
    state: ApiState,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let router = build_router(state);
    let addr = settings
        .socket_addr()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("API server listening on http://{}", listener.local_addr()?);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(handle)
}
