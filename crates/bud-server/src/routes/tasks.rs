use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bud_core::longtask::{LongTask, LongTaskRequest};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// POST /tasks: enqueue a long task. Responds 202 with the task id.
pub async fn submit(
    State(app): State<AppState>,
    Json(request): Json<LongTaskRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let queue = app.queue.clone();
    let task = tokio::task::spawn_blocking(move || queue.enqueue(request))
        .await
        .map_err(AppError::join)??;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "id": task.id })),
    ))
}

/// GET /tasks: every task, newest first.
pub async fn list(State(app): State<AppState>) -> Result<Json<Vec<LongTask>>, AppError> {
    let queue = app.queue.clone();
    let tasks = tokio::task::spawn_blocking(move || queue.list())
        .await
        .map_err(AppError::join)??;
    Ok(Json(tasks))
}

/// GET /tasks/{id}
pub async fn get(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LongTask>, AppError> {
    let queue = app.queue.clone();
    let task = tokio::task::spawn_blocking(move || queue.get(id))
        .await
        .map_err(AppError::join)??;
    Ok(Json(task))
}
