//! CI ingestion: build pipelines report builds and test runs here.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use bud_core::history::{BuildRecord, TestRun};

use crate::error::AppError;
use crate::state::AppState;

/// POST /history/builds
pub async fn record_build(
    State(app): State<AppState>,
    Json(build): Json<BuildRecord>,
) -> Result<(StatusCode, Json<BuildRecord>), AppError> {
    let bot = app.bot.clone();
    let build = tokio::task::spawn_blocking(move || {
        bot.history().record_build(&build)?;
        Ok::<_, bud_core::BudError>(build)
    })
    .await
    .map_err(AppError::join)??;
    tracing::info!(service = %build.service, build = build.build_number, "build recorded");
    Ok((StatusCode::CREATED, Json(build)))
}

/// POST /history/tests
pub async fn record_test_run(
    State(app): State<AppState>,
    Json(run): Json<TestRun>,
) -> Result<(StatusCode, Json<TestRun>), AppError> {
    let bot = app.bot.clone();
    let run = tokio::task::spawn_blocking(move || {
        bot.history().record_test_run(&run)?;
        Ok::<_, bud_core::BudError>(run)
    })
    .await
    .map_err(AppError::join)??;
    tracing::info!(service = %run.service, build = run.build_number, "test run recorded");
    Ok((StatusCode::CREATED, Json(run)))
}
