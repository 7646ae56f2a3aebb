pub mod auth;
pub mod error;
pub mod routes;
pub mod state;
pub mod worker;

use std::path::PathBuf;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(state: AppState) -> Router {
    // Everything that can start work on the bot's behalf carries a signature.
    let signed = Router::new()
        .route("/slack/commands", post(routes::slack::command))
        .route("/slack/actions", post(routes::slack::action))
        .route("/tasks", post(routes::tasks::submit))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::slack_signature,
        ));

    Router::new()
        .merge(signed)
        // Long tasks
        .route("/tasks", get(routes::tasks::list))
        .route("/tasks/{id}", get(routes::tasks::get))
        // CI ingestion
        .route("/history/builds", post(routes::history::record_build))
        .route("/history/tests", post(routes::history::record_test_run))
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the bot's HTTP server and queue worker on `port`.
pub async fn serve(root: PathBuf, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(root, listener).await
}

/// Start the server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(root: PathBuf, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let state = tokio::task::spawn_blocking(move || AppState::open(&root)).await??;
    worker::spawn_worker(state.clone());
    let app = build_router(state);

    tracing::info!("SlackBud listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
