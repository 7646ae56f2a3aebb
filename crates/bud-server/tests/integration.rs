use std::sync::Arc;

use axum::http::StatusCode;
use bud_core::config::Config;
use bud_core::longtask::TaskQueue;
use bud_core::seed::SeedData;
use bud_core::storage::FsObjectStore;
use bud_core::store::MemoryTableStore;
use bud_core::webhook::RecordingWebhook;
use bud_core::Bot;
use bud_server::{build_router, AppState};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    state: AppState,
    webhook: Arc<RecordingWebhook>,
    _dir: TempDir,
}

/// Seeded in-memory bot with a real on-disk queue.
fn harness(configure: impl FnOnce(&mut Config)) -> Harness {
    let dir = TempDir::new().unwrap();
    let mut config = Config::new("TestBud");
    configure(&mut config);
    let queue = Arc::new(TaskQueue::open(&dir.path().join("queue.redb")).unwrap());
    let bot = Bot::new(
        config,
        Arc::new(MemoryTableStore::new()),
        Arc::new(FsObjectStore::new(dir.path().join("objects"))),
        queue.clone(),
    );
    SeedData::demo(bot.now()).apply(&bot).unwrap();
    let webhook = Arc::new(RecordingWebhook::new());
    let state = AppState::new(Arc::new(bot), queue, webhook.clone());
    Harness {
        state,
        webhook,
        _dir: dir,
    }
}

fn form(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Minimal `application/x-www-form-urlencoded` encoding.
fn encode(s: &str) -> String {
    let mut out = String::new();
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

async fn send(app: axum::Router, req: axum::http::Request<axum::body::Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Send a form POST via `oneshot` and return (status, parsed JSON body).
async fn post_form(
    app: axum::Router,
    uri: &str,
    body: String,
    headers: &[(&str, String)],
) -> (StatusCode, serde_json::Value) {
    let mut builder = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded");
    for (k, v) in headers {
        builder = builder.header(*k, v);
    }
    send(app, builder.body(axum::body::Body::from(body)).unwrap()).await
}

async fn post_json(app: axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, req).await
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    send(app, req).await
}

fn all_text(reply: &serde_json::Value) -> String {
    let mut parts = Vec::new();
    if let Some(t) = reply["text"].as_str() {
        parts.push(t.to_string());
    }
    for a in reply["attachments"].as_array().into_iter().flatten() {
        for key in ["title", "text"] {
            if let Some(t) = a[key].as_str() {
                parts.push(t.to_string());
            }
        }
    }
    parts.join("\n")
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_ok() {
    let h = harness(|_| {});
    let (status, body) = get(build_router(h.state.clone()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// ---------------------------------------------------------------------------
// Slash commands
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slash_command_returns_chat_response() {
    let h = harness(|_| {});
    let body = form(&[("text", "service list"), ("user_id", "U1"), ("command", "/bud")]);
    let (status, reply) = post_form(build_router(h.state.clone()), "/slack/commands", body, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["response_type"], "ephemeral");
    assert!(all_text(&reply).contains("*api*"), "{reply}");
}

#[tokio::test]
async fn unknown_command_is_still_200() {
    let h = harness(|_| {});
    let body = form(&[("text", "launch rockets"), ("user_id", "U1")]);
    let (status, reply) = post_form(build_router(h.state.clone()), "/slack/commands", body, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(all_text(&reply).contains("launch rockets"));
}

#[tokio::test]
async fn wrong_token_is_rejected() {
    let h = harness(|c| c.slack.verification_token = Some("expected".into()));
    let body = form(&[("token", "other"), ("text", "help"), ("user_id", "U1")]);
    let (status, reply) = post_form(build_router(h.state.clone()), "/slack/commands", body, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["error"], "invalid request token");

    let body = form(&[("token", "expected"), ("text", "help"), ("user_id", "U1")]);
    let (status, _) = post_form(build_router(h.state.clone()), "/slack/commands", body, &[]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signature_is_required_when_secret_is_set() {
    let secret = "shh";
    let h = harness(|c| c.slack.signing_secret = Some(secret.into()));
    let body = form(&[("text", "version"), ("user_id", "U1")]);

    let (status, reply) =
        post_form(build_router(h.state.clone()), "/slack/commands", body.clone(), &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply["error"], "missing request timestamp");

    let ts = chrono::Utc::now().timestamp().to_string();
    let sig = bud_server::auth::sign(secret, &ts, body.as_bytes()).unwrap();
    let headers = [
        (bud_server::auth::TIMESTAMP_HEADER, ts.clone()),
        (bud_server::auth::SIGNATURE_HEADER, sig),
    ];
    let (status, reply) =
        post_form(build_router(h.state.clone()), "/slack/commands", body.clone(), &headers).await;
    assert_eq!(status, StatusCode::OK);
    assert!(all_text(&reply).contains("TestBud"));

    let forged = [
        (bud_server::auth::TIMESTAMP_HEADER, ts),
        (bud_server::auth::SIGNATURE_HEADER, "v0=00ff".to_string()),
    ];
    let (status, _) = post_form(build_router(h.state.clone()), "/slack/commands", body, &forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signature_does_not_guard_other_routes() {
    let h = harness(|c| c.slack.signing_secret = Some("shh".into()));
    let (status, _) = get(build_router(h.state.clone()), "/health").await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Button clicks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_click_replaces_message() {
    let h = harness(|c| c.default_role = bud_core::types::Role::Developer);
    let payload = serde_json::json!({
        "type": "interactive_message",
        "callback_id": "backup_create",
        "actions": [{"name": "confirm", "value": "cancel", "type": "button"}],
        "user": {"id": "U1", "name": "ada"},
        "response_url": "https://hooks.example/1"
    });
    let body = form(&[("payload", &payload.to_string())]);
    let (status, reply) = post_form(build_router(h.state.clone()), "/slack/actions", body, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["replace_original"], true);
    assert_eq!(reply["text"], "Cancelled.");
}

#[tokio::test]
async fn backup_confirmation_round_trip() {
    let h = harness(|c| c.default_role = bud_core::types::Role::Developer);
    let body = form(&[("text", "backup create -e dev -t Orders"), ("user_id", "U1")]);
    let (_, prompt) = post_form(build_router(h.state.clone()), "/slack/commands", body, &[]).await;
    let attachment = &prompt["attachments"][0];
    assert_eq!(attachment["callback_id"], "backup_create");

    let payload = serde_json::json!({
        "callback_id": attachment["callback_id"],
        "actions": [attachment["actions"][0]],
        "user": {"id": "U1"},
        "response_url": "https://hooks.example/1",
        "original_message": prompt,
    });
    let body = form(&[("payload", &payload.to_string())]);
    let (status, reply) = post_form(build_router(h.state.clone()), "/slack/actions", body, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(all_text(&reply).contains("Starting backup: Orders-"), "{reply}");
}

#[tokio::test]
async fn malformed_payload_is_400() {
    let h = harness(|_| {});
    let body = form(&[("payload", "{not json")]);
    let (status, reply) = post_form(build_router(h.state.clone()), "/slack/actions", body, &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(reply["error"].as_str().unwrap().contains("malformed interaction payload"));
}

// ---------------------------------------------------------------------------
// Long tasks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_results_command_is_queued_and_delivered() {
    let h = harness(|_| {});
    let body = form(&[
        ("text", "test results -s api -n 3"),
        ("user_id", "U1"),
        ("response_url", "https://hooks.example/results"),
    ]);
    let (status, ack) = post_form(build_router(h.state.clone()), "/slack/commands", body, &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(all_text(&ack).contains("Waiting for test results"));

    let (_, tasks) = get(build_router(h.state.clone()), "/tasks").await;
    assert_eq!(tasks.as_array().unwrap().len(), 1);
    assert_eq!(tasks[0]["status"]["type"], "pending");

    let state = h.state.clone();
    let processed = tokio::task::spawn_blocking(move || bud_server::worker::tick(&state))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(processed, 1);

    let posted = h.webhook.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].0, "https://hooks.example/results");
    assert!(posted[0].1.plain_text().contains("128 passed"));

    let id = tasks[0]["id"].as_str().unwrap().to_string();
    let (status, task) = get(build_router(h.state.clone()), &format!("/tasks/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"]["type"], "completed");
}

#[tokio::test]
async fn tasks_can_be_submitted_directly() {
    let h = harness(|_| {});
    let request = serde_json::json!({
        "task": {"name": "test_results", "service": "api", "build": 4},
        "response_url": "",
        "requested_by": "ci"
    });
    let (status, body) = post_json(build_router(h.state.clone()), "/tasks", request).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body["id"].is_string());
}

#[tokio::test]
async fn submitted_deploy_runs_with_the_requesters_role() {
    let h = harness(|_| {});
    let request = serde_json::json!({
        "task": {
            "name": "deploy",
            "service": "api",
            "env": "prod",
            "region": "us-west-2",
            "version": "1.0.3"
        },
        "response_url": "https://hooks.example/deploy",
        "requested_by": "U_SOMEONE"
    });
    let (status, _) = post_json(build_router(h.state.clone()), "/tasks", request).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let state = h.state.clone();
    tokio::task::spawn_blocking(move || bud_server::worker::tick(&state))
        .await
        .unwrap()
        .unwrap();

    let posted = h.webhook.posted();
    assert_eq!(posted.len(), 1);
    let text = posted[0].1.plain_text();
    assert!(text.contains("you need the developer role"), "{text}");
    assert!(h.state.bot.catalog().last_deploy("api", "prod").unwrap().is_none());
}

#[tokio::test]
async fn task_submission_requires_signature_when_secret_is_set() {
    let h = harness(|c| c.slack.signing_secret = Some("shh".into()));
    let request = serde_json::json!({
        "task": {"name": "test_results", "service": "api", "build": 3}
    });
    let (status, _) = post_json(build_router(h.state.clone()), "/tasks", request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, tasks) = get(build_router(h.state.clone()), "/tasks").await;
    assert_eq!(status, StatusCode::OK);
    assert!(tasks.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_task_is_404() {
    let h = harness(|_| {});
    let (status, _) = get(
        build_router(h.state.clone()),
        "/tasks/00000000-0000-0000-0000-000000000000",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// CI ingestion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ingested_build_is_visible_to_commands() {
    let h = harness(|_| {});
    let build = serde_json::json!({
        "service": "web",
        "build_number": 11,
        "branch": "main",
        "commit": "deadbee",
        "version": "1.0.4",
        "status": "succeeded",
        "started_at": "2024-01-01T10:00:00Z"
    });
    let (status, _) = post_json(build_router(h.state.clone()), "/history/builds", build).await;
    assert_eq!(status, StatusCode::CREATED);

    let run = serde_json::json!({
        "service": "web",
        "build_number": 11,
        "passed": 10,
        "failed": 1,
        "finished_at": "2024-01-01T10:05:00Z"
    });
    let (status, _) = post_json(build_router(h.state.clone()), "/history/tests", run).await;
    assert_eq!(status, StatusCode::CREATED);

    let body = form(&[("text", "build info -s web -n 11"), ("user_id", "U1")]);
    let (_, reply) = post_form(build_router(h.state.clone()), "/slack/commands", body, &[]).await;
    let text = all_text(&reply);
    assert!(text.contains("*Commit:* deadbee"), "{text}");
    assert!(text.contains("10 passed, 1 failed"), "{text}");
}

#[tokio::test]
async fn malformed_build_is_rejected() {
    let h = harness(|_| {});
    let (status, _) = post_json(
        build_router(h.state.clone()),
        "/history/builds",
        serde_json::json!({"service": "web"}),
    )
    .await;
    assert!(status.is_client_error());
}
