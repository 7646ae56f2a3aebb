use axum::extract::State;
use axum::{Form, Json};
use bud_core::confirm::InteractionPayload;
use bud_core::response::SlackResponse;
use bud_core::CommandRequest;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// Form fields of a slash-command request.
#[derive(Debug, Default, Deserialize)]
pub struct SlashCommandForm {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub team_domain: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub response_url: String,
    #[serde(default)]
    pub trigger_id: String,
}

/// POST /slack/commands
pub async fn command(
    State(app): State<AppState>,
    Form(form): Form<SlashCommandForm>,
) -> Result<Json<SlackResponse>, AppError> {
    app.bot.verify_token(form.token.as_deref())?;
    tracing::debug!(
        team = %form.team_id,
        channel = %form.channel_name,
        command = %form.command,
        "slash command"
    );
    let request = CommandRequest {
        text: form.text,
        user_id: form.user_id,
        user_name: form.user_name,
        channel_id: form.channel_id,
        response_url: form.response_url,
    };
    let bot = app.bot.clone();
    let reply = tokio::task::spawn_blocking(move || bot.dispatch(&request))
        .await
        .map_err(AppError::join)?;
    Ok(Json(reply))
}

#[derive(Debug, Deserialize)]
pub struct ActionForm {
    pub payload: String,
}

/// POST /slack/actions: a button click.
pub async fn action(
    State(app): State<AppState>,
    Form(form): Form<ActionForm>,
) -> Result<Json<SlackResponse>, AppError> {
    let payload: InteractionPayload = serde_json::from_str(&form.payload)
        .map_err(|e| AppError::bad_request(format!("malformed interaction payload: {e}")))?;
    app.bot.verify_token(payload.token.as_deref())?;
    let bot = app.bot.clone();
    let reply = tokio::task::spawn_blocking(move || bot.confirm(&payload))
        .await
        .map_err(AppError::join)?;
    Ok(Json(reply))
}
