use std::io::Read;
use std::path::Path;

use bud_core::response::Envelope;
use bud_core::CommandRequest;
use serde::Deserialize;

use crate::output::print_json;

/// A slash-command event as delivered to an event-triggered function.
#[derive(Debug, Deserialize)]
struct SlashEvent {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    response_url: String,
}

/// Read one event from stdin and print the `Envelope` the function returns.
/// Long tasks stay queued for `bud tasks drain` or the server worker.
pub fn run(root: &Path) -> anyhow::Result<()> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let envelope = handle(root, &input)?;
    print_json(&envelope)
}

fn handle(root: &Path, input: &str) -> anyhow::Result<Envelope> {
    let event: SlashEvent = match serde_json::from_str(input) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(error = %e, "malformed event");
            return Ok(Envelope::bad_request(&format!("malformed event: {e}")));
        }
    };

    let (bot, _queue) = super::open_bot(root)?;
    if let Err(e) = bot.verify_token(event.token.as_deref()) {
        tracing::warn!(user = %event.user_id, "rejected event with bad token");
        return Ok(Envelope::bad_request(&e.to_string()));
    }

    let request = CommandRequest {
        text: event.text,
        user_id: event.user_id,
        user_name: event.user_name,
        channel_id: event.channel_id,
        response_url: event.response_url,
    };
    Ok(Envelope::ok(&bot.dispatch(&request)))
}
