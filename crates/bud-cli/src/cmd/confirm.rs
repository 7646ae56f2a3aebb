use std::path::Path;

use anyhow::Context;
use bud_core::confirm::InteractionPayload;

use crate::output::print_reply;

/// Feed a button-click payload to the confirmation relay.
pub fn run(root: &Path, payload: &str, json: bool) -> anyhow::Result<()> {
    let mut payload: InteractionPayload =
        serde_json::from_str(payload).context("malformed interaction payload")?;
    if payload.response_url.is_empty() {
        payload.response_url = super::LOCAL_RESPONSE_URL.to_string();
    }

    let session = super::Session::open(root)?;
    let bot = &session.bot;
    let reply = bot.confirm(&payload);
    print_reply(&reply, json)?;
    session.deliver_submitted(json)
}
