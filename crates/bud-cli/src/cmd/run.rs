use std::path::Path;

use bud_core::CommandRequest;

use crate::output::print_reply;

/// Dispatch `text` as if `user` had typed it, then run any long task it queued.
pub fn run(root: &Path, text: &str, user: &str, json: bool) -> anyhow::Result<()> {
    let session = super::Session::open(root)?;
    let bot = &session.bot;
    let request = CommandRequest {
        text: text.to_string(),
        user_id: user.to_string(),
        user_name: user.to_string(),
        channel_id: "local".to_string(),
        response_url: super::LOCAL_RESPONSE_URL.to_string(),
    };
    let reply = bot.dispatch(&request);
    print_reply(&reply, json)?;
    session.deliver_submitted(json)
}
