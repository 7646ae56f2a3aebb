use crate::dispatch::Invocation;
use crate::error::Result;
use crate::response::SlackResponse;

pub(super) fn run(inv: &Invocation<'_>) -> Result<SlackResponse> {
    Ok(SlackResponse::attachment(
        inv.bot.config.bot.name.clone(),
        format!("version {}", env!("CARGO_PKG_VERSION")),
    ))
}
