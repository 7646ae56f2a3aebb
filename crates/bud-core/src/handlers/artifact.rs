use super::{bullets, unhandled};
use crate::dispatch::Invocation;
use crate::error::Result;
use crate::paths;
use crate::response::SlackResponse;

pub(super) fn run(inv: &Invocation<'_>) -> Result<SlackResponse> {
    match inv.sub.name {
        "list" => list(inv),
        _ => Err(unhandled(inv)),
    }
}

fn list(inv: &Invocation<'_>) -> Result<SlackResponse> {
    let bot = inv.bot;
    let service = bot.catalog().service(inv.switches.require("service")?)?;
    let prefix = match inv.switches.get("version") {
        Some(v) => paths::artifact_key(&service.name, v),
        None => format!("artifacts/{}/", service.name),
    };
    let objects = bot.objects.list(&prefix)?;
    let text = bullets(
        objects.iter().map(|o| format!("`{}`  {} bytes", o.key, o.size)),
        format!("No artifacts for {}.", service.name),
    );
    Ok(SlackResponse::attachment(format!("Artifacts: {}", service.name), text))
}
