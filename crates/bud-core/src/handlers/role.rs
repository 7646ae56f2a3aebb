use super::unhandled;
use crate::dispatch::Invocation;
use crate::error::Result;
use crate::response::SlackResponse;
use crate::types::Role;

pub(super) fn run(inv: &Invocation<'_>) -> Result<SlackResponse> {
    match inv.sub.name {
        "show" => show(inv),
        "set" => set(inv),
        _ => Err(unhandled(inv)),
    }
}

fn show(inv: &Invocation<'_>) -> Result<SlackResponse> {
    let user = inv.switches.get("user").unwrap_or(inv.caller.user_id.as_str());
    let text = match inv.bot.catalog().role_of(user)? {
        Some(role) => format!("{user} is {role}"),
        None => format!("{user} is {} (default)", inv.bot.config.default_role),
    };
    Ok(SlackResponse::ephemeral(text))
}

fn set(inv: &Invocation<'_>) -> Result<SlackResponse> {
    let user = inv.switches.require("user")?;
    let role: Role = inv.switches.require("level")?.parse()?;
    inv.bot.catalog().set_role(user, role)?;
    tracing::info!(%user, %role, by = %inv.caller.user_id, "role changed");
    Ok(SlackResponse::ephemeral(format!("{user} is now {role}")))
}
