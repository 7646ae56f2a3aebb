use super::bullets;
use crate::command::CommandName;
use crate::dispatch::Invocation;
use crate::error::{HelperError, Result};
use crate::response::SlackResponse;

/// `help` lists every command; `help <command>` shows its usage.
pub(super) fn run(inv: &Invocation<'_>) -> Result<SlackResponse> {
    let bot = &inv.bot.config.bot;
    let topic = inv
        .args
        .subcommand
        .as_deref()
        .or_else(|| inv.args.positionals.first().map(String::as_str));

    let Some(topic) = topic else {
        let text = bullets(
            CommandName::all().iter().map(|c| {
                let props = c.properties();
                format!("`{}`  {}", props.name, props.summary)
            }),
            "",
        );
        return Ok(SlackResponse::attachment(
            format!("{} commands", bot.name),
            format!("{text}\nUse `{} help <command>` for details.", bot.command),
        ));
    };

    let command = CommandName::lookup(topic).ok_or_else(|| HelperError::Missing {
        kind: "command",
        name: topic.to_string(),
    })?;
    Ok(SlackResponse::attachment(
        format!("{} {}", bot.command, command),
        command.properties().help_text(),
    ))
}
