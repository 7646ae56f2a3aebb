//! Command handlers.
//!
//! Every subcommand in the property table has one function here. First-stage
//! handlers take an [`Invocation`]; confirmation and long-task stages take
//! the bot plus the typed state they were handed.

mod artifact;
mod backup;
mod build;
mod deploy;
mod help;
mod image;
mod role;
mod service;
mod stack;
mod test;
mod version;

use crate::command::CommandName;
use crate::confirm::{Confirmation, ConfirmLabel, CANCEL_VALUE};
use crate::dispatch::{Bot, Caller, Invocation};
use crate::error::{BudError, Result};
use crate::longtask::LongTaskKind;
use crate::response::{Button, SlackResponse};

pub(crate) fn run(inv: &Invocation<'_>) -> Result<SlackResponse> {
    match inv.command {
        CommandName::Help => help::run(inv),
        CommandName::Version => version::run(inv),
        CommandName::Service => service::run(inv),
        CommandName::Backup => backup::run(inv),
        CommandName::Deploy => deploy::run(inv),
        CommandName::Build => build::run(inv),
        CommandName::Test => test::run(inv),
        CommandName::Stack => stack::run(inv),
        CommandName::Role => role::run(inv),
        CommandName::Image => image::run(inv),
        CommandName::Artifact => artifact::run(inv),
    }
}

pub(crate) fn confirm(bot: &Bot, caller: &Caller, confirmation: Confirmation) -> Result<SlackResponse> {
    match confirmation {
        Confirmation::BackupCreate { env, table } => backup::confirmed(bot, caller, &env, &table),
        Confirmation::DeployRegion {
            service,
            env,
            region,
            version,
        } => deploy::next_step(
            bot,
            caller,
            deploy::Draft {
                service,
                env,
                region: Some(region),
                version,
            },
        ),
        Confirmation::DeployVersion {
            service,
            env,
            region,
            version,
        } => deploy::next_step(
            bot,
            caller,
            deploy::Draft {
                service,
                env,
                region: Some(region),
                version: Some(version),
            },
        ),
        Confirmation::DeployConfirm {
            service,
            env,
            region,
            version,
        } => deploy::submit(bot, caller, service, env, region, version),
    }
}

pub(crate) fn long_task(bot: &Bot, caller: &Caller, task: &LongTaskKind) -> Result<SlackResponse> {
    match task {
        LongTaskKind::Deploy {
            service,
            env,
            region,
            version,
        } => deploy::execute(bot, caller, service, env, region, version),
        LongTaskKind::TestResults { service, build } => test::execute(bot, service, *build),
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// The subcommand resolved but this module has no function for it.
fn unhandled(inv: &Invocation<'_>) -> BudError {
    BudError::InvalidCommand(format!("{} {}", inv.command, inv.sub.name))
}

/// `• line` per item, or `empty` when there are none.
fn bullets(lines: impl IntoIterator<Item = String>, empty: impl Into<String>) -> String {
    let lines: Vec<String> = lines.into_iter().map(|l| format!("• {l}")).collect();
    if lines.is_empty() {
        empty.into()
    } else {
        lines.join("\n")
    }
}

/// A message with one button per choice plus a Cancel button.
fn choice_prompt(label: ConfirmLabel, text: String, choices: Vec<(String, Confirmation)>) -> SlackResponse {
    let mut buttons: Vec<Button> = choices
        .into_iter()
        .map(|(text, c)| Button::new("choice", text, c.encode()))
        .collect();
    buttons.push(Button::new("choice", "Cancel", CANCEL_VALUE));
    SlackResponse::from_attachments(Vec::new()).with_buttons(label.fallback(), text, buttons)
}

/// A yes/cancel prompt for one pending action.
fn confirm_prompt(text: String, yes: &str, confirmation: Confirmation) -> SlackResponse {
    let label = confirmation.label();
    let buttons = vec![
        Button::new("confirm", yes, confirmation.encode()).primary(),
        Button::new("confirm", "Cancel", CANCEL_VALUE).danger(),
    ];
    SlackResponse::from_attachments(Vec::new()).with_buttons(label.fallback(), text, buttons)
}
