use super::{bullets, confirm_prompt, unhandled};
use crate::confirm::{describe_fields, Confirmation};
use crate::dispatch::{Bot, Caller, Invocation};
use crate::error::{BudError, Result};
use crate::response::SlackResponse;
use crate::store::env_table;
use crate::timefmt;

pub(super) fn run(inv: &Invocation<'_>) -> Result<SlackResponse> {
    match inv.sub.name {
        "create" => create(inv),
        "list" => list(inv),
        _ => Err(unhandled(inv)),
    }
}

/// Physical table name, after checking that both the environment and the
/// table exist.
fn existing_table(bot: &Bot, env: &str, table: &str) -> Result<String> {
    bot.config.environment(env)?;
    let name = env_table(env, table);
    if !bot.tables.tables()?.contains(&name) {
        return Err(BudError::TableNotFound(format!("{table} in {env}")));
    }
    Ok(name)
}

fn create(inv: &Invocation<'_>) -> Result<SlackResponse> {
    let env = inv.switches.require("env")?;
    let table = inv.switches.require("table")?;
    existing_table(inv.bot, env, table)?;

    let text = format!(
        "{}\nCreate an on-demand backup now?",
        describe_fields(&[("Environment", env), ("Table", table)])
    );
    Ok(confirm_prompt(
        text,
        "Create backup",
        Confirmation::BackupCreate {
            env: env.to_string(),
            table: table.to_string(),
        },
    ))
}

pub(super) fn confirmed(bot: &Bot, caller: &Caller, env: &str, table: &str) -> Result<SlackResponse> {
    let physical = existing_table(bot, env, table)?;
    let now = bot.now();
    let name = timefmt::backup_name(table, now);
    let info = bot.tables.create_backup(&physical, &name, now)?;
    tracing::info!(%env, %table, backup = %name, items = info.items, user = %caller.user_id, "backup created");
    Ok(SlackResponse::attachment(
        "Create Backup",
        format!("Starting backup: {name}\n{} items from {table} in {env}", info.items),
    ))
}

fn list(inv: &Invocation<'_>) -> Result<SlackResponse> {
    let bot = inv.bot;
    let env = inv.switches.require("env")?;
    let table = inv.switches.require("table")?;
    let physical = existing_table(bot, env, table)?;
    let backups = bot.tables.list_backups(&physical)?;
    let text = bullets(
        backups.iter().map(|b| {
            format!("`{}`  {} items, {}", b.name, b.items, timefmt::display(b.created_at))
        }),
        format!("No backups of {table} in {env}."),
    );
    Ok(SlackResponse::attachment(format!("Backups: {table} ({env})"), text))
}

#[cfg(test)]
mod tests {
    use crate::confirm::{ConfirmLabel, Confirmation};
    use crate::dispatch::testing::*;
    use crate::types::Role;

    #[test]
    fn create_asks_for_confirmation() {
        let f = fixture();
        let reply = f.run(DEV, "backup create -e dev -t Orders");
        let a = &reply.attachments[0];
        assert_eq!(a.callback_id.as_deref(), Some("backup_create"));
        assert_eq!(a.fallback.as_deref(), Some("backup_create"));
        assert_eq!(a.actions.len(), 2);
        let c = Confirmation::decode(ConfirmLabel::BackupCreate, &a.actions[0].value, "")
            .unwrap()
            .unwrap();
        assert_eq!(
            c,
            Confirmation::BackupCreate {
                env: "dev".into(),
                table: "Orders".into()
            }
        );
        assert_eq!(a.actions[1].value, "cancel");
    }

    #[test]
    fn create_rejects_unknown_table_and_env() {
        let f = fixture();
        let text = f.run(DEV, "backup create -e dev -t Nope").plain_text();
        assert!(text.contains("table not found: Nope in dev"), "{text}");
        let text = f.run(DEV, "backup create -e qa -t Orders").plain_text();
        assert!(text.contains("unknown environment 'qa'"), "{text}");
    }

    #[test]
    fn confirmed_backup_is_named_by_timestamp() {
        let f = fixture();
        let reply = super::confirmed(&f.bot, &caller(DEV, Role::Developer), "dev", "Orders").unwrap();
        assert_eq!(reply.attachments[0].title.as_deref(), Some("Create Backup"));
        assert!(reply
            .plain_text()
            .contains("Starting backup: Orders-2024-Jan-01-1200"));

        let listed = f.run(VIEWER, "backup list -e dev -t Orders").plain_text();
        assert!(listed.contains("`Orders-2024-Jan-01-1200`  3 items"), "{listed}");
    }

    #[test]
    fn list_without_backups() {
        let f = fixture();
        let text = f.run(VIEWER, "backup list -e prod -t Orders").plain_text();
        assert!(text.contains("No backups of Orders in prod."), "{text}");
    }

    #[test]
    fn backup_needs_a_subcommand() {
        let f = fixture();
        let text = f.run(DEV, "backup -e dev -t Orders").plain_text();
        assert!(text.contains("needs a subcommand"), "{text}");
    }
}
