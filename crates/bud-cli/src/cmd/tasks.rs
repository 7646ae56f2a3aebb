use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use bud_core::longtask::{self, TaskQueue};
use bud_core::webhook::HttpWebhook;
use bud_core::{paths, timefmt};
use clap::Subcommand;

use crate::output::{print_json, print_table};

#[derive(Subcommand)]
pub enum TasksSubcommand {
    /// Show queued, running and finished long tasks (newest first)
    List,

    /// Run every pending long task and post its result to its response URL
    Drain,
}

pub fn run(root: &Path, subcmd: TasksSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TasksSubcommand::List => list(root, json),
        TasksSubcommand::Drain => drain(root, json),
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let queue = TaskQueue::open(&paths::queue_db(root)).context("failed to open task queue")?;
    let tasks = queue.list()?;
    if json {
        return print_json(&tasks);
    }
    if tasks.is_empty() {
        println!("No long tasks.");
        return Ok(());
    }
    let rows = tasks
        .iter()
        .map(|t| {
            vec![
                t.id.to_string(),
                t.request.task.name().to_string(),
                t.status.as_str().to_string(),
                t.attempts.to_string(),
                timefmt::display(t.created_at),
                t.last_error.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["ID", "TASK", "STATUS", "ATTEMPTS", "CREATED", "LAST ERROR"], rows);
    Ok(())
}

fn drain(root: &Path, json: bool) -> anyhow::Result<()> {
    let (bot, queue) = super::open_bot(root)?;
    let webhook = HttpWebhook::new(Duration::from_secs(bot.config.webhook.timeout_secs));
    let outcomes = longtask::drain(&bot, &queue, &webhook)?;

    if json {
        let value: Vec<_> = outcomes
            .iter()
            .map(|o| serde_json::json!({ "id": o.id, "status": o.status }))
            .collect();
        return print_json(&value);
    }
    if outcomes.is_empty() {
        println!("No pending long tasks.");
    }
    for o in &outcomes {
        println!("{}  {}", o.id, o.status.as_str());
    }
    Ok(())
}
