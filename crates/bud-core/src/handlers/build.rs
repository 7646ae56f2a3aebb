use super::{bullets, unhandled};
use crate::confirm::describe_fields;
use crate::dispatch::Invocation;
use crate::error::{BudError, Result};
use crate::history::{BuildIndex, BuildRecord};
use crate::response::{SlackResponse, COLOR_DANGER, COLOR_GOOD};
use crate::timefmt;

pub(super) fn run(inv: &Invocation<'_>) -> Result<SlackResponse> {
    match inv.sub.name {
        "history" => history(inv),
        "info" => info(inv),
        "search" => search(inv),
        _ => Err(unhandled(inv)),
    }
}

fn summary_line(b: &BuildRecord, now: chrono::DateTime<chrono::Utc>) -> String {
    let mut line = format!(
        "#{} `{}` {} {}, {}",
        b.build_number,
        b.branch,
        b.version,
        b.status.as_str(),
        timefmt::age(b.started_at, now)
    );
    if let Some(msg) = &b.message {
        line.push_str(&format!(": {msg}"));
    }
    line
}

fn history(inv: &Invocation<'_>) -> Result<SlackResponse> {
    let bot = inv.bot;
    let service = bot.catalog().service(inv.switches.require("service")?)?;
    let branch = inv.switches.get("branch");
    let count = inv.switches.count_or("count", 5)?;
    let builds = bot.history().latest_builds(&service.name, branch, count)?;
    let now = bot.now();
    let empty = match branch {
        Some(b) => format!("No builds of {} on {b}.", service.name),
        None => format!("No builds of {}.", service.name),
    };
    let text = bullets(builds.iter().map(|b| summary_line(b, now)), empty);
    Ok(SlackResponse::attachment(format!("Builds: {}", service.name), text))
}

fn info(inv: &Invocation<'_>) -> Result<SlackResponse> {
    let bot = inv.bot;
    let service = inv.switches.require("service")?;
    let number = inv.switches.number_or("build", 0)?;
    let history = bot.history();
    let build = history
        .find_build(service, number)?
        .ok_or_else(|| BudError::BuildNotFound {
            service: service.to_string(),
            build: number,
        })?;

    let started = timefmt::display(build.started_at);
    let finished = build
        .finished_at
        .map(timefmt::display)
        .unwrap_or_else(|| "-".to_string());
    let mut text = describe_fields(&[
        ("Branch", build.branch.as_str()),
        ("Commit", build.commit.as_str()),
        ("Version", build.version.as_str()),
        ("Status", build.status.as_str()),
        ("Started", started.as_str()),
        ("Finished", finished.as_str()),
    ]);
    if let Some(msg) = &build.message {
        text.push_str(&format!("\n{msg}"));
    }
    if let Some(run) = history.find_test_run(service, number)? {
        text.push_str(&format!(
            "\nTests: {} passed, {} failed, {} skipped",
            run.passed, run.failed, run.skipped
        ));
    }
    let color = if build.status == crate::history::BuildStatus::Failed {
        COLOR_DANGER
    } else {
        COLOR_GOOD
    };
    let mut reply = SlackResponse::attachment(format!("{} #{}", build.service, build.build_number), text);
    reply.attachments[0].color = Some(color.to_string());
    Ok(reply)
}

fn search(inv: &Invocation<'_>) -> Result<SlackResponse> {
    let bot = inv.bot;
    let query = inv.switches.require("query")?;
    let count = inv.switches.count_or("count", 10)?;
    let builds = bot.history().builds()?;
    let index = BuildIndex::build(&builds)?;
    let hits = index.search(query, count)?;
    let text = bullets(
        hits.iter().map(|h| {
            format!(
                "{} #{} `{}` {} ({})",
                h.service, h.build_number, h.branch, h.status, h.version
            )
        }),
        format!("No builds match `{query}`."),
    );
    Ok(SlackResponse::attachment("Build search", text))
}
