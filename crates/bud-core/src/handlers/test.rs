use super::unhandled;
use crate::dispatch::{Bot, Invocation};
use crate::error::Result;
use crate::longtask::{LongTaskKind, LongTaskRequest};
use crate::poll::poll;
use crate::response::{SlackResponse, COLOR_DANGER, COLOR_GOOD, COLOR_WARNING};

pub(super) fn run(inv: &Invocation<'_>) -> Result<SlackResponse> {
    match inv.sub.name {
        "results" => results(inv),
        _ => Err(unhandled(inv)),
    }
}

fn results(inv: &Invocation<'_>) -> Result<SlackResponse> {
    let bot = inv.bot;
    let service = bot.catalog().service(inv.switches.require("service")?)?;
    let build = inv.switches.number_or("build", 0)?;
    let id = bot.relay.submit(LongTaskRequest {
        task: LongTaskKind::TestResults {
            service: service.name.clone(),
            build,
        },
        response_url: inv.caller.response_url.clone(),
        requested_by: inv.caller.user_id.clone(),
    })?;
    tracing::debug!(task = %id, "test results task queued");

    let cfg = &bot.config.poll;
    Ok(SlackResponse::ephemeral(format!(
        "Waiting for test results of *{}* #{build}. Checking every {}s, up to {} times.",
        service.name, cfg.interval_secs, cfg.attempts
    )))
}

/// Long-task body: poll the history store until the run shows up.
pub(super) fn execute(bot: &Bot, service: &str, build: u64) -> Result<SlackResponse> {
    let policy = bot.config.poll.policy();
    let history = bot.history();
    let found = poll(policy, bot.sleeper.as_ref(), |_| {
        history.find_test_run(service, build)
    })?;

    let title = format!("Test results: {service} #{build}");
    let reply = match found {
        Some(run) => {
            let mut text = format!(
                "{} passed, {} failed, {} skipped",
                run.passed, run.failed, run.skipped
            );
            if let Some(url) = &run.report_url {
                text.push_str(&format!("\nReport: {url}"));
            }
            let color = if run.succeeded() { COLOR_GOOD } else { COLOR_DANGER };
            let mut reply = SlackResponse::attachment(title, text);
            reply.attachments[0].color = Some(color.to_string());
            reply
        }
        None => {
            let mut reply = SlackResponse::attachment(
                title,
                format!("No test results after {} checks.", policy.attempts),
            );
            reply.attachments[0].color = Some(COLOR_WARNING.to_string());
            reply
        }
    };
    Ok(reply.in_channel())
}

#[cfg(test)]
mod tests {
    use crate::dispatch::testing::*;
    use crate::longtask::LongTaskKind;

    #[test]
    fn results_are_relayed() {
        let f = fixture();
        let reply = f.run(VIEWER, "test results -s api -n 4");
        assert!(reply.plain_text().contains("Waiting for test results of *api* #4"));
        let submitted = f.relay.submitted();
        assert_eq!(
            submitted[0].task,
            LongTaskKind::TestResults {
                service: "api".into(),
                build: 4
            }
        );
        assert_eq!(submitted[0].response_url, "https://hooks.example/response");
    }

    #[test]
    fn execute_reports_failures() {
        let f = fixture();
        let text = super::execute(&f.bot, "api", 4).unwrap().plain_text();
        assert!(text.contains("120 passed, 3 failed, 0 skipped"), "{text}");
    }

    #[test]
    fn execute_gives_up_after_configured_attempts() {
        let f = fixture();
        let text = super::execute(&f.bot, "api", 2).unwrap().plain_text();
        assert!(text.contains("No test results after 10 checks."), "{text}");
    }
}
