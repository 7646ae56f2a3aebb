use super::unhandled;
use crate::dispatch::Invocation;
use crate::error::{BudError, Result};
use crate::response::SlackResponse;
use crate::stack::stack_name;
use crate::timefmt;

pub(super) fn run(inv: &Invocation<'_>) -> Result<SlackResponse> {
    match inv.sub.name {
        "describe" => describe(inv),
        _ => Err(unhandled(inv)),
    }
}

/// Without a region, every region of the environment the service runs in
/// is described.
fn describe(inv: &Invocation<'_>) -> Result<SlackResponse> {
    let bot = inv.bot;
    let service = bot.catalog().service(inv.switches.require("service")?)?;
    let env = inv.switches.require("env")?;
    let regions: Vec<String> = match inv.switches.get("region") {
        Some(r) => bot.config.resolve_region(env, Some(r))?.into_iter().collect(),
        None => bot
            .config
            .environment(env)?
            .regions
            .iter()
            .filter(|r| service.regions.is_empty() || service.regions.contains(r))
            .cloned()
            .collect(),
    };

    let name = stack_name(&service.name, env);
    let mut sections = Vec::new();
    for region in &regions {
        let Some(stack) = bot.stacks.describe(&name, region)? else {
            continue;
        };
        let mut lines = vec![format!("*{}* ({}): {}", stack.name, stack.region, stack.status.as_str())];
        for (k, v) in stack.parameters.iter().chain(stack.outputs.iter()) {
            lines.push(format!("    {k}: {v}"));
        }
        lines.push(format!("    Updated: {}", timefmt::display(stack.updated_at)));
        sections.push(lines.join("\n"));
    }
    if sections.is_empty() {
        return Err(BudError::StackNotFound(format!("{name} in {}", regions.join(", "))));
    }
    Ok(SlackResponse::attachment(format!("Stack: {name}"), sections.join("\n")))
}

#[cfg(test)]
mod tests {
    use crate::dispatch::testing::*;
    use crate::longtask::{LongTaskKind, LongTaskRequest};

    #[test]
    fn missing_stack() {
        let f = fixture();
        let text = f.run(VIEWER, "stack describe -s api -e dev").plain_text();
        assert!(text.contains("stack not found: api-dev in us-east-1"), "{text}");
    }

    #[test]
    fn describes_deployed_stack() {
        let f = fixture();
        f.bot.run_long_task(&LongTaskRequest {
            task: LongTaskKind::Deploy {
                service: "api".into(),
                env: "prod".into(),
                region: "us-west-2".into(),
                version: "1.0.3".into(),
            },
            response_url: String::new(),
            requested_by: ADMIN.into(),
        });
        let text = f.run(VIEWER, "stack -s api -e prod").plain_text();
        assert!(text.contains("*api-prod* (us-west-2): CREATE_COMPLETE"), "{text}");
        assert!(text.contains("ImageTag: 1.0.3"), "{text}");
        assert!(!text.contains("us-east-1)"), "{text}");
    }
}
