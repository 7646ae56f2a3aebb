use super::{bullets, unhandled};
use crate::confirm::describe_fields;
use crate::dispatch::Invocation;
use crate::error::Result;
use crate::response::SlackResponse;
use crate::timefmt;

pub(super) fn run(inv: &Invocation<'_>) -> Result<SlackResponse> {
    match inv.sub.name {
        "list" => list(inv),
        "info" => info(inv),
        _ => Err(unhandled(inv)),
    }
}

fn list(inv: &Invocation<'_>) -> Result<SlackResponse> {
    let services = inv.bot.catalog().services()?;
    let text = bullets(
        services.iter().map(|s| {
            let mut line = format!("*{}*  {}/{}", s.name, s.build_method, s.deploy_method);
            if let Some(owner) = &s.owner {
                line.push_str(&format!("  (owner: {owner})"));
            }
            line
        }),
        "No services registered.",
    );
    Ok(SlackResponse::attachment("Services", text))
}

fn info(inv: &Invocation<'_>) -> Result<SlackResponse> {
    let bot = inv.bot;
    let service = bot.catalog().service(inv.switches.require("service")?)?;
    let regions = if service.regions.is_empty() {
        "all regions of the environment".to_string()
    } else {
        service.regions.join(", ")
    };
    let mut text = describe_fields(&[
        ("Build", service.build_method.as_str()),
        ("Deploy", service.deploy_method.as_str()),
        ("Regions", regions.as_str()),
        ("Repository", service.image_repository()),
        ("Properties", service.properties_table.as_deref().unwrap_or("-")),
        ("Owner", service.owner.as_deref().unwrap_or("-")),
    ]);

    let now = bot.now();
    for env in bot.config.environments.keys() {
        if let Some(last) = bot.catalog().last_deploy(&service.name, env)? {
            text.push_str(&format!(
                "\nLast deploy to {env}: `{}` in {} by {}, {}",
                last.version,
                last.region,
                last.deployed_by,
                timefmt::age(last.deployed_at, now)
            ));
        }
    }
    Ok(SlackResponse::attachment(format!("Service: {}", service.name), text))
}
