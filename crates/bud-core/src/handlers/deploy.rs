//! `deploy start`: a multi-step confirmation flow ending in a long task.
//!
//! 1. Missing region and several candidates: ask with one button per region.
//! 2. Missing version: ask with the newest image tags.
//! 3. Everything known: ask Deploy/Cancel.
//! 4. Deploy clicked: relay a long task that updates the stack.

use std::collections::BTreeMap;

use super::{choice_prompt, confirm_prompt, unhandled};
use crate::confirm::{describe_fields, ConfirmLabel, Confirmation};
use crate::dispatch::{Bot, Caller, Invocation};
use crate::error::{BudError, Result};
use crate::longtask::{LongTaskKind, LongTaskRequest};
use crate::response::{SlackResponse, COLOR_DANGER, COLOR_GOOD};
use crate::stack::{stack_name, StackRequest};
use crate::storage::has_tag;
use crate::store::{DeployRecord, DeployStatus, ServiceRecord};
use crate::types::Role;

/// Number of image tags offered as version buttons.
const VERSION_CHOICES: usize = 5;

#[derive(Debug, Clone)]
pub(super) struct Draft {
    pub service: String,
    pub env: String,
    pub region: Option<String>,
    pub version: Option<String>,
}

impl Draft {
    fn fields(&self) -> String {
        let mut fields = vec![("Service", self.service.as_str()), ("Environment", self.env.as_str())];
        if let Some(r) = &self.region {
            fields.push(("Region", r.as_str()));
        }
        if let Some(v) = &self.version {
            fields.push(("Version", v.as_str()));
        }
        describe_fields(&fields)
    }
}

pub(super) fn run(inv: &Invocation<'_>) -> Result<SlackResponse> {
    if inv.sub.name != "start" {
        return Err(unhandled(inv));
    }
    let draft = Draft {
        service: inv.switches.require("service")?.to_string(),
        env: inv.switches.require("env")?.to_string(),
        region: inv.switches.get("region").map(str::to_string),
        version: inv.switches.get("version").map(str::to_string),
    };
    next_step(inv.bot, &inv.caller, draft)
}

/// Deploying to a protected environment takes an admin.
fn check_protected(bot: &Bot, caller: &Caller, env: &str) -> Result<()> {
    if bot.config.environment(env)?.protected && !caller.role.allows(Role::Admin) {
        return Err(BudError::Forbidden {
            command: format!("deploy start -e {env}"),
            required: Role::Admin.to_string(),
            actual: caller.role.to_string(),
        });
    }
    Ok(())
}

/// Regions of `env` the service runs in.
fn candidate_regions(bot: &Bot, service: &ServiceRecord, env: &str) -> Result<Vec<String>> {
    let environment = bot.config.environment(env)?;
    Ok(environment
        .regions
        .iter()
        .filter(|r| service.regions.is_empty() || service.regions.contains(r))
        .cloned()
        .collect())
}

/// Ask for whatever the draft is still missing, or for the final go-ahead.
pub(super) fn next_step(bot: &Bot, caller: &Caller, mut draft: Draft) -> Result<SlackResponse> {
    let service = bot.catalog().service(&draft.service)?;
    check_protected(bot, caller, &draft.env)?;

    let candidates = candidate_regions(bot, &service, &draft.env)?;
    match &draft.region {
        Some(region) => {
            bot.config.resolve_region(&draft.env, Some(region.as_str()))?;
            if !candidates.contains(region) {
                return Err(BudError::User(format!(
                    "{} does not run in {region}",
                    service.name
                )));
            }
        }
        None => match candidates.as_slice() {
            [] => {
                return Err(BudError::User(format!(
                    "{} runs in no region of {}",
                    service.name, draft.env
                )))
            }
            [only] => draft.region = Some(only.clone()),
            _ => {
                let choices = candidates
                    .iter()
                    .map(|r| {
                        (
                            r.clone(),
                            Confirmation::DeployRegion {
                                service: draft.service.clone(),
                                env: draft.env.clone(),
                                region: r.clone(),
                                version: draft.version.clone(),
                            },
                        )
                    })
                    .collect();
                let text = format!("{}\nWhich region?", draft.fields());
                return Ok(choice_prompt(ConfirmLabel::DeployRegion, text, choices));
            }
        },
    }
    let region = draft.region.clone().unwrap_or_default();

    let repo = service.image_repository();
    let version = match &draft.version {
        Some(v) => {
            if !has_tag(bot.registry.as_ref(), repo, v)? {
                return Err(BudError::User(format!("no image tagged `{v}` in {repo}")));
            }
            v.clone()
        }
        None => {
            let tags = bot.registry.tags(repo)?;
            if tags.is_empty() {
                return Err(BudError::User(format!("no images found in {repo}")));
            }
            let choices = tags
                .into_iter()
                .take(VERSION_CHOICES)
                .map(|t| {
                    (
                        t.tag.clone(),
                        Confirmation::DeployVersion {
                            service: draft.service.clone(),
                            env: draft.env.clone(),
                            region: region.clone(),
                            version: t.tag,
                        },
                    )
                })
                .collect();
            let text = format!("{}\nWhich version?", draft.fields());
            return Ok(choice_prompt(ConfirmLabel::DeployVersion, text, choices));
        }
    };

    let mut text = draft.fields();
    if let Some(last) = bot.catalog().last_deploy(&service.name, &draft.env)? {
        text.push_str(&format!("\nCurrently deployed: `{}` in {}", last.version, last.region));
    }
    text.push_str("\nDeploy now?");
    Ok(confirm_prompt(
        text,
        "Deploy",
        Confirmation::DeployConfirm {
            service: draft.service,
            env: draft.env,
            region,
            version,
        },
    ))
}

/// The Deploy button was clicked: hand the work to the relay.
pub(super) fn submit(
    bot: &Bot,
    caller: &Caller,
    service: String,
    env: String,
    region: String,
    version: String,
) -> Result<SlackResponse> {
    bot.catalog().service(&service)?;
    check_protected(bot, caller, &env)?;

    let text = format!(
        "Deploying *{service}* `{version}` to *{env}* ({region}). I'll post the result here when it finishes."
    );
    let id = bot.relay.submit(LongTaskRequest {
        task: LongTaskKind::Deploy {
            service,
            env,
            region,
            version,
        },
        response_url: caller.response_url.clone(),
        requested_by: caller.user_id.clone(),
    })?;
    tracing::info!(task = %id, user = %caller.user_id, "deploy queued");
    Ok(SlackResponse::ephemeral(text).in_channel())
}

/// Long-task body: point the stack at the new image and record the deploy.
pub(super) fn execute(
    bot: &Bot,
    caller: &Caller,
    service: &str,
    env: &str,
    region: &str,
    version: &str,
) -> Result<SlackResponse> {
    bot.catalog().service(service)?;
    check_protected(bot, caller, env)?;
    let name = stack_name(service, env);
    let mut parameters = BTreeMap::new();
    parameters.insert("ImageTag".to_string(), version.to_string());
    parameters.insert("Environment".to_string(), env.to_string());

    let mut record = DeployRecord {
        service: service.to_string(),
        env: env.to_string(),
        region: region.to_string(),
        version: version.to_string(),
        stack_name: name.clone(),
        deployed_by: caller.user_id.clone(),
        deployed_at: bot.now(),
        status: DeployStatus::Failed,
    };

    let summary = match bot.stacks.apply(&StackRequest {
        name: name.clone(),
        region: region.to_string(),
        parameters,
    }) {
        Ok(summary) => summary,
        Err(e) => {
            bot.catalog().record_deploy(&record)?;
            return Err(e);
        }
    };

    let ok = summary.status.is_stable();
    if ok {
        record.status = DeployStatus::Succeeded;
    }
    bot.catalog().record_deploy(&record)?;
    tracing::info!(%service, %env, %region, %version, status = summary.status.as_str(), "deploy finished");

    let stack = format!("{name} {}", summary.status.as_str());
    let mut text = describe_fields(&[
        ("Service", service),
        ("Environment", env),
        ("Region", region),
        ("Version", version),
        ("Stack", stack.as_str()),
    ]);
    if let Some(endpoint) = summary.outputs.get("Endpoint") {
        text.push_str(&format!("\n*Endpoint:* {endpoint}"));
    }
    let (title, color) = if ok {
        ("Deploy finished", COLOR_GOOD)
    } else {
        ("Deploy failed", COLOR_DANGER)
    };
    let mut reply = SlackResponse::attachment(title, text).in_channel();
    reply.attachments[0].color = Some(color.to_string());
    Ok(reply)
}
