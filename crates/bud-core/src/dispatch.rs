//! Command routing and the [`Bot`] that owns every collaborator.
//!
//! Three entry points reach the handlers:
//! - [`Bot::dispatch`] for slash-command text,
//! - [`Bot::confirm`] for button clicks,
//! - [`Bot::run_long_task`] for relayed long tasks.
//!
//! None of them return errors. User-facing failures become an error reply,
//! anything else is logged and replaced by the generic error text.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::args::{self, ParsedArgs};
use crate::command::CommandName;
use crate::config::Config;
use crate::confirm::{ConfirmLabel, Confirmation, InteractionPayload};
use crate::error::{BudError, Result};
use crate::handlers;
use crate::history::HistoryStore;
use crate::longtask::{LongTaskRelay, LongTaskRequest};
use crate::paths;
use crate::poll::{Sleeper, ThreadSleeper};
use crate::properties::{SubcommandProperties, Switches};
use crate::response::SlackResponse;
use crate::stack::{StackOrchestrator, TableStacks};
use crate::storage::{FsObjectStore, ImageRegistry, ObjectStore, TableRegistry};
use crate::store::{Catalog, RedbTableStore, TableStore};
use crate::types::Role;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// An incoming slash command.
#[derive(Debug, Clone, Default)]
pub struct CommandRequest {
    /// Everything after the slash command itself.
    pub text: String,
    pub user_id: String,
    pub user_name: String,
    pub channel_id: String,
    /// Where long tasks post their result.
    pub response_url: String,
}

impl CommandRequest {
    pub fn new(text: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user_id: user_id.into(),
            ..Default::default()
        }
    }
}

/// Who clicked, and where the answer goes.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub user_id: String,
    pub user_name: String,
    pub response_url: String,
    pub role: Role,
}

/// Everything a first-stage handler gets.
pub struct Invocation<'a> {
    pub bot: &'a Bot,
    pub command: CommandName,
    pub sub: &'static SubcommandProperties,
    pub args: &'a ParsedArgs,
    pub switches: Switches,
    pub caller: Caller,
}

pub struct Bot {
    pub config: Config,
    pub tables: Arc<dyn TableStore>,
    pub stacks: Arc<dyn StackOrchestrator>,
    pub objects: Arc<dyn ObjectStore>,
    pub registry: Arc<dyn ImageRegistry>,
    pub relay: Arc<dyn LongTaskRelay>,
    pub sleeper: Arc<dyn Sleeper>,
    clock: Clock,
}

impl Bot {
    /// A bot whose stack and image metadata live in `tables`.
    pub fn new(
        config: Config,
        tables: Arc<dyn TableStore>,
        objects: Arc<dyn ObjectStore>,
        relay: Arc<dyn LongTaskRelay>,
    ) -> Self {
        Self {
            config,
            stacks: Arc::new(TableStacks::new(tables.clone())),
            registry: Arc::new(TableRegistry::new(tables.clone())),
            tables,
            objects,
            relay,
            sleeper: Arc::new(ThreadSleeper),
            clock: Arc::new(Utc::now),
        }
    }

    /// Open the persistent stores under `root`.
    pub fn open(root: &Path, config: Config, relay: Arc<dyn LongTaskRelay>) -> Result<Self> {
        let tables = Arc::new(RedbTableStore::open(&paths::tables_db(root))?);
        let objects = Arc::new(FsObjectStore::new(paths::objects_dir(root)));
        Ok(Self::new(config, tables, objects, relay))
    }

    pub fn with_stacks(mut self, stacks: Arc<dyn StackOrchestrator>) -> Self {
        self.stacks = stacks;
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn ImageRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(self.tables.as_ref())
    }

    pub fn history(&self) -> HistoryStore<'_> {
        HistoryStore::new(self.tables.as_ref())
    }

    /// Stored role of `user_id`, or the configured default.
    pub fn role_of(&self, user_id: &str) -> Result<Role> {
        Ok(self
            .catalog()
            .role_of(user_id)?
            .unwrap_or(self.config.default_role))
    }

    /// Check a request's verification token. Passes when none is configured.
    pub fn verify_token(&self, token: Option<&str>) -> Result<()> {
        match self.config.slack.verification_token.as_deref() {
            None | Some("") => Ok(()),
            Some(expected) if token == Some(expected) => Ok(()),
            Some(_) => Err(BudError::InvalidToken),
        }
    }

    // -----------------------------------------------------------------------
    // Slash commands
    // -----------------------------------------------------------------------

    pub fn dispatch(&self, request: &CommandRequest) -> SlackResponse {
        match self.try_dispatch(request) {
            Ok(Some(reply)) => reply,
            Ok(None) => {
                tracing::info!(text = %request.text, "unrecognized command");
                SlackResponse::invalid_command(&request.text)
            }
            Err(e) => error_reply("command", &request.text, e),
        }
    }

    fn try_dispatch(&self, request: &CommandRequest) -> Result<Option<SlackResponse>> {
        let args = args::parse(&request.text)?;
        let Some(command) = CommandName::lookup(&args.command) else {
            return Ok(None);
        };
        let props = command.properties();
        let sub = props.resolve(&args)?;
        let switches = sub.validate(props.name, &args)?;
        let role = self.role_of(&request.user_id)?;
        require_role(command, sub, role)?;

        tracing::info!(
            command = command.as_str(),
            subcommand = sub.name,
            user = %request.user_id,
            run_type = sub.run_type.as_str(),
            "dispatching"
        );
        let inv = Invocation {
            bot: self,
            command,
            sub,
            args: &args,
            switches,
            caller: Caller {
                user_id: request.user_id.clone(),
                user_name: request.user_name.clone(),
                response_url: request.response_url.clone(),
                role,
            },
        };
        handlers::run(&inv).map(Some)
    }

    // -----------------------------------------------------------------------
    // Button clicks
    // -----------------------------------------------------------------------

    pub fn confirm(&self, payload: &InteractionPayload) -> SlackResponse {
        let Some(label) = ConfirmLabel::from_fallback(&payload.callback_id) else {
            tracing::warn!(label = %payload.callback_id, "unknown confirmation label");
            return SlackResponse::invalid_command("");
        };
        match self.try_confirm(label, payload) {
            Ok(reply) => reply.replacing(),
            Err(e) => error_reply("confirmation", label.fallback(), e).replacing(),
        }
    }

    fn try_confirm(&self, label: ConfirmLabel, payload: &InteractionPayload) -> Result<SlackResponse> {
        let action = payload
            .actions
            .first()
            .ok_or_else(|| BudError::StaleConfirmation("no button in payload".to_string()))?;
        let role = self.role_of(&payload.user.id)?;
        let (command, sub_name) = label.origin();
        if let Some(sub) = command.properties().subcommand(sub_name) {
            require_role(command, sub, role)?;
        }
        let caller = Caller {
            user_id: payload.user.id.clone(),
            user_name: payload.user.name.clone(),
            response_url: payload.response_url.clone(),
            role,
        };
        tracing::info!(label = label.fallback(), user = %caller.user_id, "confirmation clicked");
        match Confirmation::decode(label, &action.value, &payload.original_text())? {
            None => Ok(SlackResponse::ephemeral("Cancelled.")),
            Some(confirmation) => handlers::confirm(self, &caller, confirmation),
        }
    }

    // -----------------------------------------------------------------------
    // Long tasks
    // -----------------------------------------------------------------------

    /// Run a queued task as its requester.
    ///
    /// The requester's role is looked up again here: a request reaching the
    /// queue from outside chat carries no proof of who sent it.
    pub fn run_long_task(&self, request: &LongTaskRequest) -> SlackResponse {
        tracing::info!(task = request.task.name(), user = %request.requested_by, "running long task");
        match self.try_long_task(request) {
            Ok(reply) => reply,
            Err(e) => error_reply("long task", request.task.name(), e).in_channel(),
        }
    }

    fn try_long_task(&self, request: &LongTaskRequest) -> Result<SlackResponse> {
        let role = self.role_of(&request.requested_by)?;
        let (command, sub_name) = request.task.origin();
        if let Some(sub) = command.properties().subcommand(sub_name) {
            require_role(command, sub, role)?;
        }
        let caller = Caller {
            user_id: request.requested_by.clone(),
            user_name: String::new(),
            response_url: request.response_url.clone(),
            role,
        };
        handlers::long_task(self, &caller, &request.task)
    }
}

fn require_role(command: CommandName, sub: &SubcommandProperties, role: Role) -> Result<()> {
    if role.allows(sub.role) {
        return Ok(());
    }
    Err(BudError::Forbidden {
        command: format!("{} {}", command.as_str(), sub.name),
        required: sub.role.to_string(),
        actual: role.to_string(),
    })
}

/// Turn an error into a chat reply, logging the ones users don't see.
pub(crate) fn error_reply(context: &str, subject: &str, err: BudError) -> SlackResponse {
    if err.is_user_facing() {
        tracing::info!(%subject, error = %err, "{context} rejected");
        SlackResponse::error(err.user_message())
    } else {
        tracing::error!(%subject, error = %err, "{context} failed");
        SlackResponse::generic_error()
    }
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::confirm::{PayloadAction, PayloadUser};
    use crate::error::GENERIC_ERROR_TEXT;

    fn payload(label: &str, value: &str, user: &str) -> InteractionPayload {
        InteractionPayload {
            kind: "interactive_message".into(),
            callback_id: label.into(),
            actions: vec![PayloadAction {
                name: "choice".into(),
                value: value.into(),
                kind: "button".into(),
            }],
            user: PayloadUser {
                id: user.into(),
                name: "someone".into(),
            },
            channel: None,
            response_url: "https://hooks.example/click".into(),
            token: None,
            original_message: None,
        }
    }

    #[test]
    fn unknown_command_gets_invalid_reply() {
        let f = fixture();
        let reply = f.run(VIEWER, "frobnicate now");
        assert!(reply.plain_text().contains("frobnicate now"));
    }

    #[test]
    fn missing_switch_is_reported_to_user() {
        let f = fixture();
        let reply = f.run(VIEWER, "build info -s api");
        assert!(reply.plain_text().contains("--build"), "{}", reply.plain_text());
    }

    #[test]
    fn unterminated_quote_is_an_error_reply() {
        let f = fixture();
        let reply = f.run(VIEWER, "build search -q \"open");
        assert!(reply.plain_text().to_lowercase().contains("quote"));
    }

    #[test]
    fn viewer_cannot_create_backup() {
        let f = fixture();
        let reply = f.run(VIEWER, "backup create -e dev -t Orders");
        let text = reply.plain_text();
        assert!(text.contains("developer"), "{text}");
        assert!(text.contains("viewer"), "{text}");
    }

    #[test]
    fn default_role_applies_to_unknown_users() {
        let mut f = fixture();
        f.bot.config.default_role = Role::Developer;
        let reply = f.run("U_NOBODY", "backup create -e dev -t Orders");
        assert_eq!(reply.attachments[0].callback_id.as_deref(), Some("backup_create"));
    }

    #[test]
    fn token_verification() {
        let mut f = fixture();
        assert!(f.bot.verify_token(None).is_ok());
        f.bot.config.slack.verification_token = Some("s3cret".into());
        assert!(f.bot.verify_token(Some("s3cret")).is_ok());
        assert!(matches!(
            f.bot.verify_token(Some("nope")),
            Err(BudError::InvalidToken)
        ));
        assert!(f.bot.verify_token(None).is_err());
    }

    #[test]
    fn unknown_label_gets_invalid_reply() {
        let f = fixture();
        let reply = f.bot.confirm(&payload("nope", "cancel", ADMIN));
        assert!(!reply.replace_original);
        assert!(reply.plain_text().to_lowercase().contains("invalid"));
    }

    #[test]
    fn cancel_replaces_original() {
        let f = fixture();
        let reply = f.bot.confirm(&payload("backup_create", "cancel", DEV));
        assert!(reply.replace_original);
        assert_eq!(reply.plain_text(), "Cancelled.");
    }

    #[test]
    fn clicks_recheck_role() {
        let f = fixture();
        let value = Confirmation::BackupCreate {
            env: "dev".into(),
            table: "Orders".into(),
        }
        .encode();
        let reply = f.bot.confirm(&payload("backup_create", &value, VIEWER));
        assert!(reply.plain_text().contains("developer"));
    }

    #[test]
    fn stale_value_is_rejected() {
        let f = fixture();
        let value = Confirmation::BackupCreate {
            env: "dev".into(),
            table: "Orders".into(),
        }
        .encode();
        let reply = f.bot.confirm(&payload("deploy_confirm", &value, ADMIN));
        assert!(reply.plain_text().contains("no longer matches"));
    }

    #[test]
    fn internal_errors_are_hidden() {
        let reply = error_reply("test", "x", BudError::Store("disk on fire".into()));
        assert_eq!(reply.plain_text(), GENERIC_ERROR_TEXT);
    }
}
