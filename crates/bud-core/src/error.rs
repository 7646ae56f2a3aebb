use thiserror::Error;

/// Generic text shown to a chat user when an unexpected error was logged.
pub const GENERIC_ERROR_TEXT: &str = "Something went wrong. Check the logs for details.";

#[derive(Debug, Error)]
pub enum BudError {
    #[error("not initialized: run 'bud init'")]
    NotInitialized,

    /// A message meant to be shown verbatim to the chat user.
    #[error("{0}")]
    User(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("'{command}' requires the --{switch} switch")]
    MissingSwitch { command: String, switch: String },

    #[error("'{command}' does not take a --{switch} switch")]
    UnknownSwitch { command: String, switch: String },

    #[error("invalid value '{value}' for {switch}")]
    InvalidSwitchValue { switch: String, value: String },

    #[error("unknown environment '{0}'")]
    UnknownEnvironment(String),

    #[error("region '{region}' is not configured for environment '{env}'")]
    UnknownRegion { env: String, region: String },

    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("build #{build} not found for service {service}")]
    BuildNotFound { service: String, build: u64 },

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("stack not found: {0}")]
    StackNotFound(String),

    #[error("you need the {required} role to run '{command}' (you have {actual})")]
    Forbidden {
        command: String,
        required: String,
        actual: String,
    },

    #[error("unknown confirmation label: {0}")]
    UnknownLabel(String),

    #[error("this confirmation no longer matches the original request: {0}")]
    StaleConfirmation(String),

    #[error("invalid request token")]
    InvalidToken,

    #[error("long task not found: {0}")]
    TaskNotFound(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("search error: {0}")]
    Search(String),

    #[error("webhook error: {0}")]
    Webhook(String),

    #[error("task queue error: {0}")]
    Queue(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl BudError {
    /// Whether the error text may be shown to the chat user as-is.
    ///
    /// Everything else is logged and replaced by [`GENERIC_ERROR_TEXT`].
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            BudError::Store(_)
                | BudError::Search(_)
                | BudError::Webhook(_)
                | BudError::Queue(_)
                | BudError::Io(_)
                | BudError::Yaml(_)
                | BudError::Json(_)
        )
    }

    /// Text shown to the chat user for this error.
    pub fn user_message(&self) -> String {
        if self.is_user_facing() {
            self.to_string()
        } else {
            GENERIC_ERROR_TEXT.to_string()
        }
    }
}

/// Errors raised by small helper routines (lookups, conversions).
///
/// Helpers never surface their own type to callers of the bot: every
/// `HelperError` becomes a [`BudError::User`] on the way out.
#[derive(Debug, Error)]
pub enum HelperError {
    #[error("no {kind} named '{name}'")]
    Missing { kind: &'static str, name: String },

    #[error("{0}")]
    Invalid(String),
}

impl From<HelperError> for BudError {
    fn from(err: HelperError) -> Self {
        BudError::User(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BudError>;
