use crate::error::{BudError, Result};
use crate::paths;
use crate::poll::PollPolicy;
use crate::types::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const VERIFICATION_TOKEN_ENV: &str = "SLACKBUD_VERIFICATION_TOKEN";
pub const SIGNING_SECRET_ENV: &str = "SLACKBUD_SIGNING_SECRET";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// BotConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// Slash command the bot is installed under.
    #[serde(default = "default_bot_command")]
    pub command: String,
}

fn default_bot_name() -> String {
    "SlackBud".to_string()
}

fn default_bot_command() -> String {
    "/bud".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            command: default_bot_command(),
        }
    }
}

// ---------------------------------------------------------------------------
// SlackConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Legacy shared token sent in every slash-command body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
    /// Secret for `X-Slack-Signature` request signing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_secret: Option<String>,
}

// ---------------------------------------------------------------------------
// EnvironmentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Cloud account the environment lives in.
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_region: Option<String>,
    /// Deploying to a protected environment requires the admin role.
    #[serde(default)]
    pub protected: bool,
}

impl EnvironmentConfig {
    pub fn new(account: &str, regions: &[&str]) -> Self {
        Self {
            account: account.to_string(),
            regions: regions.iter().map(|r| r.to_string()).collect(),
            default_region: regions.first().map(|r| r.to_string()),
            protected: false,
        }
    }

    /// The configured default region, or the only region when there is one.
    pub fn implied_region(&self) -> Option<&str> {
        if let Some(r) = &self.default_region {
            return Some(r.as_str());
        }
        match self.regions.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// PollConfig / LongTaskConfig / WebhookConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_attempts")]
    pub attempts: u32,
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
}

fn default_poll_attempts() -> u32 {
    10
}

fn default_poll_interval() -> u64 {
    30
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: default_poll_attempts(),
            interval_secs: default_poll_interval(),
        }
    }
}

impl PollConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy::new(self.attempts, Duration::from_secs(self.interval_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTaskConfig {
    /// Delivery attempts per task before it is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Worker poll interval in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_tick_ms() -> u64 {
    1000
}

impl Default for LongTaskConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            tick_ms: default_tick_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

fn default_webhook_timeout() -> u64 {
    10
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_webhook_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentConfig>,
    /// Role of users who have no row in the roles table.
    #[serde(default)]
    pub default_role: Role,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub long_task: LongTaskConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(bot_name: impl Into<String>) -> Self {
        let mut environments = BTreeMap::new();
        environments.insert("dev".to_string(), EnvironmentConfig::new("dev", &["us-east-1"]));
        let mut prod = EnvironmentConfig::new("prod", &["us-east-1", "us-west-2"]);
        prod.protected = true;
        environments.insert("prod".to_string(), prod);

        Self {
            version: 1,
            bot: BotConfig {
                name: bot_name.into(),
                command: default_bot_command(),
            },
            slack: SlackConfig::default(),
            environments,
            default_role: Role::Viewer,
            poll: PollConfig::default(),
            long_task: LongTaskConfig::default(),
            webhook: WebhookConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(BudError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let mut cfg: Config = serde_yaml::from_str(&data)?;
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Write the config only when none exists yet. Returns true if written.
    pub fn save_if_missing(&self, root: &Path) -> Result<bool> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::write_if_missing(&path, data.as_bytes())
    }

    /// Secrets from the process environment win over the file.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(VERIFICATION_TOKEN_ENV) {
            if !token.is_empty() {
                self.slack.verification_token = Some(token);
            }
        }
        if let Ok(secret) = std::env::var(SIGNING_SECRET_ENV) {
            if !secret.is_empty() {
                self.slack.signing_secret = Some(secret);
            }
        }
    }

    pub fn environment(&self, name: &str) -> Result<&EnvironmentConfig> {
        self.environments
            .get(name)
            .ok_or_else(|| BudError::UnknownEnvironment(name.to_string()))
    }

    /// Validate `region` (or pick the implied one) for environment `env`.
    ///
    /// Returns `Ok(None)` when no region was given and the environment has
    /// several regions without a default.
    pub fn resolve_region(&self, env: &str, region: Option<&str>) -> Result<Option<String>> {
        let environment = self.environment(env)?;
        match region {
            Some(r) if environment.regions.iter().any(|known| known == r) => Ok(Some(r.to_string())),
            Some(r) => Err(BudError::UnknownRegion {
                env: env.to_string(),
                region: r.to_string(),
            }),
            None => Ok(environment.implied_region().map(str::to_string)),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for (name, env) in &self.environments {
            if env.regions.is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("environment '{name}' has no regions"),
                });
            }
            if let Some(default) = &env.default_region {
                if !env.regions.contains(default) {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!(
                            "environment '{name}' default region '{default}' is not in its regions"
                        ),
                    });
                }
            }
        }

        if self.poll.attempts == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "poll.attempts is 0: test results will never be fetched".to_string(),
            });
        }

        if self.long_task.max_attempts == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "long_task.max_attempts must be at least 1".to_string(),
            });
        }

        if self.slack.verification_token.is_none() && self.slack.signing_secret.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "no slack token or signing secret: inbound requests are not verified \
                     (set {VERIFICATION_TOKEN_ENV} or {SIGNING_SECRET_ENV})"
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
