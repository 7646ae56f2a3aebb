use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BudError;

// ---------------------------------------------------------------------------
// ResponseType
// ---------------------------------------------------------------------------

/// Visibility of a chat reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Only the invoking user sees the reply.
    #[default]
    Ephemeral,
    /// Everybody in the channel sees the reply.
    InChannel,
}

// ---------------------------------------------------------------------------
// RunType
// ---------------------------------------------------------------------------

/// How a subcommand completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    /// Answers within the synchronous response window.
    Sync,
    /// Replies with buttons; the work happens on the follow-up click.
    Confirm,
    /// Acknowledges immediately and hands the work to the long-task queue.
    LongTask,
}

impl RunType {
    pub fn as_str(self) -> &'static str {
        match self {
            RunType::Sync => "sync",
            RunType::Confirm => "confirm",
            RunType::LongTask => "long_task",
        }
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Permission level of a chat user, read from the `roles` table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Viewer,
    Developer,
    Admin,
}

impl Role {
    pub fn all() -> &'static [Role] {
        &[Role::Viewer, Role::Developer, Role::Admin]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Developer => "developer",
            Role::Admin => "admin",
        }
    }

    /// Roles are cumulative: an admin may do anything a developer may.
    pub fn allows(self, required: Role) -> bool {
        self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = BudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "viewer" => Ok(Role::Viewer),
            "developer" | "dev" => Ok(Role::Developer),
            "admin" => Ok(Role::Admin),
            _ => Err(BudError::InvalidSwitchValue {
                switch: "role".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering_is_cumulative() {
        assert!(Role::Admin.allows(Role::Developer));
        assert!(Role::Developer.allows(Role::Viewer));
        assert!(!Role::Viewer.allows(Role::Developer));
    }

    #[test]
    fn role_parse_accepts_aliases() {
        assert_eq!("dev".parse::<Role>().unwrap(), Role::Developer);
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn response_type_serializes_snake_case() {
        let json = serde_json::to_string(&ResponseType::InChannel).unwrap();
        assert_eq!(json, "\"in_channel\"");
    }
}
