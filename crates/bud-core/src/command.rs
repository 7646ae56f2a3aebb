//! The command routing table.
//!
//! Chat commands form a closed set: [`CommandName`] is the single place where
//! the first token of a message is matched, and [`CommandName::properties`]
//! holds each command's declarative switch table.

use std::fmt;

use crate::properties::{CommandProperties, SubcommandProperties, Switch};
use crate::types::{Role, RunType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    Help,
    Version,
    Service,
    Backup,
    Deploy,
    Build,
    Test,
    Stack,
    Role,
    Image,
    Artifact,
}

impl CommandName {
    pub fn all() -> &'static [CommandName] {
        &[
            CommandName::Help,
            CommandName::Version,
            CommandName::Service,
            CommandName::Backup,
            CommandName::Deploy,
            CommandName::Build,
            CommandName::Test,
            CommandName::Stack,
            CommandName::Role,
            CommandName::Image,
            CommandName::Artifact,
        ]
    }

    pub fn as_str(self) -> &'static str {
        self.properties().name
    }

    /// Match the first token of a command. Unknown tokens yield `None`.
    pub fn lookup(token: &str) -> Option<CommandName> {
        match token {
            "help" | "h" | "?" => Some(CommandName::Help),
            "version" | "ver" => Some(CommandName::Version),
            "service" | "services" | "svc" => Some(CommandName::Service),
            "backup" | "backups" => Some(CommandName::Backup),
            "deploy" | "dep" => Some(CommandName::Deploy),
            "build" | "builds" => Some(CommandName::Build),
            "test" | "tests" => Some(CommandName::Test),
            "stack" | "stacks" => Some(CommandName::Stack),
            "role" | "roles" => Some(CommandName::Role),
            "image" | "images" => Some(CommandName::Image),
            "artifact" | "artifacts" => Some(CommandName::Artifact),
            _ => None,
        }
    }

    pub fn properties(self) -> &'static CommandProperties {
        match self {
            CommandName::Help => &HELP,
            CommandName::Version => &VERSION,
            CommandName::Service => &SERVICE,
            CommandName::Backup => &BACKUP,
            CommandName::Deploy => &DEPLOY,
            CommandName::Build => &BUILD,
            CommandName::Test => &TEST,
            CommandName::Stack => &STACK,
            CommandName::Role => &ROLE,
            CommandName::Image => &IMAGE,
            CommandName::Artifact => &ARTIFACT,
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Switches shared by several commands
// ---------------------------------------------------------------------------

const SERVICE_SW: Switch = Switch::required("s", "service", "service name");
const ENV_SW: Switch = Switch::required("e", "env", "environment, e.g. dev or prod");
const REGION_OPT: Switch = Switch::optional("r", "region", "region (defaults to the environment's)");
const COUNT_OPT: Switch = Switch::optional("n", "count", "number of entries to show");
const BUILD_SW: Switch = Switch::required("n", "build", "build number");

// ---------------------------------------------------------------------------
// Property table
// ---------------------------------------------------------------------------

static HELP: CommandProperties = CommandProperties {
    name: "help",
    summary: "list commands or show usage for one command",
    subcommands: &[SubcommandProperties {
        name: "show",
        summary: "`help <command>` shows that command's switches",
        switches: &[],
        run_type: RunType::Sync,
        role: Role::Viewer,
    }],
    default_subcommand: Some("show"),
    open_subcommand: true,
};

static VERSION: CommandProperties = CommandProperties {
    name: "version",
    summary: "show the bot version",
    subcommands: &[SubcommandProperties {
        name: "show",
        summary: "print the running version",
        switches: &[],
        run_type: RunType::Sync,
        role: Role::Viewer,
    }],
    default_subcommand: Some("show"),
    open_subcommand: true,
};

static SERVICE: CommandProperties = CommandProperties {
    name: "service",
    summary: "look up service metadata",
    subcommands: &[
        SubcommandProperties {
            name: "list",
            summary: "list known services",
            switches: &[],
            run_type: RunType::Sync,
            role: Role::Viewer,
        },
        SubcommandProperties {
            name: "info",
            summary: "show build/deploy settings for a service",
            switches: &[SERVICE_SW],
            run_type: RunType::Sync,
            role: Role::Viewer,
        },
    ],
    default_subcommand: Some("list"),
    open_subcommand: false,
};

static BACKUP: CommandProperties = CommandProperties {
    name: "backup",
    summary: "on-demand table backups",
    subcommands: &[
        SubcommandProperties {
            name: "create",
            summary: "back up a table (asks for confirmation)",
            switches: &[
                ENV_SW,
                Switch::required("t", "table", "table name"),
            ],
            run_type: RunType::Confirm,
            role: Role::Developer,
        },
        SubcommandProperties {
            name: "list",
            summary: "list backups of a table",
            switches: &[
                ENV_SW,
                Switch::required("t", "table", "table name"),
            ],
            run_type: RunType::Sync,
            role: Role::Viewer,
        },
    ],
    default_subcommand: None,
    open_subcommand: false,
};

static DEPLOY: CommandProperties = CommandProperties {
    name: "deploy",
    summary: "deploy a service version to an environment",
    subcommands: &[SubcommandProperties {
        name: "start",
        summary: "pick region and version, confirm, then deploy in the background",
        switches: &[
            SERVICE_SW,
            ENV_SW,
            REGION_OPT,
            Switch::optional("v", "version", "image tag (asks when omitted)"),
        ],
        run_type: RunType::Confirm,
        role: Role::Developer,
    }],
    default_subcommand: Some("start"),
    open_subcommand: false,
};

static BUILD: CommandProperties = CommandProperties {
    name: "build",
    summary: "build history",
    subcommands: &[
        SubcommandProperties {
            name: "history",
            summary: "recent builds of a service",
            switches: &[
                SERVICE_SW,
                Switch::optional("b", "branch", "only builds of this branch"),
                COUNT_OPT,
            ],
            run_type: RunType::Sync,
            role: Role::Viewer,
        },
        SubcommandProperties {
            name: "info",
            summary: "details of one build",
            switches: &[SERVICE_SW, BUILD_SW],
            run_type: RunType::Sync,
            role: Role::Viewer,
        },
        SubcommandProperties {
            name: "search",
            summary: "full-text search over builds (`service:api status:failed`)",
            switches: &[Switch::required("q", "query", "search query"), COUNT_OPT],
            run_type: RunType::Sync,
            role: Role::Viewer,
        },
    ],
    default_subcommand: Some("history"),
    open_subcommand: false,
};

static TEST: CommandProperties = CommandProperties {
    name: "test",
    summary: "test results",
    subcommands: &[SubcommandProperties {
        name: "results",
        summary: "wait for and report the test results of a build",
        switches: &[SERVICE_SW, BUILD_SW],
        run_type: RunType::LongTask,
        role: Role::Viewer,
    }],
    default_subcommand: Some("results"),
    open_subcommand: false,
};

static STACK: CommandProperties = CommandProperties {
    name: "stack",
    summary: "infrastructure stacks",
    subcommands: &[SubcommandProperties {
        name: "describe",
        summary: "status and outputs of a service's stack",
        switches: &[SERVICE_SW, ENV_SW, REGION_OPT],
        run_type: RunType::Sync,
        role: Role::Viewer,
    }],
    default_subcommand: Some("describe"),
    open_subcommand: false,
};

static ROLE: CommandProperties = CommandProperties {
    name: "role",
    summary: "user roles",
    subcommands: &[
        SubcommandProperties {
            name: "show",
            summary: "show a user's role (yours by default)",
            switches: &[Switch::optional("u", "user", "user id")],
            run_type: RunType::Sync,
            role: Role::Viewer,
        },
        SubcommandProperties {
            name: "set",
            summary: "grant a role to a user",
            switches: &[
                Switch::required("u", "user", "user id"),
                Switch::required("l", "level", "viewer, developer or admin"),
            ],
            run_type: RunType::Sync,
            role: Role::Admin,
        },
    ],
    default_subcommand: Some("show"),
    open_subcommand: false,
};

static IMAGE: CommandProperties = CommandProperties {
    name: "image",
    summary: "container images",
    subcommands: &[SubcommandProperties {
        name: "list",
        summary: "newest image tags of a service",
        switches: &[SERVICE_SW, COUNT_OPT],
        run_type: RunType::Sync,
        role: Role::Viewer,
    }],
    default_subcommand: Some("list"),
    open_subcommand: false,
};

static ARTIFACT: CommandProperties = CommandProperties {
    name: "artifact",
    summary: "build artifacts in object storage",
    subcommands: &[SubcommandProperties {
        name: "list",
        summary: "artifact objects of a service",
        switches: &[
            SERVICE_SW,
            Switch::optional("v", "version", "only this version"),
        ],
        run_type: RunType::Sync,
        role: Role::Viewer,
    }],
    default_subcommand: Some("list"),
    open_subcommand: false,
};
