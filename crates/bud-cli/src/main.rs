mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, tasks::TasksSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bud",
    about = "SlackBud chat-ops bot: run commands locally, seed data, serve the chat endpoints",
    version,
    propagate_version = true
)]
struct Cli {
    /// Data root (default: auto-detect from .bud/)
    #[arg(long, global = true, env = "SLACKBUD_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .bud/ with a default config
    Init {
        /// Bot display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Serve the slash-command, button and task endpoints
    Serve {
        #[arg(long, default_value = "3000")]
        port: u16,
    },

    /// Dispatch a chat command locally and print the reply
    Run {
        /// Command text, e.g. "backup create -e dev -t Orders"
        text: String,

        /// User id the command runs as
        #[arg(long, default_value = "local")]
        user: String,
    },

    /// Feed a button-click payload (JSON) to the confirmation relay
    Confirm { payload: String },

    /// Read a slash-command event from stdin and print the function response
    Invoke,

    /// Load seed data from a YAML file, or the built-in demo set
    Seed { file: Option<PathBuf> },

    /// Inspect and validate the config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Inspect and drain the long-task queue
    Tasks {
        #[command(subcommand)]
        subcommand: TasksSubcommand,
    },

    /// List every chat command with its run type and required role
    Commands,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref()),
        Commands::Serve { port } => cmd::serve::run(&root, port),
        Commands::Run { text, user } => cmd::run::run(&root, &text, &user, cli.json),
        Commands::Confirm { payload } => cmd::confirm::run(&root, &payload, cli.json),
        Commands::Invoke => cmd::invoke::run(&root),
        Commands::Seed { file } => cmd::seed::run(&root, file.as_deref(), cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Tasks { subcommand } => cmd::tasks::run(&root, subcommand, cli.json),
        Commands::Commands => cmd::commands::run(cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
