use anyhow::Context;
use bud_core::config::Config;
use bud_core::{io, paths};
use std::path::Path;

pub const DEFAULT_BOT_NAME: &str = "SlackBud";

pub fn run(root: &Path, name: Option<&str>) -> anyhow::Result<()> {
    println!("Initializing SlackBud in: {}", root.display());

    for dir in [paths::bud_dir(root), paths::objects_dir(root)] {
        io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let cfg = Config::new(name.unwrap_or(DEFAULT_BOT_NAME));
    if cfg.save_if_missing(root).context("failed to write config.yaml")? {
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    println!("\nNext: `bud seed` to load demo data, then `bud run \"help\"`.");
    Ok(())
}
