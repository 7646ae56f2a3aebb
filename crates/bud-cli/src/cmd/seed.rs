use std::path::Path;

use anyhow::Context;
use bud_core::seed::SeedData;

use crate::output::{print_json, print_table};

pub fn run(root: &Path, file: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let (bot, _queue) = super::open_bot(root)?;
    let data = match file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            SeedData::from_yaml(&text).with_context(|| format!("invalid seed file {}", path.display()))?
        }
        None => SeedData::demo(bot.now()),
    };
    let summary = data.apply(&bot)?;

    if json {
        return print_json(&summary);
    }
    print_table(
        &["KIND", "COUNT"],
        vec![
            vec!["services".into(), summary.services.to_string()],
            vec!["roles".into(), summary.roles.to_string()],
            vec!["image tags".into(), summary.images.to_string()],
            vec!["builds".into(), summary.builds.to_string()],
            vec!["test runs".into(), summary.test_runs.to_string()],
            vec!["artifacts".into(), summary.artifacts.to_string()],
            vec!["tables".into(), summary.tables.to_string()],
        ],
    );
    Ok(())
}
