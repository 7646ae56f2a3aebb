use bud_core::command::CommandName;

use crate::output::{print_json, print_table};

/// Print the command table: every command, subcommand, how it runs and who may run it.
pub fn run(json: bool) -> anyhow::Result<()> {
    let mut rows = Vec::new();
    for name in CommandName::all() {
        let props = name.properties();
        for sub in props.subcommands {
            rows.push((props.name, sub));
        }
    }

    if json {
        let value: Vec<_> = rows
            .iter()
            .map(|(command, sub)| {
                serde_json::json!({
                    "command": command,
                    "subcommand": sub.name,
                    "run_type": sub.run_type,
                    "role": sub.role,
                    "summary": sub.summary,
                })
            })
            .collect();
        return print_json(&value);
    }

    let rows = rows
        .iter()
        .map(|(command, sub)| {
            vec![
                command.to_string(),
                sub.name.to_string(),
                sub.run_type.as_str().to_string(),
                sub.role.as_str().to_string(),
                sub.summary.to_string(),
            ]
        })
        .collect();
    print_table(&["COMMAND", "SUBCOMMAND", "RUN", "ROLE", "SUMMARY"], rows);
    Ok(())
}
