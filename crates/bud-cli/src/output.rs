use bud_core::response::SlackResponse;
use bud_core::types::ResponseType;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print a chat reply as text, or as the JSON the chat platform would receive.
pub fn print_reply(reply: &SlackResponse, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(reply);
    }
    if reply.response_type == ResponseType::InChannel {
        println!("[in channel]");
    }
    println!("{}", reply.plain_text());
    for a in reply.attachments.iter().filter(|a| !a.actions.is_empty()) {
        if let Some(label) = &a.callback_id {
            let values: Vec<&str> = a.actions.iter().map(|b| b.value.as_str()).collect();
            println!("  ({label}: {})", values.join(" | "));
        }
    }
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  "));

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}
