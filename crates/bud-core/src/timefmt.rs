//! Timestamp helpers used in chat replies and generated resource names.

use chrono::{DateTime, Utc};

/// `YYYY-MMM-DD-HHMM`, e.g. `2024-Jan-01-1200`.
pub fn backup_stamp(t: DateTime<Utc>) -> String {
    t.format("%Y-%b-%d-%H%M").to_string()
}

/// Name of an on-demand table backup: `<table>-<backup_stamp>`.
pub fn backup_name(table: &str, t: DateTime<Utc>) -> String {
    format!("{table}-{}", backup_stamp(t))
}

/// `YYYY-MM-DD HH:MM UTC`
pub fn display(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// `YYYY-MM-DD`
pub fn date_stamp(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d").to_string()
}

/// Coarse relative age: `just now`, `5 minutes ago`, `3 hours ago`, `2 days ago`.
pub fn age(from: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - from).num_seconds().max(0);
    let (n, unit) = match secs {
        0..=59 => return "just now".to_string(),
        60..=3599 => (secs / 60, "minute"),
        3600..=86_399 => (secs / 3600, "hour"),
        _ => (secs / 86_400, "day"),
    };
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}
