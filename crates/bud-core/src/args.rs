//! Tokenizing and flag parsing for chat command text.
//!
//! Command text looks like `deploy -s billing -e dev -r us-east-1`. The first
//! token is the command, an optional second bare token is the subcommand, and
//! the rest are `-x value` / `--long value` / `--long=value` switches,
//! value-less boolean flags, or positionals.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{BudError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub command: String,
    pub subcommand: Option<String>,
    /// Switch name (without dashes) → value.
    pub switches: BTreeMap<String, String>,
    /// Switches given without a value.
    pub flags: BTreeSet<String>,
    pub positionals: Vec<String>,
}

impl ParsedArgs {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.switches.get(name).map(String::as_str)
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }
}

/// Split `text` on whitespace, keeping quoted sections together.
///
/// Chat clients often replace straight quotes with typographic ones, so `“ ”`
/// and `‘ ’` are treated like `"` and `'`.
pub fn tokenize(text: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in text.chars() {
        match quote {
            Some(q) => {
                if closes(q, c) {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            None => match c {
                '"' | '\'' | '“' | '‘' => {
                    quote = Some(c);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    if quote.is_some() {
        return Err(BudError::InvalidCommand(format!(
            "unterminated quote in '{}'",
            text.trim()
        )));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

fn closes(open: char, c: char) -> bool {
    match open {
        '“' => c == '”' || c == '"',
        '‘' => c == '’' || c == '\'',
        other => c == other,
    }
}

fn switch_name(token: &str) -> Option<&str> {
    let name = token
        .strip_prefix("--")
        .or_else(|| token.strip_prefix('-'))?;
    // A lone dash or a negative number is a value, not a switch.
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(name)
}

/// Parse command text into a [`ParsedArgs`]. Empty text parses as `help`.
pub fn parse(text: &str) -> Result<ParsedArgs> {
    let tokens = tokenize(text)?;
    let mut iter = tokens.into_iter().peekable();

    let mut parsed = ParsedArgs {
        command: iter
            .next()
            .map(|t| t.to_ascii_lowercase())
            .unwrap_or_else(|| "help".to_string()),
        ..Default::default()
    };

    if let Some(next) = iter.peek() {
        if switch_name(next).is_none() {
            parsed.subcommand = iter.next().map(|t| t.to_ascii_lowercase());
        }
    }

    while let Some(token) = iter.next() {
        let Some(name) = switch_name(&token) else {
            parsed.positionals.push(token);
            continue;
        };
        if let Some((key, value)) = name.split_once('=') {
            parsed.switches.insert(key.to_string(), value.to_string());
            continue;
        }
        let takes_value = iter
            .peek()
            .map(|next| switch_name(next).is_none())
            .unwrap_or(false);
        if takes_value {
            if let Some(value) = iter.next() {
                parsed.switches.insert(name.to_string(), value);
            }
        } else {
            parsed.flags.insert(name.to_string());
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_subcommand_and_switches() {
        let p = parse("backup create -e dev -t MyTable").unwrap();
        assert_eq!(p.command, "backup");
        assert_eq!(p.subcommand.as_deref(), Some("create"));
        assert_eq!(p.get("e"), Some("dev"));
        assert_eq!(p.get("t"), Some("MyTable"));
    }

    #[test]
    fn command_without_subcommand() {
        let p = parse("deploy -s billing --env=prod").unwrap();
        assert_eq!(p.command, "deploy");
        assert_eq!(p.subcommand, None);
        assert_eq!(p.get("s"), Some("billing"));
        assert_eq!(p.get("env"), Some("prod"));
    }

    #[test]
    fn trailing_switch_is_a_flag() {
        let p = parse("build history -s api --all").unwrap();
        assert!(p.has_flag("all"));
        assert_eq!(p.get("all"), None);
    }

    #[test]
    fn quoted_values_stay_together() {
        let p = parse(r#"build search -q "status:failed service:api""#).unwrap();
        assert_eq!(p.get("q"), Some("status:failed service:api"));
    }

    #[test]
    fn typographic_quotes_are_accepted() {
        let p = parse("build search -q “deploy fix”").unwrap();
        assert_eq!(p.get("q"), Some("deploy fix"));
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(matches!(
            parse("build search -q \"oops"),
            Err(BudError::InvalidCommand(_))
        ));
    }

    #[test]
    fn empty_text_is_help() {
        let p = parse("   ").unwrap();
        assert_eq!(p.command, "help");
        assert!(p.subcommand.is_none());
    }

    #[test]
    fn negative_numbers_are_values() {
        let p = parse("image list -s api -n -1").unwrap();
        assert_eq!(p.get("n"), Some("-1"));
    }

    #[test]
    fn extra_bare_tokens_are_positionals() {
        let p = parse("help deploy extra").unwrap();
        assert_eq!(p.subcommand.as_deref(), Some("deploy"));
        assert_eq!(p.positionals, vec!["extra".to_string()]);
    }

    #[test]
    fn command_is_lowercased() {
        let p = parse("Deploy START -s Api").unwrap();
        assert_eq!(p.command, "deploy");
        assert_eq!(p.subcommand.as_deref(), Some("start"));
        assert_eq!(p.get("s"), Some("Api"));
    }
}
