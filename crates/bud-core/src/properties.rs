//! Declarative per-command properties: switches, help text and run type.
//!
//! Every chat command is described by a static [`CommandProperties`] value.
//! The dispatcher validates parsed arguments against it before a handler
//! runs, and `help` renders its usage text from the same table.

use std::collections::BTreeMap;

use crate::args::ParsedArgs;
use crate::error::{BudError, Result};
use crate::types::{Role, RunType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Switch {
    pub short: &'static str,
    pub long: &'static str,
    pub help: &'static str,
    pub required: bool,
}

impl Switch {
    pub const fn required(short: &'static str, long: &'static str, help: &'static str) -> Self {
        Self {
            short,
            long,
            help,
            required: true,
        }
    }

    pub const fn optional(short: &'static str, long: &'static str, help: &'static str) -> Self {
        Self {
            short,
            long,
            help,
            required: false,
        }
    }

    fn matches(&self, name: &str) -> bool {
        name == self.short || name == self.long
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubcommandProperties {
    pub name: &'static str,
    pub summary: &'static str,
    pub switches: &'static [Switch],
    pub run_type: RunType,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandProperties {
    pub name: &'static str,
    pub summary: &'static str,
    pub subcommands: &'static [SubcommandProperties],
    /// Subcommand used when the text names none.
    pub default_subcommand: Option<&'static str>,
    /// When set, the subcommand slot is a free argument (e.g. `help deploy`)
    /// and always resolves to the default subcommand.
    pub open_subcommand: bool,
}

/// Switch values keyed by their canonical long name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Switches(BTreeMap<&'static str, String>);

impl Switches {
    pub fn get(&self, long: &str) -> Option<&str> {
        self.0.get(long).map(String::as_str)
    }

    pub fn require(&self, long: &str) -> Result<&str> {
        self.get(long)
            .ok_or_else(|| BudError::InvalidCommand(format!("missing --{long}")))
    }

    /// Parse an optional numeric switch, falling back to `default`.
    pub fn number_or(&self, long: &str, default: u64) -> Result<u64> {
        match self.get(long) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| BudError::InvalidSwitchValue {
                switch: format!("--{long}"),
                value: raw.to_string(),
            }),
        }
    }

    /// Parse an optional `--count`-style switch. Zero is rejected.
    pub fn count_or(&self, long: &str, default: usize) -> Result<usize> {
        let n = self.number_or(long, default as u64)?;
        if n == 0 {
            return Err(BudError::InvalidSwitchValue {
                switch: format!("--{long}"),
                value: "0".to_string(),
            });
        }
        Ok(n as usize)
    }

    pub fn insert(&mut self, long: &'static str, value: impl Into<String>) {
        self.0.insert(long, value.into());
    }
}

impl CommandProperties {
    pub fn subcommand(&self, name: &str) -> Option<&'static SubcommandProperties> {
        self.subcommands.iter().find(|s| s.name == name)
    }

    /// Pick the subcommand named by `args`, or the default one.
    pub fn resolve(&self, args: &ParsedArgs) -> Result<&'static SubcommandProperties> {
        let wanted = match (&args.subcommand, self.open_subcommand) {
            (Some(name), false) => Some(name.as_str()),
            _ => self.default_subcommand,
        };
        let Some(wanted) = wanted else {
            return Err(BudError::InvalidCommand(format!(
                "'{}' needs a subcommand: {}",
                self.name,
                self.subcommand_names()
            )));
        };
        self.subcommand(wanted).ok_or_else(|| {
            BudError::InvalidCommand(format!(
                "'{} {wanted}' is not a command; try one of: {}",
                self.name,
                self.subcommand_names()
            ))
        })
    }

    fn subcommand_names(&self) -> String {
        self.subcommands
            .iter()
            .map(|s| s.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Usage text shown by `help <command>`.
    pub fn help_text(&self) -> String {
        let mut out = format!("*{}*: {}\n", self.name, self.summary);
        for sub in self.subcommands {
            let usage = sub
                .switches
                .iter()
                .map(|s| {
                    if s.required {
                        format!("-{} <{}>", s.short, s.long)
                    } else {
                        format!("[-{} <{}>]", s.short, s.long)
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            let head = if self.open_subcommand {
                self.name.to_string()
            } else {
                format!("{} {}", self.name, sub.name)
            };
            if usage.is_empty() {
                out.push_str(&format!("• `{head}`  {}\n", sub.summary));
            } else {
                out.push_str(&format!("• `{head} {usage}`  {}\n", sub.summary));
            }
            for s in sub.switches {
                out.push_str(&format!("      -{}, --{}: {}\n", s.short, s.long, s.help));
            }
        }
        out
    }
}

impl SubcommandProperties {
    /// Resolve switch aliases to canonical long names and check that every
    /// required switch is present and no unknown switch was given.
    pub fn validate(&self, command: &str, args: &ParsedArgs) -> Result<Switches> {
        let mut resolved = Switches::default();

        for (name, value) in &args.switches {
            let switch = self.find(command, name)?;
            resolved.insert(switch.long, value.clone());
        }
        if let Some(name) = args.flags.iter().next() {
            let switch = self.find(command, name)?;
            return Err(BudError::InvalidSwitchValue {
                switch: format!("--{}", switch.long),
                value: String::new(),
            });
        }
        for switch in self.switches.iter().filter(|s| s.required) {
            if resolved.get(switch.long).is_none() {
                return Err(BudError::MissingSwitch {
                    command: format!("{command} {}", self.name),
                    switch: switch.long.to_string(),
                });
            }
        }
        Ok(resolved)
    }

    fn find(&self, command: &str, name: &str) -> Result<&'static Switch> {
        self.switches
            .iter()
            .find(|s| s.matches(name))
            .ok_or_else(|| BudError::UnknownSwitch {
                command: format!("{command} {}", self.name),
                switch: name.to_string(),
            })
    }
}
