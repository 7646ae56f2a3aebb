//! Confirmation relay: correlating button clicks with their handlers.
//!
//! A handler that needs more input replies with buttons. Each button
//! attachment carries a [`ConfirmLabel`] in its `callback_id`/`fallback`,
//! and each button's `value` carries the typed [`Confirmation`] state as
//! JSON. When the click comes back, the label selects the second-stage
//! handler and the value must decode to the variant that label expects.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::command::CommandName;
use crate::error::{BudError, Result};

/// Button value that aborts a confirmation flow.
pub const CANCEL_VALUE: &str = "cancel";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfirmLabel {
    BackupCreate,
    DeployRegion,
    DeployVersion,
    DeployConfirm,
}

impl ConfirmLabel {
    pub fn all() -> &'static [ConfirmLabel] {
        &[
            ConfirmLabel::BackupCreate,
            ConfirmLabel::DeployRegion,
            ConfirmLabel::DeployVersion,
            ConfirmLabel::DeployConfirm,
        ]
    }

    pub fn fallback(self) -> &'static str {
        match self {
            ConfirmLabel::BackupCreate => "backup_create",
            ConfirmLabel::DeployRegion => "deploy_region",
            ConfirmLabel::DeployVersion => "deploy_version",
            ConfirmLabel::DeployConfirm => "deploy_confirm",
        }
    }

    pub fn from_fallback(s: &str) -> Option<ConfirmLabel> {
        ConfirmLabel::all().iter().copied().find(|l| l.fallback() == s)
    }

    /// The command and subcommand whose flow produced this label; its role
    /// requirement is re-checked on every click.
    pub fn origin(self) -> (CommandName, &'static str) {
        match self {
            ConfirmLabel::BackupCreate => (CommandName::Backup, "create"),
            ConfirmLabel::DeployRegion
            | ConfirmLabel::DeployVersion
            | ConfirmLabel::DeployConfirm => (CommandName::Deploy, "start"),
        }
    }
}

/// State carried by a button from the first stage to the second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Confirmation {
    BackupCreate {
        env: String,
        table: String,
    },
    DeployRegion {
        service: String,
        env: String,
        region: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
    DeployVersion {
        service: String,
        env: String,
        region: String,
        version: String,
    },
    DeployConfirm {
        service: String,
        env: String,
        region: String,
        version: String,
    },
}

impl Confirmation {
    pub fn label(&self) -> ConfirmLabel {
        match self {
            Confirmation::BackupCreate { .. } => ConfirmLabel::BackupCreate,
            Confirmation::DeployRegion { .. } => ConfirmLabel::DeployRegion,
            Confirmation::DeployVersion { .. } => ConfirmLabel::DeployVersion,
            Confirmation::DeployConfirm { .. } => ConfirmLabel::DeployConfirm,
        }
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decode a button value clicked under `label`.
    ///
    /// `Ok(None)` means the user cancelled. Values that are not JSON come
    /// from older messages whose parameters live in the display text; they
    /// are rebuilt from `original_text` with [`legacy_extract`].
    pub fn decode(label: ConfirmLabel, value: &str, original_text: &str) -> Result<Option<Self>> {
        if value == CANCEL_VALUE {
            return Ok(None);
        }
        let decoded = match serde_json::from_str::<Confirmation>(value) {
            Ok(c) => c,
            Err(_) if !value.trim_start().starts_with('{') => {
                Self::from_legacy(label, value, original_text)?
            }
            Err(e) => return Err(BudError::StaleConfirmation(e.to_string())),
        };
        if decoded.label() != label {
            return Err(BudError::StaleConfirmation(format!(
                "button for '{}' clicked under '{}'",
                decoded.label().fallback(),
                label.fallback()
            )));
        }
        Ok(Some(decoded))
    }

    fn from_legacy(label: ConfirmLabel, value: &str, text: &str) -> Result<Self> {
        let field = |key: &str| {
            legacy_extract(text, key).ok_or_else(|| {
                BudError::StaleConfirmation(format!("'{key}' missing from the original message"))
            })
        };
        Ok(match label {
            ConfirmLabel::BackupCreate => Confirmation::BackupCreate {
                env: field("Environment")?,
                table: field("Table")?,
            },
            ConfirmLabel::DeployRegion => Confirmation::DeployRegion {
                service: field("Service")?,
                env: field("Environment")?,
                region: value.to_string(),
                version: legacy_extract(text, "Version"),
            },
            ConfirmLabel::DeployVersion => Confirmation::DeployVersion {
                service: field("Service")?,
                env: field("Environment")?,
                region: field("Region")?,
                version: value.to_string(),
            },
            ConfirmLabel::DeployConfirm => Confirmation::DeployConfirm {
                service: field("Service")?,
                env: field("Environment")?,
                region: field("Region")?,
                version: field("Version")?,
            },
        })
    }
}

/// Extract `value` from a `*Key:* value` (or `Key: value`) line of a
/// previously posted message.
pub fn legacy_extract(text: &str, key: &str) -> Option<String> {
    let pattern = format!(r"(?mi)^\W*{}\W*:\W*\s*`?([A-Za-z0-9._:/-]+)`?", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Render the `*Key:* value` lines that [`legacy_extract`] can read back.
pub fn describe_fields(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("*{k}:* {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Inbound payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PayloadUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PayloadChannel {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PayloadAction {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Interactive-message payload posted when a user clicks a button.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InteractionPayload {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub callback_id: String,
    #[serde(default)]
    pub actions: Vec<PayloadAction>,
    #[serde(default)]
    pub user: PayloadUser,
    #[serde(default)]
    pub channel: Option<PayloadChannel>,
    #[serde(default)]
    pub response_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub original_message: Option<serde_json::Value>,
}

impl InteractionPayload {
    /// All text of the message the button was attached to.
    pub fn original_text(&self) -> String {
        let Some(msg) = &self.original_message else {
            return String::new();
        };
        let mut parts = Vec::new();
        if let Some(t) = msg.get("text").and_then(|t| t.as_str()) {
            parts.push(t.to_string());
        }
        if let Some(attachments) = msg.get("attachments").and_then(|a| a.as_array()) {
            for a in attachments {
                if let Some(t) = a.get("text").and_then(|t| t.as_str()) {
                    parts.push(t.to_string());
                }
            }
        }
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn fallback_labels_are_injective() {
        let mut seen = HashSet::new();
        for label in ConfirmLabel::all() {
            assert!(seen.insert(label.fallback()), "duplicate {}", label.fallback());
            assert_eq!(ConfirmLabel::from_fallback(label.fallback()), Some(*label));
        }
    }

    #[test]
    fn unknown_fallback_is_none() {
        assert_eq!(ConfirmLabel::from_fallback("deploy"), None);
        assert_eq!(ConfirmLabel::from_fallback(""), None);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let c = Confirmation::DeployConfirm {
            service: "api".into(),
            env: "dev".into(),
            region: "us-east-1".into(),
            version: "1.0.3".into(),
        };
        let decoded = Confirmation::decode(ConfirmLabel::DeployConfirm, &c.encode(), "")
            .unwrap()
            .unwrap();
        assert_eq!(decoded, c);
    }

    #[test]
    fn cancel_decodes_to_none() {
        assert_eq!(
            Confirmation::decode(ConfirmLabel::BackupCreate, CANCEL_VALUE, "").unwrap(),
            None
        );
    }

    #[test]
    fn mismatched_label_is_stale() {
        let c = Confirmation::BackupCreate {
            env: "dev".into(),
            table: "Orders".into(),
        };
        assert!(matches!(
            Confirmation::decode(ConfirmLabel::DeployConfirm, &c.encode(), ""),
            Err(BudError::StaleConfirmation(_))
        ));
    }

    #[test]
    fn legacy_values_rebuild_from_message_text() {
        let text = describe_fields(&[("Service", "api"), ("Environment", "prod")]);
        let c = Confirmation::decode(ConfirmLabel::DeployRegion, "us-west-2", &text)
            .unwrap()
            .unwrap();
        assert_eq!(
            c,
            Confirmation::DeployRegion {
                service: "api".into(),
                env: "prod".into(),
                region: "us-west-2".into(),
                version: None,
            }
        );
    }

    #[test]
    fn legacy_values_without_fields_are_stale() {
        assert!(matches!(
            Confirmation::decode(ConfirmLabel::DeployVersion, "1.0.0", "nothing here"),
            Err(BudError::StaleConfirmation(_))
        ));
    }

    #[test]
    fn legacy_extract_variants() {
        assert_eq!(
            legacy_extract("*Table:* Orders\n*Environment:* dev", "Environment").as_deref(),
            Some("dev")
        );
        assert_eq!(legacy_extract("Region: `us-east-1`", "region").as_deref(), Some("us-east-1"));
        assert_eq!(legacy_extract("no fields", "Region"), None);
    }

    #[test]
    fn payload_parses_minimal_shape() {
        let json = serde_json::json!({
            "type": "interactive_message",
            "callback_id": "backup_create",
            "actions": [{"name": "confirm", "value": "cancel", "type": "button"}],
            "user": {"id": "U1", "name": "ada"},
            "response_url": "https://hooks.example/1",
            "original_message": {
                "text": "hello",
                "attachments": [{"text": "*Table:* Orders"}]
            }
        });
        let p: InteractionPayload = serde_json::from_value(json).unwrap();
        assert_eq!(p.callback_id, "backup_create");
        assert_eq!(p.actions[0].value, "cancel");
        assert_eq!(p.original_text(), "hello\n*Table:* Orders");
    }
}
