//! Chat response payloads.
//!
//! Replies follow the classic slash-command message shape: a
//! `response_type`, optional top-level `text`, and a list of attachments
//! that may carry interactive buttons.

use serde::{Deserialize, Serialize};

use crate::error::GENERIC_ERROR_TEXT;
use crate::types::ResponseType;

pub const COLOR_GOOD: &str = "good";
pub const COLOR_WARNING: &str = "warning";
pub const COLOR_DANGER: &str = "danger";
pub const COLOR_INFO: &str = "#439FE0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackResponse {
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// When answering a button click, replace the message the button was on.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub replace_original: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mrkdwn_in: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Button>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub name: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl Button {
    pub fn new(name: impl Into<String>, text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            kind: "button".to_string(),
            value: value.into(),
            style: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.style = Some("primary".to_string());
        self
    }

    pub fn danger(mut self) -> Self {
        self.style = Some("danger".to_string());
        self
    }
}

impl Attachment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            title: None,
            text: text.into(),
            color: None,
            mrkdwn_in: vec!["text".to_string()],
            fallback: None,
            callback_id: None,
            actions: Vec::new(),
        }
    }

    pub fn titled(title: impl Into<String>, text: impl Into<String>) -> Self {
        let mut a = Self::new(text);
        a.title = Some(title.into());
        a
    }

    pub fn color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }
}

impl SlackResponse {
    /// Plain ephemeral text reply.
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Ephemeral,
            text: Some(text.into()),
            attachments: Vec::new(),
            replace_original: false,
        }
    }

    /// Reply with exactly one titled attachment.
    pub fn attachment(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Ephemeral,
            text: None,
            attachments: vec![Attachment::titled(title, text)],
            replace_original: false,
        }
    }

    pub fn from_attachments(attachments: Vec<Attachment>) -> Self {
        Self {
            response_type: ResponseType::Ephemeral,
            text: None,
            attachments,
            replace_original: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::from_attachments(vec![Attachment::new(text).color(COLOR_DANGER)])
    }

    /// The reply for text that does not name a known command.
    pub fn invalid_command(text: &str) -> Self {
        let shown = text.trim();
        let message = if shown.is_empty() {
            "Invalid command. Try `help` to see what I can do.".to_string()
        } else {
            format!("Invalid command: `{shown}`. Try `help` to see what I can do.")
        };
        Self::error(message)
    }

    pub fn generic_error() -> Self {
        Self::error(GENERIC_ERROR_TEXT)
    }

    pub fn in_channel(mut self) -> Self {
        self.response_type = ResponseType::InChannel;
        self
    }

    pub fn replacing(mut self) -> Self {
        self.replace_original = true;
        self
    }

    /// Append an attachment carrying buttons correlated by `label`.
    ///
    /// The label goes into both `callback_id` and `fallback`, which is how
    /// the follow-up click finds its way back to the originating handler.
    pub fn with_buttons(mut self, label: &str, text: impl Into<String>, buttons: Vec<Button>) -> Self {
        let mut a = Attachment::new(text).color(COLOR_INFO);
        a.fallback = Some(label.to_string());
        a.callback_id = Some(label.to_string());
        a.actions = buttons;
        self.attachments.push(a);
        self
    }

    /// All human-readable text in this reply, for logs and CLI output.
    pub fn plain_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(t) = &self.text {
            parts.push(t.clone());
        }
        for a in &self.attachments {
            if let Some(title) = &a.title {
                parts.push(title.clone());
            }
            if !a.text.is_empty() {
                parts.push(a.text.clone());
            }
            for b in &a.actions {
                parts.push(format!("[{}]", b.text));
            }
        }
        parts.join("\n")
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// HTTP-style wrapper returned by event-triggered invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub status_code: String,
    pub body: String,
}

impl Envelope {
    pub fn ok(response: &SlackResponse) -> Self {
        Self {
            status_code: "200".to_string(),
            body: serde_json::to_string(response).unwrap_or_default(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self {
            status_code: "400".to_string(),
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_reply_has_documented_shape() {
        let r = SlackResponse::attachment("Create Backup", "Starting backup: foo-2024-01-01");
        let json = r.to_json();
        assert_eq!(json["response_type"], "ephemeral");
        let attachments = json["attachments"].as_array().unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0]["title"], "Create Backup");
        assert_eq!(attachments[0]["text"], "Starting backup: foo-2024-01-01");
        assert_eq!(attachments[0]["mrkdwn_in"], serde_json::json!(["text"]));
        assert!(json.get("text").is_none());
        assert!(json.get("replace_original").is_none());
    }

    #[test]
    fn ephemeral_text_omits_attachments() {
        let json = SlackResponse::ephemeral("hi").to_json();
        assert_eq!(json["text"], "hi");
        assert!(json.get("attachments").is_none());
    }

    #[test]
    fn in_channel_changes_response_type() {
        let json = SlackResponse::ephemeral("hi").in_channel().to_json();
        assert_eq!(json["response_type"], "in_channel");
    }

    #[test]
    fn buttons_carry_label_in_fallback_and_callback_id() {
        let r = SlackResponse::ephemeral("Pick one").with_buttons(
            "deploy_region",
            "Which region?",
            vec![Button::new("region", "us-east-1", "{}").primary()],
        );
        let json = r.to_json();
        let a = &json["attachments"][0];
        assert_eq!(a["fallback"], "deploy_region");
        assert_eq!(a["callback_id"], "deploy_region");
        assert_eq!(a["actions"][0]["type"], "button");
        assert_eq!(a["actions"][0]["style"], "primary");
    }

    #[test]
    fn response_roundtrips_through_json() {
        let r = SlackResponse::attachment("Create Backup", "Starting backup: foo-2024-01-01")
            .in_channel();
        let text = serde_json::to_string(&r).unwrap();
        let back: SlackResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn envelope_status_codes() {
        let ok = Envelope::ok(&SlackResponse::ephemeral("x"));
        assert_eq!(ok.status_code, "200");
        let json = serde_json::to_value(&ok).unwrap();
        assert!(json.get("statusCode").is_some());
        assert_eq!(Envelope::bad_request("nope").status_code, "400");
    }

    #[test]
    fn invalid_command_mentions_text() {
        let r = SlackResponse::invalid_command("frobnicate now");
        assert!(r.plain_text().contains("`frobnicate now`"));
    }
}
