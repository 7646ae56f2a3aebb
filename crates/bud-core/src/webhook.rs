//! Posting chat messages to a callback URL.

use std::sync::Mutex;
use std::time::Duration;

use crate::error::{BudError, Result};
use crate::response::SlackResponse;

pub trait ChatWebhook: Send + Sync {
    fn post(&self, url: &str, message: &SlackResponse) -> Result<()>;
}

/// Posts JSON to the callback URL over HTTPS.
///
/// Uses the blocking client; call it from a blocking context
/// (`spawn_blocking` in the server worker).
pub struct HttpWebhook {
    timeout: Duration,
}

impl HttpWebhook {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ChatWebhook for HttpWebhook {
    fn post(&self, url: &str, message: &SlackResponse) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| BudError::Webhook(e.to_string()))?;
        let resp = client
            .post(url)
            .json(message)
            .send()
            .map_err(|e| BudError::Webhook(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(BudError::Webhook(format!("{url} answered {status}: {body}")));
        }
        Ok(())
    }
}

/// Keeps every posted message in memory.
#[derive(Default)]
pub struct RecordingWebhook {
    posted: Mutex<Vec<(String, SlackResponse)>>,
}

impl RecordingWebhook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posted(&self) -> Vec<(String, SlackResponse)> {
        self.posted
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl ChatWebhook for RecordingWebhook {
    fn post(&self, url: &str, message: &SlackResponse) -> Result<()> {
        self.posted
            .lock()
            .map_err(|_| BudError::Webhook("recorder lock poisoned".into()))?
            .push((url.to_string(), message.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_webhook_posts_json() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/hooks/abc")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "response_type": "ephemeral",
                "text": "done"
            })))
            .with_status(200)
            .with_body("ok")
            .create();

        let hook = HttpWebhook::new(Duration::from_secs(5));
        let url = format!("{}/hooks/abc", server.url());
        hook.post(&url, &SlackResponse::ephemeral("done")).unwrap();
        mock.assert();
    }

    #[test]
    fn http_webhook_reports_non_success() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/hooks/gone")
            .with_status(404)
            .with_body("expired_url")
            .create();

        let hook = HttpWebhook::new(Duration::from_secs(5));
        let url = format!("{}/hooks/gone", server.url());
        let err = hook
            .post(&url, &SlackResponse::ephemeral("done"))
            .unwrap_err();
        match err {
            BudError::Webhook(msg) => assert!(msg.contains("404"), "{msg}"),
            other => panic!("expected webhook error, got {other:?}"),
        }
    }

    #[test]
    fn recording_webhook_keeps_order() {
        let hook = RecordingWebhook::new();
        hook.post("u1", &SlackResponse::ephemeral("a")).unwrap();
        hook.post("u2", &SlackResponse::ephemeral("b")).unwrap();
        let posted = hook.posted();
        assert_eq!(posted.len(), 2);
        assert_eq!(posted[1].0, "u2");
    }
}
