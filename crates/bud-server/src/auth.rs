use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AppError;
use crate::state::AppState;

/// Requests signed more than this many seconds away from now are rejected.
pub const MAX_SKEW_SECS: i64 = 300;

/// Largest request body the signature check will buffer.
const MAX_BODY_BYTES: usize = 1024 * 1024;

pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

/// `v0=<hex hmac-sha256 of "v0:<timestamp>:<body>">`
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(format!("v0:{timestamp}:").as_bytes());
    mac.update(body);
    Some(format!("v0={}", hex::encode(mac.finalize().into_bytes())))
}

/// Check a request signature. `now` is the current Unix time in seconds.
pub fn verify(
    secret: &str,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
    now: i64,
) -> Result<(), &'static str> {
    let timestamp = timestamp.ok_or("missing request timestamp")?;
    let signature = signature.ok_or("missing request signature")?;
    let ts: i64 = timestamp.parse().map_err(|_| "malformed request timestamp")?;
    if (now - ts).abs() > MAX_SKEW_SECS {
        return Err("request timestamp too old");
    }
    let digest = signature
        .strip_prefix("v0=")
        .and_then(|h| hex::decode(h).ok())
        .ok_or("malformed request signature")?;

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "invalid signing secret")?;
    mac.update(format!("v0:{timestamp}:").as_bytes());
    mac.update(body);
    mac.verify_slice(&digest)
        .map_err(|_| "request signature mismatch")
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Axum middleware that verifies the chat platform's request signature.
///
/// With no signing secret configured the middleware is a transparent no-op.
/// Otherwise the body is buffered, checked, and handed on unchanged.
pub async fn slack_signature(State(app): State<AppState>, req: Request, next: Next) -> Response {
    let Some(secret) = app
        .bot
        .config
        .slack
        .signing_secret
        .clone()
        .filter(|s| !s.is_empty())
    else {
        return next.run(req).await;
    };

    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(b) => b,
        Err(_) => return AppError::unauthorized("unreadable request body").into_response(),
    };

    let checked = verify(
        &secret,
        header(&parts.headers, TIMESTAMP_HEADER),
        header(&parts.headers, SIGNATURE_HEADER),
        &bytes,
        chrono::Utc::now().timestamp(),
    );
    match checked {
        Ok(()) => next.run(Request::from_parts(parts, Body::from(bytes))).await,
        Err(reason) => {
            tracing::warn!(path = %parts.uri.path(), reason, "rejected unsigned request");
            AppError::unauthorized(reason).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";

    #[test]
    fn signed_request_verifies() {
        let body = b"token=x&text=help";
        let sig = sign(SECRET, "1700000000", body).unwrap();
        assert!(sig.starts_with("v0="));
        assert_eq!(
            verify(SECRET, Some("1700000000"), Some(&sig), body, 1_700_000_100),
            Ok(())
        );
    }

    #[test]
    fn tampered_body_fails() {
        let sig = sign(SECRET, "1700000000", b"text=help").unwrap();
        assert_eq!(
            verify(SECRET, Some("1700000000"), Some(&sig), b"text=deploy", 1_700_000_000),
            Err("request signature mismatch")
        );
    }

    #[test]
    fn stale_timestamp_fails() {
        let sig = sign(SECRET, "1700000000", b"").unwrap();
        assert_eq!(
            verify(SECRET, Some("1700000000"), Some(&sig), b"", 1_700_000_000 + MAX_SKEW_SECS + 1),
            Err("request timestamp too old")
        );
    }

    #[test]
    fn missing_headers_fail() {
        assert!(verify(SECRET, None, Some("v0=00"), b"", 0).is_err());
        assert!(verify(SECRET, Some("0"), None, b"", 0).is_err());
        assert_eq!(
            verify(SECRET, Some("0"), Some("v1=zz"), b"", 0),
            Err("malformed request signature")
        );
    }
}
