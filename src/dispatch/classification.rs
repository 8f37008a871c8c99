//! Mapping of raw HTTP outcomes onto [`NormalizedResult`] failures.

use crate::outcome::{FailureKind, NormalizedResult};
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::time::Duration;

const MAX_MESSAGE_CHARS: usize = 500;

pub(crate) const REQUEST_ID_HEADERS: &[&str] = &["x-request-id", "request-id", "cf-ray"];

/// First non-empty value among `names`.
pub(crate) fn header_first(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// `Retry-After` as delta-seconds or an HTTP date.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = header_first(headers, &["retry-after"])?;
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = chrono::DateTime::parse_from_rfc2822(&raw).ok()?;
    let wait = at.signed_duration_since(chrono::Utc::now());
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}

/// Human-readable detail from an error body: the service's `message`,
/// `error` or `detail` field when present, else the trimmed raw text.
pub(crate) fn error_message(body: &[u8]) -> Option<String> {
    if let Ok(json) = serde_json::from_slice::<Value>(body) {
        for key in ["message", "error", "detail"] {
            match json.get(key) {
                Some(Value::String(s)) if !s.trim().is_empty() => return Some(clip(s.trim())),
                Some(Value::Object(inner)) => {
                    if let Some(Value::String(s)) = inner.get("message") {
                        return Some(clip(s.trim()));
                    }
                }
                _ => {}
            }
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    (!text.is_empty()).then(|| clip(text))
}

fn clip(s: &str) -> String {
    match s.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((cut, _)) => format!("{}…", &s[..cut]),
        None => s.to_string(),
    }
}

/// Classify a non-2xx response.
pub(crate) fn classify_status(status: reqwest::StatusCode, body: &[u8]) -> NormalizedResult {
    let code = status.as_u16();
    let detail = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    });
    match FailureKind::from_http_status(code) {
        Some(kind) => NormalizedResult::failure(kind, format!("HTTP {}: {}", code, detail), Some(code)),
        None => NormalizedResult::failure(
            FailureKind::MalformedResponse,
            format!("unexpected HTTP status {}", code),
            Some(code),
        ),
    }
}

/// Classify a request that never produced a usable response.
pub(crate) fn classify_transport(err: &reqwest::Error) -> NormalizedResult {
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        format!("transport error: {}", err)
    };
    NormalizedResult::failure(FailureKind::Transport, message, None)
}

/// A transport failure that retrying cannot fix (pool closed, bad URL).
pub(crate) fn terminal_transport(message: impl Into<String>) -> NormalizedResult {
    NormalizedResult::Failure {
        kind: FailureKind::Transport,
        message: message.into(),
        retryable: false,
        status_code: None,
    }
}
