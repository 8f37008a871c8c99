//! A single transport attempt. Retry lives in the caller.

use super::classification::{self, REQUEST_ID_HEADERS};
use super::Dispatcher;
use crate::outcome::{FailureKind, NormalizedResult};
use crate::request::RequestSpec;
use bytes::Bytes;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of one attempt plus the response facts the retry policy needs.
pub(crate) struct Attempt {
    pub result: NormalizedResult,
    pub http_status: Option<u16>,
    pub retry_after: Option<Duration>,
    pub upstream_request_id: Option<String>,
    /// False when the attempt failed before anything was sent
    pub sent: bool,
}

impl Attempt {
    fn unsent(result: NormalizedResult) -> Self {
        Self {
            result,
            http_status: None,
            retry_after: None,
            upstream_request_id: None,
            sent: false,
        }
    }
}

impl Dispatcher {
    pub(crate) async fn execute_once(
        &self,
        spec: &RequestSpec,
        segments: &[String],
        client_request_id: &str,
        attempt: u32,
    ) -> Attempt {
        let handle = match self.pool.acquire() {
            Ok(h) => h,
            Err(e) => return Attempt::unsent(classification::terminal_transport(e.to_string())),
        };
        // Held until this attempt's response body is read or the future is dropped.
        let _permit = match self.pool.permit().await {
            Ok(p) => p,
            Err(e) => return Attempt::unsent(classification::terminal_transport(e.to_string())),
        };
        let url = match handle.url_for(segments) {
            Ok(u) => u,
            Err(e) => return Attempt::unsent(classification::terminal_transport(e.to_string())),
        };

        let mut request = handle.request(spec.method.to_reqwest(), url, client_request_id);
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        let start = Instant::now();
        let operation = spec.operation.name();
        let endpoint = spec.path_template;

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    operation,
                    endpoint,
                    attempt,
                    client_request_id,
                    duration_ms = start.elapsed().as_millis(),
                    error = %e,
                    "intervals request failed before a response"
                );
                return Attempt {
                    result: classification::classify_transport(&e),
                    http_status: None,
                    retry_after: None,
                    upstream_request_id: None,
                    sent: true,
                };
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let upstream_request_id = classification::header_first(&headers, REQUEST_ID_HEADERS);
        let retry_after = classification::retry_after(&headers);

        let body: Bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                warn!(
                    http_status = status.as_u16(),
                    operation,
                    endpoint,
                    attempt,
                    error = %e,
                    "intervals response body could not be read"
                );
                return Attempt {
                    result: classification::classify_transport(&e),
                    http_status: Some(status.as_u16()),
                    retry_after,
                    upstream_request_id,
                    sent: true,
                };
            }
        };

        let result = if status.is_success() {
            self.parse_success(spec, status.as_u16(), &body)
        } else {
            classification::classify_status(status, &body)
        };

        match &result {
            NormalizedResult::Success { .. } => debug!(
                http_status = status.as_u16(),
                operation,
                endpoint,
                attempt,
                bytes = body.len(),
                duration_ms = start.elapsed().as_millis(),
                "intervals request succeeded"
            ),
            NormalizedResult::Failure { kind, retryable, .. } => info!(
                http_status = status.as_u16(),
                error_class = kind.name(),
                retryable = *retryable,
                request_id = upstream_request_id.as_deref().unwrap_or(""),
                operation,
                endpoint,
                attempt,
                duration_ms = start.elapsed().as_millis(),
                "intervals request failed"
            ),
        }

        Attempt {
            result,
            http_status: Some(status.as_u16()),
            retry_after,
            upstream_request_id,
            sent: true,
        }
    }

    fn parse_success(&self, spec: &RequestSpec, status: u16, body: &[u8]) -> NormalizedResult {
        if body.iter().all(u8::is_ascii_whitespace) {
            return NormalizedResult::success(serde_json::Value::Null);
        }
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(raw) => NormalizedResult::success(self.formatter.format(spec.operation, &raw)),
            Err(e) => NormalizedResult::failure(
                FailureKind::MalformedResponse,
                format!("response body is not valid JSON: {}", e),
                Some(status),
            ),
        }
    }
}
