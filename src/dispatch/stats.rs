use crate::outcome::FailureKind;
use crate::request::RequestSpec;
use serde::Serialize;

/// Per-call observability record returned by
/// [`Dispatcher::dispatch_with_stats`](super::Dispatcher::dispatch_with_stats).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallStats {
    pub operation: String,
    pub method: String,
    pub endpoint: String,
    /// Status of the last response, if any arrived
    pub http_status: Option<u16>,
    /// Transport attempts made (0 when the call never reached the network)
    pub attempts: u32,
    pub retry_count: u32,
    /// Sum of backoff sleeps between attempts
    pub backoff_ms: u128,
    pub duration_ms: u128,
    pub client_request_id: String,
    pub upstream_request_id: Option<String>,
    pub failure_kind: Option<FailureKind>,
}

impl CallStats {
    pub(crate) fn new(spec: &RequestSpec, client_request_id: &str) -> Self {
        Self {
            operation: spec.operation.name().to_string(),
            method: spec.method.as_str().to_string(),
            endpoint: spec.display_path(),
            http_status: None,
            attempts: 0,
            retry_count: 0,
            backoff_ms: 0,
            duration_ms: 0,
            client_request_id: client_request_id.to_string(),
            upstream_request_id: None,
            failure_kind: None,
        }
    }
}
