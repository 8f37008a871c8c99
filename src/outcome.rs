//! Normalized call outcomes: the only values that leave the dispatch core.
//!
//! Every dispatched request terminates in exactly one [`NormalizedResult`].
//! Failures carry a [`FailureKind`] with fixed retry semantics so callers can
//! branch on `retryable` without inspecting transport details.
//!
//! ## Failure kinds
//!
//! | Kind                 | Cause                                   | Retryable |
//! |----------------------|-----------------------------------------|-----------|
//! | `transport`          | connect error, reset, timeout           | yes       |
//! | `service_unavailable`| HTTP 429 or 5xx                         | yes       |
//! | `client_error`       | any other HTTP 4xx                      | no        |
//! | `malformed_response` | 2xx with an unparsable body             | no        |
//! | `cancelled`          | host cancelled the call                 | no        |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connectivity problem or timeout before a response was received
    Transport,
    /// Remote overload, rate limiting or maintenance (429, 5xx)
    ServiceUnavailable,
    /// The service rejected the request semantically (4xx other than 429)
    ClientError,
    /// 2xx response whose body could not be parsed
    MalformedResponse,
    /// The call was cancelled by its issuer
    Cancelled,
}

impl FailureKind {
    /// Returns the standard name (e.g., `"client_error"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::ServiceUnavailable => "service_unavailable",
            Self::ClientError => "client_error",
            Self::MalformedResponse => "malformed_response",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether this kind is retried by default.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Transport | Self::ServiceUnavailable)
    }

    /// Maps a non-success HTTP status to its failure kind.
    ///
    /// Returns `None` for 1xx/2xx/3xx statuses, which are not failures on their own.
    pub fn from_http_status(status: u16) -> Option<Self> {
        match status {
            429 | 500..=599 => Some(Self::ServiceUnavailable),
            400..=499 => Some(Self::ClientError),
            _ => None,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a single dispatched operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NormalizedResult {
    Success {
        data: serde_json::Value,
    },
    Failure {
        kind: FailureKind,
        message: String,
        retryable: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },
}

impl NormalizedResult {
    pub fn success(data: serde_json::Value) -> Self {
        NormalizedResult::Success { data }
    }

    /// Build a failure whose `retryable` flag follows the kind's default.
    pub fn failure(kind: FailureKind, message: impl Into<String>, status_code: Option<u16>) -> Self {
        NormalizedResult::Failure {
            kind,
            message: message.into(),
            retryable: kind.retryable(),
            status_code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NormalizedResult::Success { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            NormalizedResult::Success { .. } => false,
            NormalizedResult::Failure { retryable, .. } => *retryable,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            NormalizedResult::Success { .. } => None,
            NormalizedResult::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            NormalizedResult::Success { .. } => None,
            NormalizedResult::Failure { status_code, .. } => *status_code,
        }
    }

    /// Borrow the payload of a successful result.
    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            NormalizedResult::Success { data } => Some(data),
            NormalizedResult::Failure { .. } => None,
        }
    }
}
