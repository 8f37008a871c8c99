use super::policy::{Decision, RetryPolicy};
use super::stats::CallStats;
use crate::config::DispatchConfig;
use crate::format::ResponseFormatter;
use crate::outcome::{FailureKind, NormalizedResult};
use crate::request::RequestSpec;
use crate::transport::TransportPool;
use crate::validation::{ValidationError, Validator};
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Single chokepoint for outbound calls.
///
/// Holds the shared [`TransportPool`] explicitly; cloning a `Dispatcher` shares
/// the pool.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pub(crate) pool: Arc<TransportPool>,
    pub(crate) validator: Validator,
    pub(crate) policy: RetryPolicy,
    pub(crate) formatter: ResponseFormatter,
}

impl Dispatcher {
    pub fn new(pool: Arc<TransportPool>, config: &DispatchConfig) -> Self {
        let validator = Validator::new(pool.credentials().athlete_id().map(str::to_string));
        Self {
            pool,
            validator,
            policy: RetryPolicy::from_config(config),
            formatter: ResponseFormatter::new(config.formatter.clone()),
        }
    }

    /// Build a pool from `config` and a dispatcher owning it.
    pub fn from_config(config: &DispatchConfig) -> Result<Self> {
        let pool = Arc::new(TransportPool::new(config)?);
        Ok(Self::new(pool, config))
    }

    pub fn pool(&self) -> &Arc<TransportPool> {
        &self.pool
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Validate `params` for `operation` and dispatch the resulting request.
    ///
    /// Invalid input is returned as `Err` without touching the network.
    pub async fn call(
        &self,
        operation: &str,
        params: &Value,
    ) -> std::result::Result<NormalizedResult, ValidationError> {
        let spec = self.validator.validate(operation, params)?;
        Ok(self.dispatch(&spec).await)
    }

    pub async fn dispatch(&self, spec: &RequestSpec) -> NormalizedResult {
        self.dispatch_with_stats(spec).await.0
    }

    /// Like [`dispatch`](Self::dispatch) but stops as soon as `token` is
    /// cancelled. The in-flight request and any backoff sleep are dropped.
    pub async fn dispatch_cancellable(
        &self,
        spec: &RequestSpec,
        token: &CancellationToken,
    ) -> NormalizedResult {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!(operation = spec.operation.name(), "intervals call cancelled");
                NormalizedResult::failure(FailureKind::Cancelled, "call cancelled", None)
            }
            result = self.dispatch(spec) => result,
        }
    }

    /// Dispatch with an explicit bounded retry loop and per-call stats.
    pub async fn dispatch_with_stats(&self, spec: &RequestSpec) -> (NormalizedResult, CallStats) {
        let client_request_id = Uuid::new_v4().to_string();
        let mut stats = CallStats::new(spec, &client_request_id);
        let start = Instant::now();

        let segments = match spec.path_segments() {
            Ok(s) => s,
            Err(e) => {
                let result = NormalizedResult::failure(FailureKind::ClientError, e.to_string(), None);
                stats.failure_kind = result.failure_kind();
                return (result, stats);
            }
        };

        let mut attempt: u32 = 0;
        loop {
            let outcome = self
                .execute_once(spec, &segments, &client_request_id, attempt + 1)
                .await;
            if outcome.sent {
                stats.attempts = attempt + 1;
            }
            stats.http_status = outcome.http_status.or(stats.http_status);
            if outcome.upstream_request_id.is_some() {
                stats.upstream_request_id = outcome.upstream_request_id.clone();
            }

            match self.policy.decide(&outcome.result, attempt, outcome.retry_after) {
                Decision::Retry { delay } => {
                    warn!(
                        operation = spec.operation.name(),
                        endpoint = stats.endpoint.as_str(),
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis(),
                        error_class = outcome.result.failure_kind().map(|k| k.name()).unwrap_or(""),
                        "retrying intervals request"
                    );
                    stats.retry_count += 1;
                    stats.backoff_ms += delay.as_millis();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Decision::Fail => {
                    stats.duration_ms = start.elapsed().as_millis();
                    stats.failure_kind = outcome.result.failure_kind();
                    info!(
                        operation = stats.operation.as_str(),
                        endpoint = stats.endpoint.as_str(),
                        status = if outcome.result.is_success() { "success" } else { "failure" },
                        error_class = stats.failure_kind.map(|k| k.name()).unwrap_or(""),
                        http_status = stats.http_status.unwrap_or(0),
                        attempts = stats.attempts,
                        client_request_id = client_request_id.as_str(),
                        duration_ms = stats.duration_ms,
                        "intervals call finished"
                    );
                    return (outcome.result, stats);
                }
            }
        }
    }

    /// Close the shared pool. Later dispatches fail with a non-retryable
    /// transport failure and make no network attempt.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Operation;

    fn dispatcher() -> Dispatcher {
        let cfg = DispatchConfig::new("token")
            .with_athlete_id("i42")
            .with_base_url("http://127.0.0.1:9");
        Dispatcher::from_config(&cfg).unwrap()
    }

    #[tokio::test]
    async fn missing_path_param_is_a_client_error() {
        let d = dispatcher();
        let (result, stats) = d
            .dispatch_with_stats(&RequestSpec::new(Operation::GetActivityDetails))
            .await;
        assert_eq!(result.failure_kind(), Some(FailureKind::ClientError));
        assert_eq!(result.status_code(), None);
        assert_eq!(stats.attempts, 0);
        assert_eq!(d.pool().initializations(), 0);
    }

    #[tokio::test]
    async fn validation_errors_skip_dispatch() {
        let d = dispatcher();
        let err = d
            .call(
                "get_events",
                &serde_json::json!({"start_date": "2024-05-10", "end_date": "2024-05-01"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.reason, "before start");
        assert_eq!(d.pool().initializations(), 0);
    }

    #[tokio::test]
    async fn closed_pool_is_terminal() {
        let d = dispatcher();
        d.shutdown();
        let spec = RequestSpec::new(Operation::GetActivityDetails).with_path_param("activity_id", "i1");
        let (result, stats) = d.dispatch_with_stats(&spec).await;
        assert_eq!(result.failure_kind(), Some(FailureKind::Transport));
        assert!(!result.is_retryable());
        assert_eq!(stats.attempts, 0);
        assert_eq!(stats.retry_count, 0);
    }

    #[tokio::test]
    async fn precancelled_token_short_circuits() {
        let d = dispatcher();
        let token = CancellationToken::new();
        token.cancel();
        let spec = RequestSpec::new(Operation::GetActivityDetails).with_path_param("activity_id", "i1");
        let result = d.dispatch_cancellable(&spec, &token).await;
        assert_eq!(result.failure_kind(), Some(FailureKind::Cancelled));
        assert_eq!(d.pool().initializations(), 0);
    }
}
