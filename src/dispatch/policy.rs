use crate::config::DispatchConfig;
use crate::outcome::NormalizedResult;
use rand::Rng;
use std::time::Duration;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Retry { delay: Duration },
    Fail,
}

/// Bounded exponential backoff with additive jitter.
///
/// Deterministic apart from the jitter term, which is drawn from
/// `[0, jitter_ratio * delay]`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            jitter_ratio: config.retry_jitter_ratio.clamp(0.0, 1.0),
        }
    }

    /// Delay before the next attempt, without jitter.
    ///
    /// `attempt` is 0-based: the first failure uses `base_delay`. A server
    /// supplied `retry_after` replaces the computed value; both are capped.
    pub fn backoff_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let computed = match 1u32.checked_shl(attempt) {
            Some(factor) => self.base_delay.saturating_mul(factor),
            None => self.max_delay,
        };
        retry_after.unwrap_or(computed).min(self.max_delay)
    }

    fn jitter(&self, delay: Duration) -> Duration {
        let ceiling = (delay.as_millis() as f64 * self.jitter_ratio) as u64;
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=ceiling))
    }

    /// Decide what to do after `attempt` (0-based) produced `result`.
    pub(crate) fn decide(
        &self,
        result: &NormalizedResult,
        attempt: u32,
        retry_after: Option<Duration>,
    ) -> Decision {
        if !result.is_retryable() || attempt.saturating_add(1) >= self.max_attempts {
            return Decision::Fail;
        }
        let delay = self.backoff_delay(attempt, retry_after);
        let delay = match retry_after {
            Some(_) => delay,
            None => delay + self.jitter(delay),
        };
        Decision::Retry { delay }
    }
}
