//! Dispatch configuration.
//!
//! All knobs are read once, when the [`TransportPool`](crate::transport::TransportPool)
//! is constructed. Values can come from code (builder setters), from the
//! environment ([`DispatchConfig::from_env`]) or from a YAML file
//! ([`DispatchConfig::from_yaml_file`]).

use crate::format::FormatterConfig;
use crate::transport::{AuthScheme, Credentials};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://intervals.icu/api/v1";

/// Largest pool the in-flight semaphore can be sized for.
pub const MAX_CONNECTIONS: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Complete configuration surface consumed by the dispatch core.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub base_url: String,
    pub api_key: String,
    /// Default athlete (account) identifier injected when a call omits one.
    pub athlete_id: Option<String>,
    pub auth_scheme: AuthScheme,
    /// Maximum transport attempts per call, first attempt included.
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Upper bound of the additive jitter as a fraction of the computed delay.
    pub retry_jitter_ratio: f64,
    pub connect_timeout_ms: u64,
    /// Whole-request deadline, response body included.
    pub request_timeout_ms: u64,
    /// Caps concurrent in-flight requests and idle sockets per host.
    pub max_connections: usize,
    /// Seconds before an idle pooled socket is closed.
    pub keepalive_expiry_secs: u64,
    pub formatter: FormatterConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            athlete_id: None,
            auth_scheme: AuthScheme::Bearer,
            max_attempts: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 8_000,
            retry_jitter_ratio: 0.1,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            max_connections: 10,
            keepalive_expiry_secs: 90,
            formatter: FormatterConfig::default(),
        }
    }
}

impl std::fmt::Debug for DispatchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("athlete_id", &self.athlete_id)
            .field("auth_scheme", &self.auth_scheme)
            .field("max_attempts", &self.max_attempts)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("retry_max_delay_ms", &self.retry_max_delay_ms)
            .field("retry_jitter_ratio", &self.retry_jitter_ratio)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("max_connections", &self.max_connections)
            .field("keepalive_expiry_secs", &self.keepalive_expiry_secs)
            .field("formatter", &self.formatter)
            .finish()
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

impl DispatchConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// - `API_KEY` / `INTERVALS_API_KEY`
    /// - `ATHLETE_ID`
    /// - `INTERVALS_API_BASE_URL`
    /// - `INTERVALS_AUTH_SCHEME` (`bearer` or `basic`)
    /// - `INTERVALS_HTTP_TIMEOUT_SECS`, `INTERVALS_HTTP_CONNECT_TIMEOUT_SECS`
    /// - `INTERVALS_HTTP_POOL_MAX_CONNECTIONS`, `INTERVALS_HTTP_POOL_IDLE_TIMEOUT_SECS`
    /// - `INTERVALS_MAX_ATTEMPTS`, `INTERVALS_RETRY_BASE_DELAY_MS`, `INTERVALS_RETRY_MAX_DELAY_MS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = env::var("INTERVALS_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .unwrap_or_default();
        let auth_scheme = env::var("INTERVALS_AUTH_SCHEME")
            .ok()
            .and_then(|s| AuthScheme::parse(&s))
            .unwrap_or(defaults.auth_scheme);

        Self {
            base_url: env::var("INTERVALS_API_BASE_URL").unwrap_or(defaults.base_url),
            api_key,
            athlete_id: env::var("ATHLETE_ID")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            auth_scheme,
            max_attempts: env_parse("INTERVALS_MAX_ATTEMPTS").unwrap_or(defaults.max_attempts),
            retry_base_delay_ms: env_parse("INTERVALS_RETRY_BASE_DELAY_MS")
                .unwrap_or(defaults.retry_base_delay_ms),
            retry_max_delay_ms: env_parse("INTERVALS_RETRY_MAX_DELAY_MS")
                .unwrap_or(defaults.retry_max_delay_ms),
            retry_jitter_ratio: defaults.retry_jitter_ratio,
            connect_timeout_ms: env_parse::<u64>("INTERVALS_HTTP_CONNECT_TIMEOUT_SECS")
                .map(|secs| secs.saturating_mul(1_000))
                .unwrap_or(defaults.connect_timeout_ms),
            request_timeout_ms: env_parse::<u64>("INTERVALS_HTTP_TIMEOUT_SECS")
                .map(|secs| secs.saturating_mul(1_000))
                .unwrap_or(defaults.request_timeout_ms),
            max_connections: env_parse("INTERVALS_HTTP_POOL_MAX_CONNECTIONS")
                .unwrap_or(defaults.max_connections),
            keepalive_expiry_secs: env_parse("INTERVALS_HTTP_POOL_IDLE_TIMEOUT_SECS")
                .unwrap_or(defaults.keepalive_expiry_secs),
            formatter: defaults.formatter,
        }
    }

    /// Load configuration from a YAML file. Missing keys take their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_athlete_id(mut self, athlete_id: impl Into<String>) -> Self {
        self.athlete_id = Some(athlete_id.into());
        self
    }

    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = scheme;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set base and cap of the exponential backoff.
    pub fn with_retry_delays(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base_delay_ms = base.as_millis() as u64;
        self.retry_max_delay_ms = max.as_millis() as u64;
        self
    }

    pub fn with_retry_jitter_ratio(mut self, ratio: f64) -> Self {
        self.retry_jitter_ratio = ratio;
        self
    }

    /// Millisecond precision; anything below 1 ms becomes 1 ms.
    pub fn with_timeouts(mut self, connect: Duration, total: Duration) -> Self {
        self.connect_timeout_ms = duration_ms(connect);
        self.request_timeout_ms = duration_ms(total);
        self
    }

    pub fn with_pool(mut self, max_connections: usize, keepalive_expiry: Duration) -> Self {
        self.max_connections = max_connections;
        self.keepalive_expiry_secs = keepalive_expiry.as_secs();
        self
    }

    pub fn with_formatter(mut self, formatter: FormatterConfig) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn keepalive_expiry(&self) -> Duration {
        Duration::from_secs(self.keepalive_expiry_secs)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.api_key.clone(),
            self.athlete_id.clone(),
            self.auth_scheme,
        )
    }

    /// Fail fast on configuration that could never produce a working transport.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url).map_err(|e| {
            Error::configuration_with_context(
                "base URL is not a valid absolute URL",
                ErrorContext::new()
                    .with_field_path("config.base_url")
                    .with_details(e.to_string())
                    .with_source("config_validator"),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(Error::configuration_with_context(
                "base URL must use http or https",
                ErrorContext::new()
                    .with_field_path("config.base_url")
                    .with_details(format!("scheme: {}", url.scheme()))
                    .with_source("config_validator"),
            ));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "API key is required",
                ErrorContext::new()
                    .with_field_path("config.api_key")
                    .with_source("config_validator"),
            ));
        }
        if self.max_attempts == 0 {
            return Err(Error::configuration_with_context(
                "max_attempts must be at least 1",
                ErrorContext::new()
                    .with_field_path("config.max_attempts")
                    .with_source("config_validator"),
            ));
        }
        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(Error::configuration_with_context(
                "timeouts must be non-zero",
                ErrorContext::new()
                    .with_field_path("config.request_timeout_ms")
                    .with_source("config_validator"),
            ));
        }
        if self.max_connections == 0 {
            return Err(Error::configuration_with_context(
                "max_connections must be at least 1",
                ErrorContext::new()
                    .with_field_path("config.max_connections")
                    .with_source("config_validator"),
            ));
        }
        if self.max_connections > MAX_CONNECTIONS {
            return Err(Error::configuration_with_context(
                "max_connections is too large",
                ErrorContext::new()
                    .with_field_path("config.max_connections")
                    .with_details(format!("{} > {}", self.max_connections, MAX_CONNECTIONS))
                    .with_source("config_validator"),
            ));
        }
        if !(0.0..=1.0).contains(&self.retry_jitter_ratio) {
            return Err(Error::configuration_with_context(
                "retry_jitter_ratio must be within 0.0..=1.0",
                ErrorContext::new()
                    .with_field_path("config.retry_jitter_ratio")
                    .with_details(self.retry_jitter_ratio.to_string())
                    .with_source("config_validator"),
            ));
        }
        Ok(())
    }
}
