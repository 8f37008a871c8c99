//! Mock HTTP server setup for integration tests

use intervals_dispatch::{DispatchConfig, Dispatcher};
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const TOKEN: &str = "test-token";
pub const ATHLETE: &str = "i42";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    /// Configuration pointing at the mock server with short, jitter-free backoff.
    pub fn config(&self) -> DispatchConfig {
        DispatchConfig::new(TOKEN)
            .with_base_url(self.base_url.clone())
            .with_athlete_id(ATHLETE)
            .with_retry_delays(Duration::from_millis(10), Duration::from_millis(50))
            .with_retry_jitter_ratio(0.0)
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::from_config(&self.config()).expect("valid test config")
    }

    /// Create a mock for a JSON response, expected exactly `hits` times
    pub async fn mock_json_response(
        &self,
        method: &str,
        path: &str,
        status: usize,
        body: &str,
        hits: usize,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock(method, path)
            .match_query(Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    /// Create a mock for a rate-limited response carrying `Retry-After`
    pub async fn mock_rate_limited(&self, path: &str, retry_after_secs: u64, hits: usize) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("GET", path)
            .match_query(Matcher::Any)
            .with_status(429)
            .with_header("retry-after", &retry_after_secs.to_string())
            .with_body(r#"{"error":"Too many requests"}"#)
            .expect(hits)
            .create_async()
            .await
    }
}

/// Base URL of a local port nothing listens on
pub fn unreachable_config() -> DispatchConfig {
    DispatchConfig::new(TOKEN)
        .with_base_url("http://127.0.0.1:1")
        .with_athlete_id(ATHLETE)
        .with_max_attempts(2)
        .with_retry_delays(Duration::from_millis(10), Duration::from_millis(20))
        .with_retry_jitter_ratio(0.0)
}
