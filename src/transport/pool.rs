use super::{Credentials, TransportError};
use crate::config::DispatchConfig;
use crate::Result;
use reqwest::Method;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};
use url::Url;

const USER_AGENT: &str = concat!("intervals-dispatch/", env!("CARGO_PKG_VERSION"));

enum PoolState {
    Uninitialized,
    Ready(reqwest::Client),
    Closed,
}

/// Process-wide owner of the pooled HTTP client.
///
/// The client is built lazily on the first [`acquire`](Self::acquire); racing
/// first callers still produce exactly one client. The state lock is never held
/// across an `.await`.
pub struct TransportPool {
    base_url: Url,
    credentials: Arc<Credentials>,
    connect_timeout: Duration,
    request_timeout: Duration,
    max_connections: usize,
    keepalive_expiry: Duration,
    state: Mutex<PoolState>,
    permits: Arc<Semaphore>,
    initializations: AtomicUsize,
}

impl TransportPool {
    /// Capture configuration. No sockets are opened until the first `acquire`.
    pub fn new(config: &DispatchConfig) -> Result<Self> {
        config.validate()?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            base_url,
            credentials: Arc::new(config.credentials()),
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            max_connections: config.max_connections,
            keepalive_expiry: config.keepalive_expiry(),
            state: Mutex::new(PoolState::Uninitialized),
            permits: Arc::new(Semaphore::new(config.max_connections)),
            initializations: AtomicUsize::new(0),
        })
    }

    fn build_client(&self) -> std::result::Result<reqwest::Client, TransportError> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .pool_max_idle_per_host(self.max_connections)
            .pool_idle_timeout(Some(self.keepalive_expiry))
            .tcp_keepalive(Some(Duration::from_secs(30)))
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))
    }

    /// Get a handle to the shared client, building it on first use.
    pub fn acquire(&self) -> std::result::Result<TransportHandle, TransportError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| TransportError::Build("transport pool lock poisoned".to_string()))?;

        let client = match &*state {
            PoolState::Ready(client) => client.clone(),
            PoolState::Closed => return Err(TransportError::Closed),
            PoolState::Uninitialized => {
                let client = self.build_client()?;
                let n = self.initializations.fetch_add(1, Ordering::SeqCst) + 1;
                info!(
                    base_url = self.base_url.as_str(),
                    max_connections = self.max_connections,
                    keepalive_expiry_secs = self.keepalive_expiry.as_secs(),
                    initializations = n,
                    "transport pool initialized"
                );
                *state = PoolState::Ready(client.clone());
                client
            }
        };

        Ok(TransportHandle {
            client,
            base_url: self.base_url.clone(),
            credentials: self.credentials.clone(),
        })
    }

    /// Wait for a connection slot. The permit is held for one attempt.
    pub async fn permit(&self) -> std::result::Result<OwnedSemaphorePermit, TransportError> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Release the pooled client. Later `acquire`/`permit` calls fail with
    /// [`TransportError::Closed`]; requests already in flight finish on their
    /// own clone of the client.
    pub fn shutdown(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = PoolState::Closed;
        }
        self.permits.close();
        info!(base_url = self.base_url.as_str(), "transport pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.state
            .lock()
            .map(|s| matches!(*s, PoolState::Closed))
            .unwrap_or(true)
    }

    /// Number of times the underlying client has been built (0 or 1).
    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl std::fmt::Debug for TransportPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportPool")
            .field("base_url", &self.base_url.as_str())
            .field("max_connections", &self.max_connections)
            .field("initializations", &self.initializations())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Cheap clone of the pooled client plus the data needed to address and
/// authenticate a request.
#[derive(Clone)]
pub struct TransportHandle {
    client: reqwest::Client,
    base_url: Url,
    credentials: Arc<Credentials>,
}

impl TransportHandle {
    /// Append already-rendered path segments to the base URL, percent-encoding each.
    pub fn url_for<S: AsRef<str>>(
        &self,
        segments: &[S],
    ) -> std::result::Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                TransportError::InvalidUrl(format!("{} cannot be a base", self.base_url))
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment.as_ref());
            }
        }
        Ok(url)
    }

    /// Start a request with auth and correlation headers attached.
    pub fn request(
        &self,
        method: Method,
        url: Url,
        client_request_id: &str,
    ) -> reqwest::RequestBuilder {
        debug!(method = %method, url = url.as_str(), "building request");
        let req = self
            .client
            .request(method, url)
            .header("accept", "application/json")
            .header("x-request-id", client_request_id);
        self.credentials.apply(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> TransportPool {
        let cfg = DispatchConfig::new("token").with_base_url("https://intervals.icu/api/v1/");
        TransportPool::new(&cfg).unwrap()
    }

    #[test]
    fn construction_is_lazy() {
        let p = pool();
        assert_eq!(p.initializations(), 0);
        p.acquire().unwrap();
        p.acquire().unwrap();
        assert_eq!(p.initializations(), 1);
    }

    #[test]
    fn acquire_after_shutdown_fails() {
        let p = pool();
        p.acquire().unwrap();
        p.shutdown();
        assert!(p.is_closed());
        assert!(matches!(p.acquire(), Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn permit_after_shutdown_fails() {
        let p = pool();
        p.shutdown();
        assert!(matches!(p.permit().await, Err(TransportError::Closed)));
    }

    #[test]
    fn url_segments_are_encoded() {
        let p = pool();
        let h = p.acquire().unwrap();
        let url = h.url_for(&["athlete", "i42", "wellness", "2024-05-01"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://intervals.icu/api/v1/athlete/i42/wellness/2024-05-01"
        );
        let url = h.url_for(&["activity", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "https://intervals.icu/api/v1/activity/a%20b%2Fc");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = DispatchConfig::new("");
        assert!(TransportPool::new(&cfg).is_err());
    }
}
