//! Shared HTTP transport.
//!
//! One [`TransportPool`] owns the process-wide connection pool. Callers hold an
//! `Arc<TransportPool>` and obtain short-lived [`TransportHandle`]s from it.

mod credentials;
mod pool;

pub use credentials::{AuthScheme, Credentials};
pub use pool::{TransportHandle, TransportPool};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport pool is closed")]
    Closed,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to build HTTP client: {0}")]
    Build(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}
