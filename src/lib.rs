//! # intervals-dispatch
//!
//! Request dispatch and response normalization core for the Intervals.icu
//! training data API.
//!
//! ## Overview
//!
//! A tool-calling host hands this crate an operation name and JSON parameters.
//! The crate validates them, sends one HTTP request through a shared connection
//! pool (retrying transient failures with bounded backoff) and returns a
//! [`NormalizedResult`]: either a normalized payload or a classified failure.
//!
//! Data flow: [`Validator`] → [`Dispatcher`] → [`TransportPool`] → remote
//! service → [`ResponseFormatter`] → caller.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use intervals_dispatch::{DispatchConfig, Dispatcher, NormalizedResult};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> intervals_dispatch::Result<()> {
//!     let config = DispatchConfig::from_env();
//!     let dispatcher = Dispatcher::from_config(&config)?;
//!
//!     let params = json!({"start_date": "2024-05-01", "end_date": "2024-05-07"});
//!     match dispatcher.call("get_activities", &params).await {
//!         Ok(NormalizedResult::Success { data }) => println!("{}", data),
//!         Ok(NormalizedResult::Failure { kind, message, .. }) => eprintln!("{}: {}", kind, message),
//!         Err(invalid) => eprintln!("{}", invalid),
//!     }
//!
//!     dispatcher.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`transport`] | Lazily built, shared HTTP client and credentials |
//! | [`routing`] | Static operation table: method, path, parameter schema |
//! | [`validation`] | Parameter checks producing a [`RequestSpec`] |
//! | [`dispatch`] | Retry loop, attempt execution, outcome classification |
//! | [`format`] | Payload normalization and size ceilings |
//! | [`outcome`] | [`NormalizedResult`] and [`FailureKind`] |
//! | [`config`] | [`DispatchConfig`] from code, env or YAML |

pub mod config;
pub mod dispatch;
pub mod format;
pub mod logging;
pub mod outcome;
pub mod request;
pub mod routing;
pub mod transport;
pub mod validation;

pub use config::DispatchConfig;
pub use dispatch::{CallStats, Dispatcher, RetryPolicy};
pub use format::{FormatterConfig, ResponseFormatter};
pub use outcome::{FailureKind, NormalizedResult};
pub use request::RequestSpec;
pub use routing::{EntityKind, HttpMethod, Operation};
pub use transport::{AuthScheme, Credentials, TransportError, TransportPool};
pub use validation::{ValidationError, Validator};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
