//! Request dispatch: the bounded retry loop, per-attempt execution and
//! outcome classification.

mod classification;
mod core;
mod execution;
mod policy;
mod stats;

pub use self::core::Dispatcher;
pub use policy::RetryPolicy;
pub use stats::CallStats;
