//! A Tokio-based bounded-concurrency task pool that pulls work from a source,
//! paces task starts towards a target rate, and applies a failure policy.

mod config;
mod error;
mod policy;
mod pool;
mod rate_limiter;
mod report;
pub mod source;
mod task;

pub use config::RunOptions;
pub use error::PoolError;
pub use policy::{FailureAction, FailurePolicy};
pub use pool::{run, ThrottlePool};
pub use report::Report;
pub use source::{IterSource, TaskSource};
pub use task::{Task, TaskInfo, TaskLabel, TaskToExecute};
