//! Configuration management for the policy approver.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ENV_LOG_FILTER, ENV_LOG_FORMAT};
pub use schema::{ApproverConfig, LogConfig, LogFormat, PredicateKind, ReviewConfig};
