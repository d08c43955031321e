//! Logging setup shared by binaries embedding the review engine.
//!
//! Library crates only emit `tracing` events; installing a subscriber is left
//! to the process owner through [`init_tracing`].

#![warn(missing_docs, clippy::pedantic)]

use policy_config::{LogConfig, LogFormat};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter {filter:?}")]
    InvalidFilter {
        /// Directive as configured.
        filter: String,
        /// Parser failure.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    /// A global subscriber is already installed.
    #[error("failed to install tracing subscriber: {reason}")]
    Install {
        /// Reason reported by `tracing-subscriber`.
        reason: String,
    },
}

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Parses the configured filter directive.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the directive is malformed.
pub fn env_filter(config: &LogConfig) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(&config.filter).map_err(|source| TelemetryError::InvalidFilter {
        filter: config.filter.clone(),
        source,
    })
}

/// Installs a global `fmt` subscriber honouring `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a malformed filter and
/// [`TelemetryError::Install`] when a subscriber is already set.
pub fn init_tracing(config: &LogConfig) -> TelemetryResult<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().with_target(false).try_init(),
        LogFormat::Full => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };

    installed.map_err(|err| TelemetryError::Install {
        reason: err.to_string(),
    })?;
    tracing::debug!(filter = %config.filter, format = ?config.format, "tracing initialised");
    Ok(())
}
