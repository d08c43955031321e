//! Error types for object store access.

use serde_json::Error as SerdeError;
use thiserror::Error;

/// Errors emitted by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not serve the request.
    #[error("store backend error: {reason}")]
    Backend {
        /// Human-readable reason describing the failure.
        reason: String,
    },
    /// Underlying I/O failure while reading a snapshot file.
    #[error("i/o error: {source}")]
    Io {
        /// Source [`std::io::Error`].
        #[from]
        source: std::io::Error,
    },
    /// Snapshot document could not be decoded.
    #[error("snapshot decode error: {source}")]
    Serialization {
        /// Source [`serde_json::Error`].
        #[from]
        source: SerdeError,
    },
    /// Snapshot content is inconsistent.
    #[error("invalid snapshot: {reason}")]
    InvalidSnapshot {
        /// Human-readable reason describing the inconsistency.
        reason: String,
    },
}

impl StoreError {
    /// Helper to construct backend errors from string-like values.
    #[must_use]
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
