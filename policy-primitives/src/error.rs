//! Shared error definitions for policy primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the review engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided request identifier could not be parsed.
    #[error("invalid request uid: {source}")]
    InvalidRequestUid {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// An object name failed validation.
    #[error("invalid {kind} name `{name}`: {reason}")]
    InvalidName {
        /// Kind of object being named (e.g. `policy`, `namespace`).
        kind: &'static str,
        /// The offending name.
        name: String,
        /// Human-readable reason for rejection.
        reason: &'static str,
    },

    /// An object failed validation for a reason other than its name.
    #[error("invalid {kind}: {reason}")]
    InvalidObject {
        /// Kind of object being validated.
        kind: &'static str,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

pub(crate) fn validate_name(kind: &'static str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidName {
            kind,
            name: name.to_owned(),
            reason: "name cannot be empty",
        });
    }
    if name.chars().any(char::is_whitespace) {
        return Err(Error::InvalidName {
            kind,
            name: name.to_owned(),
            reason: "name cannot contain whitespace",
        });
    }
    Ok(())
}
