//! Configuration loading from JSON files and the environment.

use std::path::Path;

use tracing::debug;

use crate::{ApproverConfig, ConfigError, ConfigResult};

/// Environment variable overriding `log.filter`.
pub const ENV_LOG_FILTER: &str = "APPROVER_POLICY_LOG";

/// Environment variable overriding `log.format`.
pub const ENV_LOG_FORMAT: &str = "APPROVER_POLICY_LOG_FORMAT";

impl ApproverConfig {
    /// Parses and validates a JSON document. Missing sections take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON, unknown fields or
    /// unknown predicate names, and [`ConfigError::Invalid`] when validation
    /// fails.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, otherwise
    /// the errors of [`ApproverConfig::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded approver config");
        Self::from_json_str(&contents)
    }

    /// Applies [`ENV_LOG_FILTER`] and [`ENV_LOG_FORMAT`] from the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override holds an invalid value.
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides resolved through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override holds an invalid value.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(filter) = lookup(ENV_LOG_FILTER) {
            self.log.filter = filter;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.log.format = format.parse()?;
        }
        self.validate()
    }
}
