//! Strongly typed configuration schema.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult};

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApproverConfig {
    /// Review engine settings.
    pub review: ReviewConfig,
    /// Logging settings.
    pub log: LogConfig,
}

impl ApproverConfig {
    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        self.review.validate()?;
        self.log.validate()
    }
}

/// Predicates that can make up the review pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PredicateKind {
    /// Keeps policies reporting `Ready=True`.
    Ready,
    /// Keeps policies the requester is bound to through RBAC.
    RbacBound,
    /// Keeps policies whose issuer selector matches the request.
    SelectorIssuerRef,
    /// Keeps policies whose namespace selector matches the request.
    SelectorNamespace,
}

impl PredicateKind {
    /// Pipeline used when none is configured.
    pub const DEFAULT_PIPELINE: [Self; 4] = [
        Self::Ready,
        Self::RbacBound,
        Self::SelectorIssuerRef,
        Self::SelectorNamespace,
    ];

    /// Returns the configuration name of the predicate.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::RbacBound => "rbac-bound",
            Self::SelectorIssuerRef => "selector-issuer-ref",
            Self::SelectorNamespace => "selector-namespace",
        }
    }
}

impl Display for PredicateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredicateKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::DEFAULT_PIPELINE
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConfigError::Invalid {
                field: "review.predicates",
                reason: format!("unknown predicate `{s}`"),
            })
    }
}

/// Review engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReviewConfig {
    /// Ordered predicate pipeline.
    pub predicates: Vec<PredicateKind>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            predicates: PredicateKind::DEFAULT_PIPELINE.to_vec(),
        }
    }
}

impl ReviewConfig {
    /// Validates the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the pipeline is empty or lists a
    /// predicate twice.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.predicates.is_empty() {
            return Err(ConfigError::Invalid {
                field: "review.predicates",
                reason: "at least one predicate is required".into(),
            });
        }
        let mut seen = BTreeSet::new();
        for kind in &self.predicates {
            if !seen.insert(*kind) {
                return Err(ConfigError::Invalid {
                    field: "review.predicates",
                    reason: format!("predicate `{kind}` listed more than once"),
                });
            }
        }
        Ok(())
    }
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line, abbreviated output.
    #[default]
    Compact,
    /// Default multi-field human-readable output.
    Full,
    /// Newline-delimited JSON.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "full" => Ok(Self::Full),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Invalid {
                field: "log.format",
                reason: format!("unknown log format `{other}`"),
            }),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing` filter directives, e.g. `info,policy_approver=debug`.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    /// Validates the logging section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the filter is blank.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "log.filter",
                reason: "filter cannot be empty".into(),
            });
        }
        Ok(())
    }
}
