//! Namespace objects consulted by label-based policy selection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::validate_name;
use crate::Result;

/// A namespace and the labels attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
}

impl Namespace {
    /// Creates an unlabelled namespace.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidName`] when the name is empty or contains
    /// whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name("namespace", &name)?;
        Ok(Self {
            name,
            labels: BTreeMap::new(),
        })
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Returns the namespace name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the namespace labels.
    #[must_use]
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Returns true when every `required` pair is present with an equal value.
    #[must_use]
    pub fn has_labels(&self, required: &BTreeMap<String, String>) -> bool {
        required
            .iter()
            .all(|(key, value)| self.labels.get(key) == Some(value))
    }
}
