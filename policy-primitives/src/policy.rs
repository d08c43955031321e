//! Certificate request policies and the selectors that scope them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::validate_name;
use crate::Result;

/// Condition type signalling that a policy is ready to be used for review.
pub const CONDITION_READY: &str = "Ready";

/// Tri-state value of a status condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    /// The condition holds.
    True,
    /// The condition does not hold.
    False,
    /// The controller has not determined the condition yet.
    #[default]
    Unknown,
}

/// A named status condition reported on a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCondition {
    #[serde(rename = "type")]
    condition_type: String,
    status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_transition_time: Option<DateTime<Utc>>,
}

impl PolicyCondition {
    /// Creates a condition of the given type and status.
    #[must_use]
    pub fn new(condition_type: impl Into<String>, status: ConditionStatus) -> Self {
        Self {
            condition_type: condition_type.into(),
            status,
            reason: None,
            message: None,
            last_transition_time: None,
        }
    }

    /// Shorthand for a `Ready` condition with the supplied status.
    #[must_use]
    pub fn ready(status: ConditionStatus) -> Self {
        Self::new(CONDITION_READY, status)
    }

    /// Attaches a machine-readable reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Records when the condition last changed status.
    #[must_use]
    pub fn with_last_transition_time(mut self, at: DateTime<Utc>) -> Self {
        self.last_transition_time = Some(at);
        self
    }

    /// Returns the condition type.
    #[must_use]
    pub fn condition_type(&self) -> &str {
        &self.condition_type
    }

    /// Returns the condition status.
    #[must_use]
    pub const fn status(&self) -> ConditionStatus {
        self.status
    }

    /// Returns the optional reason.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns the optional message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the last transition timestamp, if recorded.
    #[must_use]
    pub const fn last_transition_time(&self) -> Option<DateTime<Utc>> {
        self.last_transition_time
    }
}

/// Glob patterns matched against the issuer a request targets.
///
/// A field left as `None` matches any value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerRefSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group: Option<String>,
}

impl IssuerRefSelector {
    /// Creates a selector with every field unset, matching all issuers.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Sets the issuer name pattern.
    #[must_use]
    pub fn with_name(mut self, pattern: impl Into<String>) -> Self {
        self.name = Some(pattern.into());
        self
    }

    /// Sets the issuer kind pattern.
    #[must_use]
    pub fn with_kind(mut self, pattern: impl Into<String>) -> Self {
        self.kind = Some(pattern.into());
        self
    }

    /// Sets the issuer group pattern.
    #[must_use]
    pub fn with_group(mut self, pattern: impl Into<String>) -> Self {
        self.group = Some(pattern.into());
        self
    }

    /// Returns the issuer name pattern.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the issuer kind pattern.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Returns the issuer group pattern.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

/// Namespace scoping for a policy.
///
/// `match_names` holds glob patterns compared with the request namespace;
/// `match_labels` must be a subset of the namespace object's labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSelector {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    match_names: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    match_labels: BTreeMap<String, String>,
}

impl NamespaceSelector {
    /// Creates a selector matching every namespace.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Adds namespace name patterns.
    #[must_use]
    pub fn with_match_names<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.match_names.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Adds a required namespace label.
    #[must_use]
    pub fn with_match_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.match_labels.insert(key.into(), value.into());
        self
    }

    /// Returns the namespace name patterns.
    #[must_use]
    pub fn match_names(&self) -> &[String] {
        &self.match_names
    }

    /// Returns the required namespace labels.
    #[must_use]
    pub fn match_labels(&self) -> &BTreeMap<String, String> {
        &self.match_labels
    }

    /// Returns true when evaluating this selector needs the namespace's labels.
    #[must_use]
    pub fn requires_labels(&self) -> bool {
        !self.match_labels.is_empty()
    }
}

/// Decides which requests a policy is applicable to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    issuer_ref: Option<IssuerRefSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<NamespaceSelector>,
}

impl PolicySelector {
    /// Sets the issuer reference selector.
    #[must_use]
    pub fn with_issuer_ref(mut self, selector: IssuerRefSelector) -> Self {
        self.issuer_ref = Some(selector);
        self
    }

    /// Sets the namespace selector.
    #[must_use]
    pub fn with_namespace(mut self, selector: NamespaceSelector) -> Self {
        self.namespace = Some(selector);
        self
    }

    /// Returns the issuer reference selector, if any.
    #[must_use]
    pub fn issuer_ref(&self) -> Option<&IssuerRefSelector> {
        self.issuer_ref.as_ref()
    }

    /// Returns the namespace selector, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&NamespaceSelector> {
        self.namespace.as_ref()
    }
}

/// A named admission policy for certificate requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRequestPolicy {
    name: String,
    #[serde(default)]
    selector: PolicySelector,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conditions: Vec<PolicyCondition>,
}

impl CertificateRequestPolicy {
    /// Creates a policy with an empty selector and no status conditions.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidName`] when the name is empty or contains
    /// whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name("policy", &name)?;
        Ok(Self {
            name,
            selector: PolicySelector::default(),
            conditions: Vec::new(),
        })
    }

    /// Replaces the selector.
    #[must_use]
    pub fn with_selector(mut self, selector: PolicySelector) -> Self {
        self.selector = selector;
        self
    }

    /// Appends a status condition.
    #[must_use]
    pub fn with_condition(mut self, condition: PolicyCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Returns the policy name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the selector.
    #[must_use]
    pub fn selector(&self) -> &PolicySelector {
        &self.selector
    }

    /// Returns every status condition in reported order.
    #[must_use]
    pub fn conditions(&self) -> &[PolicyCondition] {
        &self.conditions
    }

    /// Returns the first condition of the given type.
    #[must_use]
    pub fn condition(&self, condition_type: &str) -> Option<&PolicyCondition> {
        self.conditions
            .iter()
            .find(|condition| condition.condition_type() == condition_type)
    }

    /// Returns true when the policy reports `Ready=True`.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.condition(CONDITION_READY)
            .is_some_and(|condition| condition.status() == ConditionStatus::True)
    }
}
