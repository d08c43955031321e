//! The certificate request under review.

use serde::{Deserialize, Serialize};

use crate::error::validate_name;
use crate::{Error, RequestUid, Result};

/// Issuer kind assumed when a request leaves it unset.
pub const DEFAULT_ISSUER_KIND: &str = "Issuer";

/// Issuer group assumed when a request leaves it unset.
pub const DEFAULT_ISSUER_GROUP: &str = "cert-manager.io";

/// Reference to the issuer that would sign the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerRef {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group: Option<String>,
}

impl IssuerRef {
    /// Creates a reference with kind and group left to their defaults.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            group: None,
        }
    }

    /// Sets the issuer kind.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the issuer group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Returns the issuer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the kind as written on the request.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Returns the group as written on the request.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Returns the kind, falling back to [`DEFAULT_ISSUER_KIND`] when unset or empty.
    #[must_use]
    pub fn kind_or_default(&self) -> &str {
        self.kind
            .as_deref()
            .filter(|kind| !kind.is_empty())
            .unwrap_or(DEFAULT_ISSUER_KIND)
    }

    /// Returns the group, falling back to [`DEFAULT_ISSUER_GROUP`] when unset or empty.
    #[must_use]
    pub fn group_or_default(&self) -> &str {
        self.group
            .as_deref()
            .filter(|group| !group.is_empty())
            .unwrap_or(DEFAULT_ISSUER_GROUP)
    }
}

/// A pending certificate request, as seen by the review engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uid: Option<RequestUid>,
    name: String,
    namespace: String,
    username: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    groups: Vec<String>,
    issuer_ref: IssuerRef,
}

impl CertificateRequest {
    /// Creates a request made by `username` in `namespace` against `issuer_ref`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for an empty request or namespace name and
    /// [`Error::InvalidObject`] when the username is empty.
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        username: impl Into<String>,
        issuer_ref: IssuerRef,
    ) -> Result<Self> {
        let name = name.into();
        validate_name("certificate request", &name)?;
        let namespace = namespace.into();
        validate_name("namespace", &namespace)?;
        let username = username.into();
        if username.trim().is_empty() {
            return Err(Error::InvalidObject {
                kind: "certificate request",
                reason: "username cannot be empty".into(),
            });
        }

        Ok(Self {
            uid: None,
            name,
            namespace,
            username,
            groups: Vec::new(),
            issuer_ref,
        })
    }

    /// Records the uid the store assigned to the request.
    #[must_use]
    pub fn with_uid(mut self, uid: RequestUid) -> Self {
        self.uid = Some(uid);
        self
    }

    /// Adds groups the requester belongs to, skipping blank entries.
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for group in groups {
            let group = group.into();
            if !group.trim().is_empty() {
                self.groups.push(group);
            }
        }
        self
    }

    /// Returns the store-assigned uid, absent for requests not yet persisted.
    #[must_use]
    pub const fn uid(&self) -> Option<RequestUid> {
        self.uid
    }

    /// Returns the request name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the namespace the request was created in.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the principal that created the request.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the groups of the requesting principal.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Returns the targeted issuer.
    #[must_use]
    pub fn issuer_ref(&self) -> &IssuerRef {
        &self.issuer_ref
    }
}
