//! Role based access control objects.
//!
//! Requesters are bound to policies through roles granting the `use` verb on
//! the policy resource, with the granted policies enumerated by name.

use serde::{Deserialize, Serialize};

use crate::error::validate_name;
use crate::{Error, Result};

/// API group of the policy resource.
pub const POLICY_API_GROUP: &str = "policy.cert-manager.io";

/// Plural resource name of certificate request policies.
pub const POLICY_RESOURCE: &str = "certificaterequestpolicies";

/// Verb a requester must be granted on a policy to have it considered.
pub const VERB_USE: &str = "use";

const WILDCARD: &str = "*";

/// A single permission rule inside a role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RbacRule {
    #[serde(default)]
    api_groups: Vec<String>,
    #[serde(default)]
    resources: Vec<String>,
    #[serde(default)]
    verbs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    resource_names: Vec<String>,
}

impl RbacRule {
    /// Creates a rule granting `use` on the named policies.
    #[must_use]
    pub fn use_policies<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            api_groups: vec![POLICY_API_GROUP.to_owned()],
            resources: vec![POLICY_RESOURCE.to_owned()],
            verbs: vec![VERB_USE.to_owned()],
            resource_names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an arbitrary rule.
    #[must_use]
    pub fn new(api_groups: Vec<String>, resources: Vec<String>, verbs: Vec<String>) -> Self {
        Self {
            api_groups,
            resources,
            verbs,
            resource_names: Vec::new(),
        }
    }

    /// Restricts the rule to the given resource names.
    #[must_use]
    pub fn with_resource_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Returns the API groups covered by the rule.
    #[must_use]
    pub fn api_groups(&self) -> &[String] {
        &self.api_groups
    }

    /// Returns the resources covered by the rule.
    #[must_use]
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    /// Returns the granted verbs.
    #[must_use]
    pub fn verbs(&self) -> &[String] {
        &self.verbs
    }

    /// Returns the enumerated resource names.
    #[must_use]
    pub fn resource_names(&self) -> &[String] {
        &self.resource_names
    }

    /// Returns true when the rule covers `verb` on `resource` in `api_group`,
    /// honouring `*` entries.
    #[must_use]
    pub fn allows(&self, api_group: &str, resource: &str, verb: &str) -> bool {
        contains_or_wildcard(&self.api_groups, api_group)
            && contains_or_wildcard(&self.resources, resource)
            && contains_or_wildcard(&self.verbs, verb)
    }
}

fn contains_or_wildcard(values: &[String], wanted: &str) -> bool {
    values.iter().any(|value| value == wanted || value == WILDCARD)
}

/// A namespaced set of rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    name: String,
    namespace: String,
    #[serde(default)]
    rules: Vec<RbacRule>,
}

impl Role {
    /// Creates an empty role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for an empty name or namespace.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name("role", &name)?;
        let namespace = namespace.into();
        validate_name("namespace", &namespace)?;
        Ok(Self {
            name,
            namespace,
            rules: Vec::new(),
        })
    }

    /// Appends a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: RbacRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the namespace the role lives in.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the rules.
    #[must_use]
    pub fn rules(&self) -> &[RbacRule] {
        &self.rules
    }
}

/// A cluster-wide set of rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRole {
    name: String,
    #[serde(default)]
    rules: Vec<RbacRule>,
}

impl ClusterRole {
    /// Creates an empty cluster role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for an empty name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name("cluster role", &name)?;
        Ok(Self {
            name,
            rules: Vec::new(),
        })
    }

    /// Appends a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: RbacRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns the cluster role name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the rules.
    #[must_use]
    pub fn rules(&self) -> &[RbacRule] {
        &self.rules
    }
}

/// Kind of principal a binding applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectKind {
    /// A user, matched by username.
    User,
    /// A group, matched by group membership.
    Group,
    /// A service account, matched by its derived username.
    ServiceAccount,
}

/// A principal named by a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    kind: SubjectKind,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
}

impl Subject {
    /// Creates a user subject.
    #[must_use]
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::User,
            name: name.into(),
            namespace: None,
        }
    }

    /// Creates a group subject.
    #[must_use]
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Group,
            name: name.into(),
            namespace: None,
        }
    }

    /// Creates a service account subject.
    #[must_use]
    pub fn service_account(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::ServiceAccount,
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }

    /// Returns the subject kind.
    #[must_use]
    pub const fn kind(&self) -> SubjectKind {
        self.kind
    }

    /// Returns the subject name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the subject namespace, meaningful for service accounts.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

/// Kind of role a binding points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleRefKind {
    /// A namespaced [`Role`].
    Role,
    /// A [`ClusterRole`].
    ClusterRole,
}

/// Reference from a binding to the role it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    kind: RoleRefKind,
    name: String,
}

impl RoleRef {
    /// References a namespaced role.
    #[must_use]
    pub fn role(name: impl Into<String>) -> Self {
        Self {
            kind: RoleRefKind::Role,
            name: name.into(),
        }
    }

    /// References a cluster role.
    #[must_use]
    pub fn cluster_role(name: impl Into<String>) -> Self {
        Self {
            kind: RoleRefKind::ClusterRole,
            name: name.into(),
        }
    }

    /// Returns the referenced kind.
    #[must_use]
    pub const fn kind(&self) -> RoleRefKind {
        self.kind
    }

    /// Returns the referenced name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Grants a role to subjects within one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBinding {
    name: String,
    namespace: String,
    #[serde(default)]
    subjects: Vec<Subject>,
    role_ref: RoleRef,
}

impl RoleBinding {
    /// Creates a binding without subjects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for an empty name or namespace.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        role_ref: RoleRef,
    ) -> Result<Self> {
        let name = name.into();
        validate_name("role binding", &name)?;
        let namespace = namespace.into();
        validate_name("namespace", &namespace)?;
        Ok(Self {
            name,
            namespace,
            subjects: Vec::new(),
            role_ref,
        })
    }

    /// Appends a subject.
    #[must_use]
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    /// Returns the binding name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the namespace the binding applies to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the bound subjects.
    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Returns the granted role.
    #[must_use]
    pub fn role_ref(&self) -> &RoleRef {
        &self.role_ref
    }
}

/// Grants a cluster role to subjects in every namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRoleBinding {
    name: String,
    #[serde(default)]
    subjects: Vec<Subject>,
    role_ref: RoleRef,
}

impl ClusterRoleBinding {
    /// Creates a binding without subjects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for an empty name and
    /// [`Error::InvalidObject`] when `role_ref` does not point at a cluster role.
    pub fn new(name: impl Into<String>, role_ref: RoleRef) -> Result<Self> {
        let name = name.into();
        validate_name("cluster role binding", &name)?;
        if role_ref.kind() != RoleRefKind::ClusterRole {
            return Err(Error::InvalidObject {
                kind: "cluster role binding",
                reason: format!("`{name}` must reference a ClusterRole"),
            });
        }
        Ok(Self {
            name,
            subjects: Vec::new(),
            role_ref,
        })
    }

    /// Appends a subject.
    #[must_use]
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    /// Returns the binding name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the bound subjects.
    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Returns the granted cluster role.
    #[must_use]
    pub fn role_ref(&self) -> &RoleRef {
        &self.role_ref
    }
}
