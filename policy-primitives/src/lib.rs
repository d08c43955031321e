//! Core shared types for certificate request policy review.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod namespace;
mod policy;
mod rbac;
mod request;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Unique identifier attached to a certificate request.
pub use ids::RequestUid;
/// Namespace objects consulted by label selectors.
pub use namespace::Namespace;
/// Certificate request policies, their selectors and status conditions.
pub use policy::{
    CONDITION_READY, CertificateRequestPolicy, ConditionStatus, IssuerRefSelector,
    NamespaceSelector, PolicyCondition, PolicySelector,
};
/// Role based access control objects binding requesters to policies.
pub use rbac::{
    ClusterRole, ClusterRoleBinding, POLICY_API_GROUP, POLICY_RESOURCE, RbacRule, Role,
    RoleBinding, RoleRef, RoleRefKind, Subject, SubjectKind, VERB_USE,
};
/// The request under review and the issuer it targets.
pub use request::{CertificateRequest, DEFAULT_ISSUER_GROUP, DEFAULT_ISSUER_KIND, IssuerRef};
