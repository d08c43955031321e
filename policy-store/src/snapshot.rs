//! Serializable point-in-time view of the objects a review reads.

use std::collections::BTreeSet;
use std::path::Path;

use policy_primitives::{
    CertificateRequestPolicy, ClusterRole, ClusterRoleBinding, Namespace, Role, RoleBinding,
};
use serde::{Deserialize, Serialize};

use crate::{StoreError, StoreResult};

/// Policies, RBAC objects and namespaces as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Certificate request policies, in listing order.
    #[serde(default)]
    pub policies: Vec<CertificateRequestPolicy>,
    /// Cluster roles.
    #[serde(default)]
    pub cluster_roles: Vec<ClusterRole>,
    /// Cluster role bindings.
    #[serde(default)]
    pub cluster_role_bindings: Vec<ClusterRoleBinding>,
    /// Namespaced roles.
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Namespaced role bindings.
    #[serde(default)]
    pub role_bindings: Vec<RoleBinding>,
    /// Namespaces.
    #[serde(default)]
    pub namespaces: Vec<Namespace>,
}

impl Snapshot {
    /// Parses a snapshot from JSON text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] for malformed JSON and
    /// [`StoreError::InvalidSnapshot`] when names collide.
    pub fn from_json_str(json: &str) -> StoreResult<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Reads a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the file cannot be read, otherwise the
    /// errors of [`Snapshot::from_json_str`].
    pub async fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&contents)
    }

    /// Serializes the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if encoding fails.
    pub fn to_json_string(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that object names are unique within their scope.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidSnapshot`] naming the first duplicate.
    pub fn validate(&self) -> StoreResult<()> {
        ensure_unique("policy", self.policies.iter().map(|p| p.name().to_owned()))?;
        ensure_unique(
            "cluster role",
            self.cluster_roles.iter().map(|r| r.name().to_owned()),
        )?;
        ensure_unique(
            "cluster role binding",
            self.cluster_role_bindings.iter().map(|b| b.name().to_owned()),
        )?;
        ensure_unique(
            "role",
            self.roles
                .iter()
                .map(|r| format!("{}/{}", r.namespace(), r.name())),
        )?;
        ensure_unique(
            "role binding",
            self.role_bindings
                .iter()
                .map(|b| format!("{}/{}", b.namespace(), b.name())),
        )?;
        ensure_unique(
            "namespace",
            self.namespaces.iter().map(|n| n.name().to_owned()),
        )
    }
}

fn ensure_unique(kind: &str, names: impl Iterator<Item = String>) -> StoreResult<()> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name.clone()) {
            return Err(StoreError::InvalidSnapshot {
                reason: format!("duplicate {kind} `{name}`"),
            });
        }
    }
    Ok(())
}
