//! Collaborator interfaces implemented by object stores.

use async_trait::async_trait;
use policy_primitives::{
    CertificateRequestPolicy, ClusterRole, ClusterRoleBinding, Namespace, Role, RoleBinding,
};

use crate::StoreResult;

/// Lists every known certificate request policy.
#[async_trait]
pub trait PolicyLister: Send + Sync {
    /// Returns the full policy set in the store's order.
    async fn list_policies(&self) -> StoreResult<Vec<CertificateRequestPolicy>>;
}

/// Read access to roles and bindings.
#[async_trait]
pub trait RbacLister: Send + Sync {
    /// Returns every cluster role binding.
    async fn list_cluster_role_bindings(&self) -> StoreResult<Vec<ClusterRoleBinding>>;

    /// Looks up a cluster role by name.
    async fn get_cluster_role(&self, name: &str) -> StoreResult<Option<ClusterRole>>;

    /// Returns the role bindings of a namespace.
    async fn list_role_bindings(&self, namespace: &str) -> StoreResult<Vec<RoleBinding>>;

    /// Looks up a namespaced role.
    async fn get_role(&self, namespace: &str, name: &str) -> StoreResult<Option<Role>>;
}

/// Looks up namespace objects.
#[async_trait]
pub trait NamespaceGetter: Send + Sync {
    /// Returns the namespace, or `None` when it does not exist.
    async fn get_namespace(&self, name: &str) -> StoreResult<Option<Namespace>>;
}
