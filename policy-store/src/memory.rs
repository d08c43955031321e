//! In-memory object store backed by a [`Snapshot`].

use async_trait::async_trait;
use policy_primitives::{
    CertificateRequestPolicy, ClusterRole, ClusterRoleBinding, Namespace, Role, RoleBinding,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{NamespaceGetter, PolicyLister, RbacLister, Snapshot, StoreResult};

/// Object store holding a snapshot in process memory.
///
/// Every read observes the snapshot as it is at the time of that read; a
/// review interleaved with writes may see different states across lookups.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Snapshot>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with a validated snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::InvalidSnapshot`] when names collide.
    pub fn from_snapshot(snapshot: Snapshot) -> StoreResult<Self> {
        snapshot.validate()?;
        Ok(Self {
            inner: RwLock::new(snapshot),
        })
    }

    /// Replaces the whole content of the store.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::InvalidSnapshot`] when names collide; the
    /// previous content is kept in that case.
    pub async fn replace(&self, snapshot: Snapshot) -> StoreResult<()> {
        snapshot.validate()?;
        *self.inner.write().await = snapshot;
        Ok(())
    }

    /// Returns a copy of the current content.
    #[must_use]
    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.clone()
    }

    /// Inserts a policy, replacing one with the same name in place.
    pub async fn upsert_policy(&self, policy: CertificateRequestPolicy) {
        let mut guard = self.inner.write().await;
        upsert(&mut guard.policies, policy, |a, b| a.name() == b.name());
    }

    /// Removes a policy by name, returning it when present.
    pub async fn remove_policy(&self, name: &str) -> Option<CertificateRequestPolicy> {
        let mut guard = self.inner.write().await;
        let index = guard.policies.iter().position(|p| p.name() == name)?;
        Some(guard.policies.remove(index))
    }

    /// Inserts or replaces a namespace.
    pub async fn upsert_namespace(&self, namespace: Namespace) {
        let mut guard = self.inner.write().await;
        upsert(&mut guard.namespaces, namespace, |a, b| a.name() == b.name());
    }

    /// Inserts or replaces a cluster role.
    pub async fn upsert_cluster_role(&self, role: ClusterRole) {
        let mut guard = self.inner.write().await;
        upsert(&mut guard.cluster_roles, role, |a, b| a.name() == b.name());
    }

    /// Inserts or replaces a cluster role binding.
    pub async fn upsert_cluster_role_binding(&self, binding: ClusterRoleBinding) {
        let mut guard = self.inner.write().await;
        upsert(&mut guard.cluster_role_bindings, binding, |a, b| {
            a.name() == b.name()
        });
    }

    /// Inserts or replaces a namespaced role.
    pub async fn upsert_role(&self, role: Role) {
        let mut guard = self.inner.write().await;
        upsert(&mut guard.roles, role, |a, b| {
            a.namespace() == b.namespace() && a.name() == b.name()
        });
    }

    /// Inserts or replaces a namespaced role binding.
    pub async fn upsert_role_binding(&self, binding: RoleBinding) {
        let mut guard = self.inner.write().await;
        upsert(&mut guard.role_bindings, binding, |a, b| {
            a.namespace() == b.namespace() && a.name() == b.name()
        });
    }

    /// Returns object counts for the current content.
    #[must_use]
    pub async fn stats(&self) -> StoreStats {
        let guard = self.inner.read().await;
        StoreStats {
            policies: guard.policies.len(),
            roles: guard.roles.len() + guard.cluster_roles.len(),
            bindings: guard.role_bindings.len() + guard.cluster_role_bindings.len(),
            namespaces: guard.namespaces.len(),
        }
    }
}

fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T, &T) -> bool) {
    if let Some(existing) = items.iter_mut().find(|existing| same(existing, &item)) {
        *existing = item;
    } else {
        items.push(item);
    }
}

/// Object counts held by an [`InMemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of policies.
    pub policies: usize,
    /// Number of roles and cluster roles.
    pub roles: usize,
    /// Number of role bindings and cluster role bindings.
    pub bindings: usize,
    /// Number of namespaces.
    pub namespaces: usize,
}

#[async_trait]
impl PolicyLister for InMemoryStore {
    async fn list_policies(&self) -> StoreResult<Vec<CertificateRequestPolicy>> {
        let guard = self.inner.read().await;
        debug!(count = guard.policies.len(), "listing policies");
        Ok(guard.policies.clone())
    }
}

#[async_trait]
impl RbacLister for InMemoryStore {
    async fn list_cluster_role_bindings(&self) -> StoreResult<Vec<ClusterRoleBinding>> {
        Ok(self.inner.read().await.cluster_role_bindings.clone())
    }

    async fn get_cluster_role(&self, name: &str) -> StoreResult<Option<ClusterRole>> {
        let guard = self.inner.read().await;
        Ok(guard.cluster_roles.iter().find(|r| r.name() == name).cloned())
    }

    async fn list_role_bindings(&self, namespace: &str) -> StoreResult<Vec<RoleBinding>> {
        let guard = self.inner.read().await;
        Ok(guard
            .role_bindings
            .iter()
            .filter(|b| b.namespace() == namespace)
            .cloned()
            .collect())
    }

    async fn get_role(&self, namespace: &str, name: &str) -> StoreResult<Option<Role>> {
        let guard = self.inner.read().await;
        Ok(guard
            .roles
            .iter()
            .find(|r| r.namespace() == namespace && r.name() == name)
            .cloned())
    }
}

#[async_trait]
impl NamespaceGetter for InMemoryStore {
    async fn get_namespace(&self, name: &str) -> StoreResult<Option<Namespace>> {
        let guard = self.inner.read().await;
        Ok(guard.namespaces.iter().find(|n| n.name() == name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy_primitives::{RbacRule, RoleRef, Subject};

    fn policy(name: &str) -> CertificateRequestPolicy {
        CertificateRequestPolicy::new(name).unwrap()
    }

    #[tokio::test]
    async fn upsert_keeps_listing_order() {
        let store = InMemoryStore::new();
        store.upsert_policy(policy("b")).await;
        store.upsert_policy(policy("a")).await;
        store.upsert_policy(policy("c")).await;
        store.upsert_policy(policy("a")).await;

        let names: Vec<_> = store
            .list_policies()
            .await
            .unwrap()
            .iter()
            .map(|p| p.name().to_owned())
            .collect();
        assert_eq!(names, ["b", "a", "c"]);

        assert!(store.remove_policy("a").await.is_some());
        assert!(store.remove_policy("a").await.is_none());
        assert_eq!(store.stats().await.policies, 2);
    }

    #[tokio::test]
    async fn role_bindings_are_scoped_to_namespace() {
        let store = InMemoryStore::new();
        store
            .upsert_role(Role::new("ns-a", "use").unwrap().with_rule(RbacRule::use_policies(["p"])))
            .await;
        store
            .upsert_role_binding(
                RoleBinding::new("ns-a", "bind", RoleRef::role("use"))
                    .unwrap()
                    .with_subject(Subject::user("alice")),
            )
            .await;

        assert_eq!(store.list_role_bindings("ns-a").await.unwrap().len(), 1);
        assert!(store.list_role_bindings("ns-b").await.unwrap().is_empty());
        assert!(store.get_role("ns-a", "use").await.unwrap().is_some());
        assert!(store.get_role("ns-b", "use").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn namespace_lookup_reports_absence() {
        let store = InMemoryStore::new();
        assert!(store.get_namespace("missing").await.unwrap().is_none());

        store
            .upsert_namespace(Namespace::new("present").unwrap().with_label("a", "b"))
            .await;
        let ns = store.get_namespace("present").await.unwrap().unwrap();
        assert_eq!(ns.labels()["a"], "b");
    }

    #[tokio::test]
    async fn replace_rejects_invalid_snapshot_and_keeps_content() {
        let store = InMemoryStore::new();
        store.upsert_policy(policy("keep")).await;

        let invalid = Snapshot {
            policies: vec![policy("x"), policy("x")],
            ..Snapshot::default()
        };
        assert!(store.replace(invalid).await.is_err());
        assert_eq!(store.snapshot().await.policies[0].name(), "keep");
    }
}
