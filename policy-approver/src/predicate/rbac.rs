use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use policy_config::PredicateKind;
use policy_primitives::{
    CertificateRequest, CertificateRequestPolicy, POLICY_API_GROUP, POLICY_RESOURCE, RbacRule,
    RoleRef, RoleRefKind, Subject, SubjectKind, VERB_USE,
};
use policy_store::RbacLister;
use tracing::{debug, warn};

use super::{Predicate, PredicateResult};

const SERVICE_ACCOUNT_PREFIX: &str = "system:serviceaccount:";

/// Keeps policies the requesting user is permitted to `use`.
///
/// Permission comes from cluster role bindings and from role bindings in the
/// request namespace. A rule only grants the policies it lists by name.
pub struct RbacBound {
    rbac: Arc<dyn RbacLister>,
}

impl RbacBound {
    /// Creates the predicate over the supplied RBAC source.
    #[must_use]
    pub fn new(rbac: Arc<dyn RbacLister>) -> Self {
        Self { rbac }
    }

    /// Collects the names of every policy `request` may use.
    async fn usable_policies(&self, request: &CertificateRequest) -> PredicateResult<BTreeSet<String>> {
        let mut usable = BTreeSet::new();

        for binding in self.rbac.list_cluster_role_bindings().await? {
            if binding
                .subjects()
                .iter()
                .any(|subject| subject_matches(subject, None, request))
            {
                let rules = self.rules_for(binding.role_ref(), None).await?;
                grant(&mut usable, &rules);
            }
        }

        let namespace = request.namespace();
        for binding in self.rbac.list_role_bindings(namespace).await? {
            if binding
                .subjects()
                .iter()
                .any(|subject| subject_matches(subject, Some(namespace), request))
            {
                let rules = self.rules_for(binding.role_ref(), Some(namespace)).await?;
                grant(&mut usable, &rules);
            }
        }

        Ok(usable)
    }

    async fn rules_for(
        &self,
        role_ref: &RoleRef,
        namespace: Option<&str>,
    ) -> PredicateResult<Vec<RbacRule>> {
        let rules = match (role_ref.kind(), namespace) {
            (RoleRefKind::ClusterRole, _) => self
                .rbac
                .get_cluster_role(role_ref.name())
                .await?
                .map(|role| role.rules().to_vec()),
            (RoleRefKind::Role, Some(namespace)) => self
                .rbac
                .get_role(namespace, role_ref.name())
                .await?
                .map(|role| role.rules().to_vec()),
            (RoleRefKind::Role, None) => None,
        };

        Ok(rules.unwrap_or_else(|| {
            warn!(role = role_ref.name(), kind = ?role_ref.kind(), namespace, "binding references missing role");
            Vec::new()
        }))
    }
}

impl std::fmt::Debug for RbacBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RbacBound").finish_non_exhaustive()
    }
}

fn grant(usable: &mut BTreeSet<String>, rules: &[RbacRule]) {
    for rule in rules
        .iter()
        .filter(|rule| rule.allows(POLICY_API_GROUP, POLICY_RESOURCE, VERB_USE))
    {
        usable.extend(rule.resource_names().iter().cloned());
    }
}

/// `binding_namespace` is the namespace of a role binding, or `None` for a
/// cluster role binding.
fn subject_matches(
    subject: &Subject,
    binding_namespace: Option<&str>,
    request: &CertificateRequest,
) -> bool {
    match subject.kind() {
        SubjectKind::User => subject.name() == request.username(),
        SubjectKind::Group => request.groups().iter().any(|group| group == subject.name()),
        SubjectKind::ServiceAccount => {
            let Some(namespace) = subject.namespace().or(binding_namespace) else {
                return false;
            };
            request
                .username()
                .strip_prefix(SERVICE_ACCOUNT_PREFIX)
                .and_then(|rest| rest.split_once(':'))
                .is_some_and(|(ns, name)| ns == namespace && name == subject.name())
        }
    }
}

#[async_trait]
impl Predicate for RbacBound {
    fn name(&self) -> &str {
        PredicateKind::RbacBound.as_str()
    }

    async fn filter(
        &self,
        request: &CertificateRequest,
        mut policies: Vec<CertificateRequestPolicy>,
    ) -> PredicateResult<Vec<CertificateRequestPolicy>> {
        if policies.is_empty() {
            return Ok(policies);
        }

        let usable = self.usable_policies(request).await?;
        debug!(user = request.username(), usable = usable.len(), "resolved usable policies");
        policies.retain(|policy| usable.contains(policy.name()));
        Ok(policies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy_primitives::{ClusterRole, ClusterRoleBinding, IssuerRef, Role, RoleBinding};
    use policy_store::InMemoryStore;

    fn policies(names: &[&str]) -> Vec<CertificateRequestPolicy> {
        names
            .iter()
            .map(|name| CertificateRequestPolicy::new(*name).unwrap())
            .collect()
    }

    fn request(namespace: &str, username: &str) -> CertificateRequest {
        CertificateRequest::new("req", namespace, username, IssuerRef::new("ca")).unwrap()
    }

    async fn filter(store: InMemoryStore, request: &CertificateRequest, input: &[&str]) -> Vec<String> {
        RbacBound::new(Arc::new(store))
            .filter(request, policies(input))
            .await
            .unwrap()
            .iter()
            .map(|p| p.name().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn no_bindings_keeps_nothing() {
        let kept = filter(InMemoryStore::new(), &request("ns", "alice"), &["a", "b"]).await;
        assert!(kept.is_empty());
    }

    #[tokio::test]
    async fn namespaced_binding_grants_listed_policies_only() {
        let store = InMemoryStore::new();
        store
            .upsert_role(Role::new("ns-1", "use-a").unwrap().with_rule(RbacRule::use_policies(["a", "c"])))
            .await;
        store
            .upsert_role_binding(
                RoleBinding::new("ns-1", "alice-use-a", RoleRef::role("use-a"))
                    .unwrap()
                    .with_subject(Subject::user("alice")),
            )
            .await;

        assert_eq!(
            filter(store, &request("ns-1", "alice"), &["a", "b", "c"]).await,
            ["a", "c"]
        );
    }

    #[tokio::test]
    async fn namespaced_binding_does_not_leak_into_other_namespaces() {
        let store = InMemoryStore::new();
        store
            .upsert_role(Role::new("ns-1", "use-a").unwrap().with_rule(RbacRule::use_policies(["a"])))
            .await;
        store
            .upsert_role_binding(
                RoleBinding::new("ns-1", "alice-use-a", RoleRef::role("use-a"))
                    .unwrap()
                    .with_subject(Subject::user("alice")),
            )
            .await;

        assert!(filter(store, &request("ns-2", "alice"), &["a"]).await.is_empty());
    }

    #[tokio::test]
    async fn cluster_binding_applies_in_every_namespace() {
        let store = InMemoryStore::new();
        store
            .upsert_cluster_role(ClusterRole::new("use-b").unwrap().with_rule(RbacRule::use_policies(["b"])))
            .await;
        store
            .upsert_cluster_role_binding(
                ClusterRoleBinding::new("devs-use-b", RoleRef::cluster_role("use-b"))
                    .unwrap()
                    .with_subject(Subject::group("devs")),
            )
            .await;

        let request = request("anywhere", "bob").with_groups(["devs"]);
        assert_eq!(filter(store, &request, &["a", "b"]).await, ["b"]);
    }

    #[tokio::test]
    async fn role_binding_may_reference_cluster_role() {
        let store = InMemoryStore::new();
        store
            .upsert_cluster_role(ClusterRole::new("use-a").unwrap().with_rule(RbacRule::use_policies(["a"])))
            .await;
        store
            .upsert_role_binding(
                RoleBinding::new("ns-1", "sa-use-a", RoleRef::cluster_role("use-a"))
                    .unwrap()
                    .with_subject(Subject::service_account("ns-1", "issuer")),
            )
            .await;

        let sa = request("ns-1", "system:serviceaccount:ns-1:issuer");
        assert_eq!(filter(store, &sa, &["a"]).await, ["a"]);
    }

    #[tokio::test]
    async fn rules_for_other_verbs_or_resources_grant_nothing() {
        let store = InMemoryStore::new();
        let wrong_verb = RbacRule::new(
            vec![POLICY_API_GROUP.into()],
            vec![POLICY_RESOURCE.into()],
            vec!["get".into()],
        )
        .with_resource_names(["a"]);
        let wildcard = RbacRule::new(vec!["*".into()], vec!["*".into()], vec!["*".into()])
            .with_resource_names(["b"]);
        let unnamed = RbacRule::new(
            vec![POLICY_API_GROUP.into()],
            vec![POLICY_RESOURCE.into()],
            vec![VERB_USE.into()],
        );
        store
            .upsert_cluster_role(
                ClusterRole::new("mixed")
                    .unwrap()
                    .with_rule(wrong_verb)
                    .with_rule(wildcard)
                    .with_rule(unnamed),
            )
            .await;
        store
            .upsert_cluster_role_binding(
                ClusterRoleBinding::new("alice-mixed", RoleRef::cluster_role("mixed"))
                    .unwrap()
                    .with_subject(Subject::user("alice")),
            )
            .await;

        assert_eq!(
            filter(store, &request("ns", "alice"), &["a", "b", "c"]).await,
            ["b"]
        );
    }

    #[tokio::test]
    async fn dangling_role_reference_is_skipped() {
        let store = InMemoryStore::new();
        store
            .upsert_role_binding(
                RoleBinding::new("ns", "dangling", RoleRef::role("gone"))
                    .unwrap()
                    .with_subject(Subject::user("alice")),
            )
            .await;
        assert!(filter(store, &request("ns", "alice"), &["a"]).await.is_empty());
    }

    #[test]
    fn service_account_subjects_match_derived_username() {
        let req = request("ns-1", "system:serviceaccount:ns-1:issuer");
        assert!(subject_matches(&Subject::service_account("ns-1", "issuer"), None, &req));
        assert!(!subject_matches(&Subject::service_account("ns-2", "issuer"), None, &req));
        assert!(!subject_matches(&Subject::user("issuer"), None, &req));
    }
}
