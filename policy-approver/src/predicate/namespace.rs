use std::sync::Arc;

use async_trait::async_trait;
use policy_config::PredicateKind;
use policy_primitives::{CertificateRequest, CertificateRequestPolicy, Namespace, NamespaceSelector};
use policy_store::NamespaceGetter;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use super::{Predicate, PredicateError, PredicateResult};
use crate::matcher::wildcard_matches;

/// Keeps policies whose namespace selector matches the request namespace.
///
/// Name patterns are checked first. The namespace object is fetched at most
/// once per call, and only when a surviving selector requires labels.
pub struct SelectorNamespace {
    namespaces: Arc<dyn NamespaceGetter>,
}

impl SelectorNamespace {
    /// Creates the predicate over the supplied namespace source.
    #[must_use]
    pub fn new(namespaces: Arc<dyn NamespaceGetter>) -> Self {
        Self { namespaces }
    }

    async fn lookup(&self, name: &str) -> PredicateResult<Namespace> {
        debug!(namespace = name, "fetching namespace labels");
        self.namespaces
            .get_namespace(name)
            .await?
            .ok_or_else(|| PredicateError::NamespaceNotFound {
                namespace: name.to_owned(),
            })
    }
}

impl std::fmt::Debug for SelectorNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorNamespace").finish_non_exhaustive()
    }
}

fn names_match(selector: &NamespaceSelector, namespace: &str) -> bool {
    selector.match_names().is_empty()
        || selector
            .match_names()
            .iter()
            .any(|pattern| wildcard_matches(pattern, namespace))
}

#[async_trait]
impl Predicate for SelectorNamespace {
    fn name(&self) -> &str {
        PredicateKind::SelectorNamespace.as_str()
    }

    async fn filter(
        &self,
        request: &CertificateRequest,
        policies: Vec<CertificateRequestPolicy>,
    ) -> PredicateResult<Vec<CertificateRequestPolicy>> {
        let namespace = request.namespace();
        let object = OnceCell::new();
        let mut kept = Vec::with_capacity(policies.len());

        for policy in policies {
            let Some(selector) = policy.selector().namespace() else {
                kept.push(policy);
                continue;
            };

            if !names_match(selector, namespace) {
                trace!(policy = policy.name(), namespace, "namespace name not selected");
                continue;
            }

            if selector.requires_labels() {
                let ns = object.get_or_try_init(|| self.lookup(namespace)).await?;
                if !ns.has_labels(selector.match_labels()) {
                    trace!(policy = policy.name(), namespace, "namespace labels not selected");
                    continue;
                }
            }

            kept.push(policy);
        }

        Ok(kept)
    }
}
