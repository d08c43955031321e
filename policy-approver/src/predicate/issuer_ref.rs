use async_trait::async_trait;
use policy_config::PredicateKind;
use policy_primitives::{CertificateRequest, CertificateRequestPolicy, IssuerRef, IssuerRefSelector};
use tracing::trace;

use super::{Predicate, PredicateResult};
use crate::matcher::optional_matches;

/// Keeps policies whose issuer reference selector matches the issuer the
/// request targets.
///
/// Policies without an issuer selector match every issuer. The request's
/// issuer kind and group fall back to `Issuer` and `cert-manager.io` when
/// unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorIssuerRef;

fn selector_matches(selector: &IssuerRefSelector, issuer: &IssuerRef) -> bool {
    optional_matches(selector.name(), issuer.name())
        && optional_matches(selector.kind(), issuer.kind_or_default())
        && optional_matches(selector.group(), issuer.group_or_default())
}

#[async_trait]
impl Predicate for SelectorIssuerRef {
    fn name(&self) -> &str {
        PredicateKind::SelectorIssuerRef.as_str()
    }

    async fn filter(
        &self,
        request: &CertificateRequest,
        mut policies: Vec<CertificateRequestPolicy>,
    ) -> PredicateResult<Vec<CertificateRequestPolicy>> {
        let issuer = request.issuer_ref();
        policies.retain(|policy| {
            let keep = policy
                .selector()
                .issuer_ref()
                .is_none_or(|selector| selector_matches(selector, issuer));
            if !keep {
                trace!(policy = policy.name(), issuer = issuer.name(), "issuer ref not selected");
            }
            keep
        });
        Ok(policies)
    }
}
