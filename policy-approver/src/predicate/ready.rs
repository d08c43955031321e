use async_trait::async_trait;
use policy_config::PredicateKind;
use policy_primitives::{CertificateRequest, CertificateRequestPolicy};

use super::{Predicate, PredicateResult};

/// Keeps only policies reporting a `Ready` condition with status `True`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ready;

#[async_trait]
impl Predicate for Ready {
    fn name(&self) -> &str {
        PredicateKind::Ready.as_str()
    }

    async fn filter(
        &self,
        _request: &CertificateRequest,
        mut policies: Vec<CertificateRequestPolicy>,
    ) -> PredicateResult<Vec<CertificateRequestPolicy>> {
        policies.retain(CertificateRequestPolicy::is_ready);
        Ok(policies)
    }
}
