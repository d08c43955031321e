//! Predicates narrowing the set of policies applicable to a request.
//!
//! Each predicate receives the survivors of the previous stage and returns the
//! subset it keeps, preserving input order. Predicates never add policies.

mod issuer_ref;
mod namespace;
mod rbac;
mod ready;

use std::sync::Arc;

use async_trait::async_trait;
use policy_config::PredicateKind;
use policy_primitives::{CertificateRequest, CertificateRequestPolicy};
use policy_store::{NamespaceGetter, RbacLister, StoreError};
use thiserror::Error;

pub use issuer_ref::SelectorIssuerRef;
pub use namespace::SelectorNamespace;
pub use rbac::RbacBound;
pub use ready::Ready;

/// Errors surfaced by predicates. Any error aborts the review.
#[derive(Debug, Error)]
pub enum PredicateError {
    /// A selector needed the labels of a namespace that does not exist.
    #[error("namespace {namespace:?} not found")]
    NamespaceNotFound {
        /// Namespace of the request under review.
        namespace: String,
    },
    /// The object store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A custom predicate failed.
    #[error("predicate failure: {reason}")]
    Failed {
        /// Human-readable explanation for logging and operators.
        reason: String,
    },
}

impl PredicateError {
    /// Convenience helper for custom predicate failures.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// Result alias for predicate operations.
pub type PredicateResult<T> = Result<T, PredicateError>;

/// A filter over candidate policies for one request.
#[async_trait]
pub trait Predicate: Send + Sync {
    /// Stable name used in logs and errors.
    fn name(&self) -> &str;

    /// Returns the ordered subset of `policies` that remain applicable to
    /// `request`.
    async fn filter(
        &self,
        request: &CertificateRequest,
        policies: Vec<CertificateRequestPolicy>,
    ) -> PredicateResult<Vec<CertificateRequestPolicy>>;
}

/// Builds the built-in predicate for `kind`, reading objects from `store`.
#[must_use]
pub fn for_kind<S>(kind: PredicateKind, store: &Arc<S>) -> Arc<dyn Predicate>
where
    S: RbacLister + NamespaceGetter + 'static,
{
    match kind {
        PredicateKind::Ready => Arc::new(Ready),
        PredicateKind::RbacBound => Arc::new(RbacBound::new(Arc::clone(store) as Arc<dyn RbacLister>)),
        PredicateKind::SelectorIssuerRef => Arc::new(SelectorIssuerRef),
        PredicateKind::SelectorNamespace => Arc::new(SelectorNamespace::new(
            Arc::clone(store) as Arc<dyn NamespaceGetter>,
        )),
    }
}

/// Builds the canonical pipeline: `Ready`, `RbacBound`, `SelectorIssuerRef`,
/// `SelectorNamespace`.
#[must_use]
pub fn default_pipeline<S>(store: &Arc<S>) -> Vec<Arc<dyn Predicate>>
where
    S: RbacLister + NamespaceGetter + 'static,
{
    PredicateKind::DEFAULT_PIPELINE
        .into_iter()
        .map(|kind| for_kind(kind, store))
        .collect()
}
