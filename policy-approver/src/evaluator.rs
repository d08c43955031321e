//! Contract for pluggable admission evaluators.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use policy_primitives::{CertificateRequest, CertificateRequestPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of running one evaluator against one policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationResult {
    /// The evaluator found no reason to reject the request under this policy.
    NotDenied,
    /// The evaluator rejects the request under this policy.
    Denied,
}

/// Verdict and explanation produced by an evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    result: EvaluationResult,
    #[serde(default)]
    message: String,
}

impl EvaluationResponse {
    /// Returns a response that does not deny the request.
    #[must_use]
    pub fn not_denied(message: impl Into<String>) -> Self {
        Self {
            result: EvaluationResult::NotDenied,
            message: message.into(),
        }
    }

    /// Returns a response denying the request for the given reason.
    #[must_use]
    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            result: EvaluationResult::Denied,
            message: message.into(),
        }
    }

    /// Returns the result.
    #[must_use]
    pub const fn result(&self) -> EvaluationResult {
        self.result
    }

    /// Returns true when the response denies the request.
    #[must_use]
    pub fn is_denied(&self) -> bool {
        self.result == EvaluationResult::Denied
    }

    /// Returns the explanation.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by evaluators. Any error aborts the review.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    /// The evaluator could not reach a backend it depends on.
    #[error("evaluator backend failure: {reason}")]
    Backend {
        /// Human-readable explanation for logging and operators.
        reason: String,
    },
    /// Any other failure raised by an evaluator implementation.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EvaluatorError {
    /// Convenience helper to construct backend errors.
    #[must_use]
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }
}

/// Result alias for evaluator operations.
pub type EvaluatorResult<T> = Result<T, EvaluatorError>;

/// Admission check run for each applicable policy.
///
/// Implementations must be read-only: the same inputs must yield the same
/// response.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluates `request` against the admission rules of `policy`.
    async fn evaluate(
        &self,
        policy: &CertificateRequestPolicy,
        request: &CertificateRequest,
    ) -> EvaluatorResult<EvaluationResponse>;
}

#[async_trait]
impl<E> Evaluator for Arc<E>
where
    E: Evaluator + ?Sized,
{
    async fn evaluate(
        &self,
        policy: &CertificateRequestPolicy,
        request: &CertificateRequest,
    ) -> EvaluatorResult<EvaluationResponse> {
        (**self).evaluate(policy, request).await
    }
}

type EvaluateFn = dyn Fn(&CertificateRequestPolicy, &CertificateRequest) -> EvaluatorResult<EvaluationResponse>
    + Send
    + Sync;

/// Evaluator backed by a closure.
#[derive(Clone)]
pub struct FnEvaluator {
    name: String,
    evaluate: Arc<EvaluateFn>,
}

impl FnEvaluator {
    /// Wraps `evaluate` as an evaluator identified by `name` in logs.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, evaluate: F) -> Self
    where
        F: Fn(&CertificateRequestPolicy, &CertificateRequest) -> EvaluatorResult<EvaluationResponse>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            evaluate: Arc::new(evaluate),
        }
    }

    /// Returns the evaluator name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for FnEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEvaluator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Evaluator for FnEvaluator {
    async fn evaluate(
        &self,
        policy: &CertificateRequestPolicy,
        request: &CertificateRequest,
    ) -> EvaluatorResult<EvaluationResponse> {
        (self.evaluate)(policy, request)
    }
}
