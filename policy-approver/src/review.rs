//! Review manager: predicate pipeline plus evaluator aggregation.

use std::fmt::{self, Write as _};
use std::future::Future;
use std::sync::Arc;

use policy_config::ReviewConfig;
use policy_primitives::{CertificateRequest, CertificateRequestPolicy};
use policy_store::{NamespaceGetter, PolicyLister, RbacLister, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, field, info, info_span, warn};

use crate::evaluator::{Evaluator, EvaluatorError};
use crate::predicate::{self, Predicate, PredicateError};

const MESSAGE_NO_POLICIES: &str = "No CertificateRequestPolicies exist";
const MESSAGE_NONE_APPLICABLE: &str = "No CertificateRequestPolicies bound or applicable";

/// Final verdict of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewResult {
    /// A policy approved the request.
    Approved,
    /// Every applicable policy was denied by an evaluator.
    Denied,
    /// No policy exists or none applies to the request.
    Unprocessed,
}

impl fmt::Display for ReviewResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Unprocessed => "unprocessed",
        };
        f.write_str(label)
    }
}

/// Verdict and explanation returned by [`ReviewManager::review`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResponse {
    result: ReviewResult,
    message: String,
}

impl ReviewResponse {
    /// Approval by the named policy.
    #[must_use]
    pub fn approved(policy: &str) -> Self {
        Self {
            result: ReviewResult::Approved,
            message: format!("Approved by CertificateRequestPolicy: {policy:?}"),
        }
    }

    /// Denial with a pre-rendered explanation.
    #[must_use]
    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            result: ReviewResult::Denied,
            message: message.into(),
        }
    }

    /// No decision was reached.
    #[must_use]
    pub fn unprocessed(message: impl Into<String>) -> Self {
        Self {
            result: ReviewResult::Unprocessed,
            message: message.into(),
        }
    }

    /// Returns the verdict.
    #[must_use]
    pub const fn result(&self) -> ReviewResult {
        self.result
    }

    /// Returns the explanation.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors aborting a review. No verdict is produced when one is returned.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Listing policies failed.
    #[error("failed to list certificate request policies")]
    ListPolicies(#[source] StoreError),
    /// A predicate failed.
    #[error("predicate `{predicate}` failed")]
    Predicate {
        /// Name of the failing predicate.
        predicate: String,
        /// Underlying failure.
        #[source]
        source: PredicateError,
    },
    /// An evaluator failed.
    #[error("evaluator failed on policy {policy:?}")]
    Evaluator {
        /// Policy under evaluation.
        policy: String,
        /// Underlying failure.
        #[source]
        source: EvaluatorError,
    },
    /// The review was cancelled before a verdict was reached.
    #[error("review cancelled")]
    Cancelled,
    /// The manager was built without predicates or evaluators.
    #[error("invalid review pipeline: {0}")]
    InvalidPipeline(&'static str),
}

type Outcome<T> = Result<T, ReviewError>;

/// Decides whether certificate requests are approved by some policy.
///
/// The manager holds no mutable state and can be shared behind an [`Arc`]
/// across concurrent reviews.
#[derive(Clone)]
pub struct ReviewManager {
    lister: Arc<dyn PolicyLister>,
    predicates: Vec<Arc<dyn Predicate>>,
    evaluators: Vec<Arc<dyn Evaluator>>,
}

impl fmt::Debug for ReviewManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let predicates: Vec<_> = self.predicates.iter().map(|p| p.name()).collect();
        f.debug_struct("ReviewManager")
            .field("predicates", &predicates)
            .field("evaluators", &self.evaluators.len())
            .finish_non_exhaustive()
    }
}

impl ReviewManager {
    /// Starts a builder listing policies from `lister` with no predicates.
    #[must_use]
    pub fn builder(lister: Arc<dyn PolicyLister>) -> ReviewManagerBuilder {
        ReviewManagerBuilder {
            lister,
            predicates: Vec::new(),
            evaluators: Vec::new(),
        }
    }

    /// Starts a builder reading every object from `store`, preloaded with the
    /// canonical predicate pipeline.
    #[must_use]
    pub fn for_store<S>(store: Arc<S>) -> ReviewManagerBuilder
    where
        S: PolicyLister + RbacLister + NamespaceGetter + 'static,
    {
        let predicates = predicate::default_pipeline(&store);
        ReviewManagerBuilder {
            lister: store,
            predicates,
            evaluators: Vec::new(),
        }
    }

    /// Starts a builder reading every object from `store`, with the predicate
    /// pipeline listed in `config`.
    #[must_use]
    pub fn from_config<S>(config: &ReviewConfig, store: Arc<S>) -> ReviewManagerBuilder
    where
        S: PolicyLister + RbacLister + NamespaceGetter + 'static,
    {
        let predicates = config
            .predicates
            .iter()
            .map(|kind| predicate::for_kind(*kind, &store))
            .collect();
        ReviewManagerBuilder {
            lister: store,
            predicates,
            evaluators: Vec::new(),
        }
    }

    /// Returns the predicate names in pipeline order.
    #[must_use]
    pub fn predicate_names(&self) -> Vec<&str> {
        self.predicates.iter().map(|p| p.name()).collect()
    }

    /// Reviews `request` against every known policy.
    ///
    /// # Errors
    ///
    /// Returns a [`ReviewError`] when listing policies, a predicate or an
    /// evaluator fails.
    pub async fn review(&self, request: &CertificateRequest) -> Outcome<ReviewResponse> {
        self.review_with_cancellation(&CancellationToken::new(), request)
            .await
    }

    /// Reviews `request`, abandoning the review as soon as `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Cancelled`] on cancellation, otherwise as
    /// [`ReviewManager::review`].
    pub async fn review_with_cancellation(
        &self,
        cancel: &CancellationToken,
        request: &CertificateRequest,
    ) -> Outcome<ReviewResponse> {
        let span = info_span!(
            "review",
            request = request.name(),
            namespace = request.namespace(),
            user = request.username(),
            uid = field::Empty,
        );
        if let Some(uid) = request.uid() {
            span.record("uid", field::display(uid));
        }

        async {
            let response = self.run(cancel, request).await?;
            info!(result = %response.result(), message = response.message(), "review complete");
            Ok(response)
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        request: &CertificateRequest,
    ) -> Outcome<ReviewResponse> {
        let mut policies = until_cancelled(cancel, self.lister.list_policies())
            .await?
            .map_err(|err| {
                warn!(error = %err, "listing policies failed");
                ReviewError::ListPolicies(err)
            })?;

        if policies.is_empty() {
            return Ok(ReviewResponse::unprocessed(MESSAGE_NO_POLICIES));
        }

        for predicate in &self.predicates {
            let before = policies.len();
            policies = until_cancelled(cancel, predicate.filter(request, policies))
                .await?
                .map_err(|source| {
                    if let PredicateError::Store(err) = &source {
                        warn!(predicate = predicate.name(), error = %err, "object store lookup failed");
                    }
                    ReviewError::Predicate {
                        predicate: predicate.name().to_owned(),
                        source,
                    }
                })?;
            debug!(predicate = predicate.name(), before, after = policies.len(), "predicate applied");
        }

        if policies.is_empty() {
            return Ok(ReviewResponse::unprocessed(MESSAGE_NONE_APPLICABLE));
        }

        self.evaluate(cancel, request, &policies).await
    }

    async fn evaluate(
        &self,
        cancel: &CancellationToken,
        request: &CertificateRequest,
        policies: &[CertificateRequestPolicy],
    ) -> Outcome<ReviewResponse> {
        let mut denials = Vec::with_capacity(policies.len());

        'policies: for policy in policies {
            for evaluator in &self.evaluators {
                let response = until_cancelled(cancel, evaluator.evaluate(policy, request))
                    .await?
                    .map_err(|source| ReviewError::Evaluator {
                        policy: policy.name().to_owned(),
                        source,
                    })?;

                if response.is_denied() {
                    debug!(policy = policy.name(), message = response.message(), "policy denied");
                    denials.push((policy.name(), response.message().to_owned()));
                    continue 'policies;
                }
            }

            return Ok(ReviewResponse::approved(policy.name()));
        }

        Ok(ReviewResponse::denied(denial_message(&denials)))
    }
}

fn denial_message(denials: &[(&str, String)]) -> String {
    let mut message = String::from("No policy approved this request:");
    for (policy, reason) in denials {
        let _ = write!(message, " [{policy}: {reason}]");
    }
    message
}

async fn until_cancelled<F>(cancel: &CancellationToken, fut: F) -> Outcome<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ReviewError::Cancelled),
        out = fut => Ok(out),
    }
}

/// Assembles a [`ReviewManager`].
pub struct ReviewManagerBuilder {
    lister: Arc<dyn PolicyLister>,
    predicates: Vec<Arc<dyn Predicate>>,
    evaluators: Vec<Arc<dyn Evaluator>>,
}

impl ReviewManagerBuilder {
    /// Appends a predicate to the pipeline.
    #[must_use]
    pub fn predicate(mut self, predicate: Arc<dyn Predicate>) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Appends an evaluator; evaluators run in registration order.
    #[must_use]
    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluators.push(evaluator);
        self
    }

    /// Finalises the manager.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::InvalidPipeline`] when no predicate or no
    /// evaluator has been registered.
    pub fn build(self) -> Outcome<ReviewManager> {
        if self.predicates.is_empty() {
            return Err(ReviewError::InvalidPipeline("at least one predicate is required"));
        }
        if self.evaluators.is_empty() {
            return Err(ReviewError::InvalidPipeline("at least one evaluator is required"));
        }
        Ok(ReviewManager {
            lister: self.lister,
            predicates: self.predicates,
            evaluators: self.evaluators,
        })
    }
}

impl fmt::Debug for ReviewManagerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewManagerBuilder")
            .field("predicates", &self.predicates.len())
            .field("evaluators", &self.evaluators.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use policy_primitives::{ClusterRole, ClusterRoleBinding, IssuerRef, Role, RoleBinding};
    use policy_store::{InMemoryStore, StoreResult};
    use tokio::sync::Notify;

    use super::*;
    use crate::evaluator::{EvaluationResponse, EvaluatorResult, FnEvaluator};
    use crate::predicate::{PredicateResult, RbacBound};

    /// Lists fixed policies.
    struct Fixed(Vec<CertificateRequestPolicy>);

    #[async_trait]
    impl PolicyLister for Fixed {
        async fn list_policies(&self) -> StoreResult<Vec<CertificateRequestPolicy>> {
            Ok(self.0.clone())
        }
    }

    /// Passes everything through, counting calls.
    #[derive(Default)]
    struct CountingPredicate {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Predicate for CountingPredicate {
        fn name(&self) -> &str {
            "counting"
        }

        async fn filter(
            &self,
            _request: &CertificateRequest,
            policies: Vec<CertificateRequestPolicy>,
        ) -> PredicateResult<Vec<CertificateRequestPolicy>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(policies)
        }
    }

    /// Drops every policy.
    struct DropAll;

    #[async_trait]
    impl Predicate for DropAll {
        fn name(&self) -> &str {
            "drop-all"
        }

        async fn filter(
            &self,
            _request: &CertificateRequest,
            _policies: Vec<CertificateRequestPolicy>,
        ) -> PredicateResult<Vec<CertificateRequestPolicy>> {
            Ok(Vec::new())
        }
    }

    /// Denies listed policies with `reason-<name>`, counting calls.
    struct DenyListed {
        denied: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl DenyListed {
        fn new(denied: &[&'static str]) -> Self {
            Self {
                denied: denied.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Evaluator for DenyListed {
        async fn evaluate(
            &self,
            policy: &CertificateRequestPolicy,
            _request: &CertificateRequest,
        ) -> EvaluatorResult<EvaluationResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.denied.iter().any(|name| *name == policy.name()) {
                Ok(EvaluationResponse::denied(format!("reason-{}", policy.name())))
            } else {
                Ok(EvaluationResponse::not_denied(""))
            }
        }
    }

    fn policies(names: &[&str]) -> Vec<CertificateRequestPolicy> {
        names
            .iter()
            .map(|name| CertificateRequestPolicy::new(*name).unwrap())
            .collect()
    }

    fn request() -> CertificateRequest {
        CertificateRequest::new("req", "ns", "alice", IssuerRef::new("ca")).unwrap()
    }

    fn manager(
        names: &[&str],
        predicate: Arc<dyn Predicate>,
        evaluator: Arc<dyn Evaluator>,
    ) -> ReviewManager {
        ReviewManager::builder(Arc::new(Fixed(policies(names))))
            .predicate(predicate)
            .evaluator(evaluator)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn no_policies_is_unprocessed_without_running_anything() {
        let predicate = Arc::new(CountingPredicate::default());
        let evaluator = Arc::new(DenyListed::new(&[]));
        let manager = manager(&[], predicate.clone(), evaluator.clone());

        let response = manager.review(&request()).await.unwrap();
        assert_eq!(response.result(), ReviewResult::Unprocessed);
        assert_eq!(response.message(), "No CertificateRequestPolicies exist");
        assert_eq!(predicate.calls.load(Ordering::SeqCst), 0);
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_survivors_is_unprocessed_without_evaluation() {
        let evaluator = Arc::new(DenyListed::new(&[]));
        let manager = manager(&["a"], Arc::new(DropAll), evaluator.clone());

        let response = manager.review(&request()).await.unwrap();
        assert_eq!(response.result(), ReviewResult::Unprocessed);
        assert_eq!(response.message(), "No CertificateRequestPolicies bound or applicable");
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn first_clearing_policy_wins() {
        let evaluator = Arc::new(DenyListed::new(&["a"]));
        let manager = manager(
            &["a", "b", "c"],
            Arc::new(CountingPredicate::default()),
            evaluator.clone(),
        );

        let response = manager.review(&request()).await.unwrap();
        assert_eq!(response.result(), ReviewResult::Approved);
        assert_eq!(response.message(), r#"Approved by CertificateRequestPolicy: "b""#);
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn all_denied_lists_every_policy() {
        let manager = manager(
            &["a", "b"],
            Arc::new(CountingPredicate::default()),
            Arc::new(DenyListed::new(&["a", "b"])),
        );

        let response = manager.review(&request()).await.unwrap();
        assert_eq!(response.result(), ReviewResult::Denied);
        assert_eq!(
            response.message(),
            "No policy approved this request: [a: reason-a] [b: reason-b]"
        );
    }

    #[tokio::test]
    async fn denial_short_circuits_remaining_evaluators() {
        let first = Arc::new(DenyListed::new(&["a"]));
        let second = Arc::new(DenyListed::new(&["a"]));
        let manager = ReviewManager::builder(Arc::new(Fixed(policies(&["a"]))))
            .predicate(Arc::new(CountingPredicate::default()))
            .evaluator(first.clone())
            .evaluator(second.clone())
            .build()
            .unwrap();

        let response = manager.review(&request()).await.unwrap();
        assert_eq!(response.message(), "No policy approved this request: [a: reason-a]");
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn evaluator_errors_abort_the_review() {
        let failing = Arc::new(FnEvaluator::new("failing", |_, _| {
            Err(EvaluatorError::backend("offline"))
        }));
        let manager = manager(&["a"], Arc::new(CountingPredicate::default()), failing);

        let err = manager.review(&request()).await.unwrap_err();
        assert!(matches!(err, ReviewError::Evaluator { ref policy, .. } if policy == "a"));
    }

    #[tokio::test]
    async fn predicate_errors_abort_the_review() {
        struct Failing;

        #[async_trait]
        impl Predicate for Failing {
            fn name(&self) -> &str {
                "failing"
            }

            async fn filter(
                &self,
                _request: &CertificateRequest,
                _policies: Vec<CertificateRequestPolicy>,
            ) -> PredicateResult<Vec<CertificateRequestPolicy>> {
                Err(PredicateError::failed("boom"))
            }
        }

        let manager = manager(&["a"], Arc::new(Failing), Arc::new(DenyListed::new(&[])));
        let err = manager.review(&request()).await.unwrap_err();
        assert!(matches!(err, ReviewError::Predicate { ref predicate, .. } if predicate == "failing"));
    }

    #[tokio::test]
    async fn cancelled_review_returns_no_verdict() {
        let manager = manager(
            &["a"],
            Arc::new(CountingPredicate::default()),
            Arc::new(DenyListed::new(&[])),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = manager
            .review_with_cancellation(&cancel, &request())
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::Cancelled));
    }

    /// RBAC source whose cluster binding lookup never completes.
    struct StalledRbac {
        started: Arc<Notify>,
    }

    #[async_trait]
    impl RbacLister for StalledRbac {
        async fn list_cluster_role_bindings(&self) -> StoreResult<Vec<ClusterRoleBinding>> {
            self.started.notify_one();
            std::future::pending().await
        }

        async fn get_cluster_role(&self, _name: &str) -> StoreResult<Option<ClusterRole>> {
            Ok(None)
        }

        async fn list_role_bindings(&self, _namespace: &str) -> StoreResult<Vec<RoleBinding>> {
            Ok(Vec::new())
        }

        async fn get_role(&self, _namespace: &str, _name: &str) -> StoreResult<Option<Role>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn cancellation_aborts_lookup_in_flight() {
        let started = Arc::new(Notify::new());
        let rbac = Arc::new(StalledRbac {
            started: Arc::clone(&started),
        });
        let evaluator = Arc::new(DenyListed::new(&[]));
        let manager = manager(&["a"], Arc::new(RbacBound::new(rbac)), evaluator.clone());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            started.notified().await;
            trigger.cancel();
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            manager.review_with_cancellation(&cancel, &request()),
        )
        .await
        .expect("review should stop once cancelled");
        assert!(matches!(outcome, Err(ReviewError::Cancelled)));
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 0);
    }

    /// Lister whose backend is down.
    struct Unreachable;

    #[async_trait]
    impl PolicyLister for Unreachable {
        async fn list_policies(&self) -> StoreResult<Vec<CertificateRequestPolicy>> {
            Err(StoreError::backend("etcd unavailable"))
        }
    }

    /// Predicate whose store lookup fails.
    struct StoreFailure;

    #[async_trait]
    impl Predicate for StoreFailure {
        fn name(&self) -> &str {
            "store-failure"
        }

        async fn filter(
            &self,
            _request: &CertificateRequest,
            _policies: Vec<CertificateRequestPolicy>,
        ) -> PredicateResult<Vec<CertificateRequestPolicy>> {
            Err(StoreError::backend("namespace cache cold").into())
        }
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn store_failures_are_logged_at_warn() {
        let logs = Captured::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let listing = ReviewManager::builder(Arc::new(Unreachable))
            .predicate(Arc::new(CountingPredicate::default()))
            .evaluator(Arc::new(DenyListed::new(&[])))
            .build()
            .unwrap();
        let err = listing.review(&request()).await.unwrap_err();
        assert!(matches!(err, ReviewError::ListPolicies(_)));

        let filtering = manager(&["a"], Arc::new(StoreFailure), Arc::new(DenyListed::new(&[])));
        let err = filtering.review(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            ReviewError::Predicate { source: PredicateError::Store(_), .. }
        ));

        let text = logs.text();
        assert!(text.contains("WARN"), "{text}");
        assert!(text.contains("etcd unavailable"), "{text}");
        assert!(text.contains("namespace cache cold"), "{text}");
        assert!(text.contains("store-failure"), "{text}");
    }

    #[test]
    fn builder_rejects_incomplete_pipelines() {
        let lister: Arc<dyn PolicyLister> = Arc::new(Fixed(Vec::new()));
        let err = ReviewManager::builder(lister.clone())
            .evaluator(Arc::new(DenyListed::new(&[])))
            .build()
            .unwrap_err();
        assert!(matches!(err, ReviewError::InvalidPipeline(_)));

        let err = ReviewManager::builder(lister)
            .predicate(Arc::new(DropAll))
            .build()
            .unwrap_err();
        assert!(matches!(err, ReviewError::InvalidPipeline(_)));
    }

    #[test]
    fn from_config_follows_listed_order() {
        let config = ReviewConfig {
            predicates: vec![
                policy_config::PredicateKind::SelectorNamespace,
                policy_config::PredicateKind::Ready,
            ],
        };
        let manager = ReviewManager::from_config(&config, Arc::new(InMemoryStore::new()))
            .evaluator(Arc::new(DenyListed::new(&[])))
            .build()
            .unwrap();
        assert_eq!(manager.predicate_names(), ["selector-namespace", "ready"]);
    }

    #[test]
    fn verdicts_serialise_snake_case() {
        let json = serde_json::to_value(ReviewResponse::unprocessed("x")).unwrap();
        assert_eq!(json["result"], "unprocessed");
    }
}
