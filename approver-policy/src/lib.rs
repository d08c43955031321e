//! Certificate request policy review engine facade.
//!
//! Bundles the workspace crates behind feature flags so embedders can pull in
//! only the object model, or the full review pipeline with logging setup.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export the object model for convenience.
pub use policy_primitives as primitives;

/// Object store traits and the in-memory snapshot store (enabled by `store`
/// feature).
#[cfg(feature = "store")]
pub use policy_store as store;

/// Predicates, evaluators and the review manager (enabled by `approver`
/// feature).
#[cfg(feature = "approver")]
pub use policy_approver as approver;

/// Configuration schema and loader (enabled by `config` feature).
#[cfg(feature = "config")]
pub use policy_config as config;

/// Tracing subscriber setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use policy_telemetry as telemetry;

/// Items most embedders need to run a review.
#[cfg(feature = "approver")]
pub mod prelude {
    pub use policy_approver::{
        EvaluationResponse, Evaluator, EvaluatorError, FnEvaluator, ReviewError, ReviewManager,
        ReviewResponse, ReviewResult,
    };
    pub use policy_primitives::{CertificateRequest, CertificateRequestPolicy, IssuerRef};
    pub use policy_store::{InMemoryStore, Snapshot};
}
