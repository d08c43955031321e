//! Review of certificate requests against certificate request policies.
//!
//! A [`ReviewManager`] lists every policy, narrows the set through an ordered
//! pipeline of [`Predicate`]s and then asks each registered [`Evaluator`]
//! whether the request is admissible under each surviving policy. The first
//! policy that no evaluator denies approves the request.

#![warn(missing_docs, clippy::pedantic)]

mod evaluator;
pub mod matcher;
pub mod predicate;
mod review;

pub use evaluator::{
    EvaluationResponse, EvaluationResult, Evaluator, EvaluatorError, EvaluatorResult, FnEvaluator,
};
pub use predicate::{Predicate, PredicateError, PredicateResult};
pub use review::{ReviewError, ReviewManager, ReviewManagerBuilder, ReviewResponse, ReviewResult};
