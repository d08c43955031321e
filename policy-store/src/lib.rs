//! Object store interfaces consumed by the review engine.
//!
//! The engine never owns policy, RBAC or namespace state; it reads them through
//! the traits defined here. [`InMemoryStore`] implements all of them over a
//! [`Snapshot`] and backs tests and local tooling.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod memory;
mod snapshot;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryStore, StoreStats};
pub use snapshot::Snapshot;
pub use traits::{NamespaceGetter, PolicyLister, RbacLister};
