//! Conformance battery for [`fannypack::Store`] implementations.
//!
//! The battery depends only on the store contract, so the same scenarios
//! prove ordering, boundary, clear and copy semantics for every backend.
//! Scenarios report failures as values; a failing scenario never stops the
//! rest of the run.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fannypack::MemoryStore;
//!
//! #[tokio::test]
//! async fn memory_store_conforms() {
//!     fannypack_conformance::run(Arc::new(MemoryStore::new()))
//!         .await
//!         .assert_passed();
//! }
//! ```
//!
//! Harnesses other than the built-in [`SequentialRunner`] plug in by
//! implementing [`TestRunner`] and calling [`run_with`].

mod assert;
mod error;
mod runner;
mod scenarios;

use std::sync::Arc;

use fannypack::Store;

pub use assert::assert_yields;
pub use error::{ConformanceError, Result};
pub use runner::{Outcome, Report, SequentialRunner, TestFn, TestRunner, test_fn};
pub use scenarios::{Siblings, register, register_isolation};

/// Runs the battery against `store` with a [`SequentialRunner`].
pub async fn run(store: Arc<dyn Store>) -> Report {
    run_with(store, &mut SequentialRunner::new()).await
}

/// Registers the battery with `runner` and runs it.
pub async fn run_with(store: Arc<dyn Store>, runner: &mut dyn TestRunner) -> Report {
    register(runner, store);
    runner.run().await
}

/// Runs the battery against `siblings.primary`, followed by the namespace
/// isolation scenarios.
pub async fn run_isolated(siblings: Siblings) -> Report {
    let mut runner = SequentialRunner::new();
    register(&mut runner, siblings.primary.clone());
    register_isolation(&mut runner, siblings);
    runner.run().await
}
