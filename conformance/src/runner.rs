//! Pluggable test execution.
//!
//! Scenarios are registered with a [`TestRunner`], so the same battery can
//! run under any harness that can register a named test, register a hook to
//! run after each test, and run everything registered.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::Result;

/// A registered test body or hook. Each call starts a fresh run.
pub type TestFn = Box<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Wraps an async closure as a [`TestFn`].
pub fn test_fn<F, Fut>(f: F) -> TestFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Box::new(move || Box::pin(f()))
}

/// The capability a harness provides to the conformance battery.
#[async_trait]
pub trait TestRunner: Send {
    fn add_test(&mut self, name: &str, test: TestFn);

    fn after_each(&mut self, name: &str, hook: TestFn);

    /// Runs every registered test and returns the outcomes.
    async fn run(&mut self) -> Report;
}

/// Outcome of one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub name: String,
    /// `None` when the test and every after-each hook succeeded.
    pub failure: Option<String>,
}

/// Outcomes of a run, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub outcomes: Vec<Outcome>,
}

impl Report {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.failure.is_none()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.failure.is_some())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Panics listing every failed test. Meant for use inside `#[test]`s.
    pub fn assert_passed(&self) {
        let failures: Vec<String> = self
            .failures()
            .map(|o| format!("{}: {}", o.name, o.failure.as_deref().unwrap_or_default()))
            .collect();
        assert!(
            failures.is_empty(),
            "{} of {} conformance tests failed:\n{}",
            failures.len(),
            self.outcomes.len(),
            failures.join("\n")
        );
    }
}

/// Runs tests one at a time in registration order, running every
/// after-each hook, in registration order, after each test.
#[derive(Default)]
pub struct SequentialRunner {
    tests: Vec<(String, TestFn)>,
    hooks: Vec<(String, TestFn)>,
}

impl SequentialRunner {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Runs one test or hook, reporting a panic as a failure.
async fn run_guarded(test: &TestFn) -> std::result::Result<(), String> {
    match AssertUnwindSafe(test()).catch_unwind().await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

#[async_trait]
impl TestRunner for SequentialRunner {
    fn add_test(&mut self, name: &str, test: TestFn) {
        self.tests.push((name.to_string(), test));
    }

    fn after_each(&mut self, name: &str, hook: TestFn) {
        self.hooks.push((name.to_string(), hook));
    }

    async fn run(&mut self) -> Report {
        let mut report = Report::default();
        for (name, test) in &self.tests {
            let mut failure = run_guarded(test).await.err();
            for (hook_name, hook) in &self.hooks {
                if let Err(err) = run_guarded(hook).await {
                    let message = format!("after each hook {:?} failed: {}", hook_name, err);
                    failure = Some(match failure {
                        Some(previous) => format!("{}; {}", previous, message),
                        None => message,
                    });
                }
            }
            match &failure {
                None => tracing::info!(test = %name, "passed"),
                Some(reason) => tracing::warn!(test = %name, %reason, "failed"),
            }
            report.outcomes.push(Outcome {
                name: name.clone(),
                failure,
            });
        }
        report
    }
}
