// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution engines report test lifecycles to a [`ResultSink`].
//!
//! Any engine can be plugged in by implementing [`ExecutionEngine`]. [`TestSuite`] is a
//! minimal in-process engine that runs closures in declaration order.

use crate::{
    identity::{TestClass, TestIdentity},
    ledger::ResultSink,
};
use debug_ignore::DebugIgnore;
use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};
use thiserror::Error;
use tracing::debug;

/// Runs tests and reports each one's lifecycle to a sink.
pub trait ExecutionEngine {
    /// Runs all tests, calling the sink's hooks for each.
    fn run(&mut self, sink: &mut dyn ResultSink);
}

impl<F> ExecutionEngine for F
where
    F: FnMut(&mut dyn ResultSink),
{
    fn run(&mut self, sink: &mut dyn ResultSink) {
        self(sink)
    }
}

/// An assertion failure returned by a test body.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct TestFailure {
    message: String,
}

impl TestFailure {
    /// Creates a new `TestFailure` with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

type TestBody = Box<dyn FnMut() -> Result<(), TestFailure>>;

/// An ordered list of test classes, each with an ordered list of test closures.
///
/// A body returning `Ok` passes, one returning `Err` fails with the error's message as its
/// trace, and one that panics errors with the panic message as its trace.
#[derive(Debug, Default)]
pub struct TestSuite {
    classes: Vec<SuiteClass>,
}

impl TestSuite {
    /// Creates a new, empty suite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class and returns it so tests can be added to it.
    pub fn add_class(&mut self, class: TestClass) -> &mut SuiteClass {
        self.classes.push(SuiteClass {
            class: Arc::new(class),
            tests: Vec::new(),
        });
        let last = self.classes.len() - 1;
        &mut self.classes[last]
    }

    /// Returns the number of tests in the suite.
    pub fn test_count(&self) -> usize {
        self.classes.iter().map(|class| class.tests.len()).sum()
    }
}

/// One class in a [`TestSuite`].
#[derive(Debug)]
pub struct SuiteClass {
    class: Arc<TestClass>,
    tests: Vec<SuiteTest>,
}

#[derive(Debug)]
struct SuiteTest {
    identity: TestIdentity,
    body: DebugIgnore<TestBody>,
}

impl SuiteClass {
    /// Adds a test.
    pub fn add_test(
        &mut self,
        name: impl Into<String>,
        body: impl FnMut() -> Result<(), TestFailure> + 'static,
    ) -> &mut Self {
        let identity = TestIdentity::new(self.class.clone(), name);
        self.push(identity, body)
    }

    /// Adds a test with a description. The first line is shown next to the name.
    pub fn add_test_with_description(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        body: impl FnMut() -> Result<(), TestFailure> + 'static,
    ) -> &mut Self {
        let identity = TestIdentity::new(self.class.clone(), name).with_description(description);
        self.push(identity, body)
    }

    fn push(
        &mut self,
        identity: TestIdentity,
        body: impl FnMut() -> Result<(), TestFailure> + 'static,
    ) -> &mut Self {
        self.tests.push(SuiteTest {
            identity,
            body: DebugIgnore(Box::new(body)),
        });
        self
    }
}

impl ExecutionEngine for TestSuite {
    fn run(&mut self, sink: &mut dyn ResultSink) {
        for class in &mut self.classes {
            for test in &mut class.tests {
                let identity = &test.identity;
                sink.on_start(identity);
                match catch_unwind(AssertUnwindSafe(&mut *test.body)) {
                    Ok(Ok(())) => sink.on_success(identity),
                    Ok(Err(failure)) => sink.on_failure(identity, failure.message()),
                    Err(payload) => {
                        debug!("{identity} panicked");
                        sink.on_error(identity, &panic_message(&*payload));
                    }
                }
                sink.on_finalize(identity);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "test panicked with a non-string payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records hook calls as strings.
    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl ResultSink for Recorder {
        fn on_start(&mut self, test: &TestIdentity) {
            self.0.push(format!("start {}", test.name()));
        }

        fn on_success(&mut self, test: &TestIdentity) {
            self.0.push(format!("success {}", test.name()));
        }

        fn on_failure(&mut self, test: &TestIdentity, trace: &str) {
            self.0.push(format!("failure {}: {trace}", test.name()));
        }

        fn on_error(&mut self, test: &TestIdentity, trace: &str) {
            self.0.push(format!("error {}: {trace}", test.name()));
        }

        fn on_finalize(&mut self, test: &TestIdentity) {
            self.0.push(format!("finalize {}", test.name()));
        }
    }

    #[test]
    fn runs_in_declaration_order() {
        let mut suite = TestSuite::new();
        suite
            .add_class(TestClass::new("X"))
            .add_test("passes", || Ok(()))
            .add_test("fails", || Err(TestFailure::new("1 != 2")));
        suite
            .add_class(TestClass::new("Y"))
            .add_test("panics", || panic!("boom"));
        assert_eq!(suite.test_count(), 3);

        let mut recorder = Recorder::default();
        suite.run(&mut recorder);
        assert_eq!(
            recorder.0,
            vec![
                "start passes",
                "success passes",
                "finalize passes",
                "start fails",
                "failure fails: 1 != 2",
                "finalize fails",
                "start panics",
                "error panics: boom",
                "finalize panics",
            ]
        );
    }

    #[test]
    fn formatted_panic_message() {
        let mut suite = TestSuite::new();
        suite
            .add_class(TestClass::new("X"))
            .add_test("index", || panic!("index {} out of bounds", 4));

        let mut recorder = Recorder::default();
        suite.run(&mut recorder);
        assert_eq!(recorder.0[1], "error index: index 4 out of bounds");
    }

    #[test]
    fn closures_are_engines() {
        let class = Arc::new(TestClass::new("adapter::Tests"));
        let test = TestIdentity::new(class, "external");
        let mut engine = |sink: &mut dyn ResultSink| {
            sink.on_start(&test);
            sink.on_success(&test);
            sink.on_finalize(&test);
        };

        let mut recorder = Recorder::default();
        engine.run(&mut recorder);
        assert_eq!(
            recorder.0,
            vec!["start external", "success external", "finalize external"]
        );
    }
}
