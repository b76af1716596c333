// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identities of tests and the classes that own them.
//!
//! Execution engines describe each test with a [`TestIdentity`]. The report never
//! introspects tests any further than this: grouping uses the owning class's name, and
//! display uses the names and the first line of each description.

use std::{fmt, sync::Arc};

/// A named collection of tests sharing a declaring owner, used for report grouping.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestClass {
    name: String,
    description: Option<String>,
}

impl TestClass {
    /// Creates a new `TestClass` with the given qualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Sets a free-form description. Only the first line is shown in the report.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the qualified name of this class.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the full description of this class, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the first line of the description, if it is non-empty.
    pub fn summary(&self) -> Option<&str> {
        first_line(self.description.as_deref())
    }
}

/// The identity of a single test case, as supplied by the execution engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestIdentity {
    name: String,
    class: Arc<TestClass>,
    description: Option<String>,
}

impl TestIdentity {
    /// Creates a new `TestIdentity` for a test owned by `class`.
    pub fn new(class: Arc<TestClass>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class,
            description: None,
        }
    }

    /// Sets a short description. Only the first line is shown in the report.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the qualified name of the test.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning class.
    pub fn class(&self) -> &Arc<TestClass> {
        &self.class
    }

    /// Returns the full description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the first line of the description, if it is non-empty.
    pub fn summary(&self) -> Option<&str> {
        first_line(self.description.as_deref())
    }
}

impl fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.class.name)
    }
}

fn first_line(text: Option<&str>) -> Option<&str> {
    text.and_then(|text| text.lines().next())
        .map(str::trim)
        .filter(|line| !line.is_empty())
}
