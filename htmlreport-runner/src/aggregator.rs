// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Groups ledger records by owning class.

use crate::{
    identity::TestClass,
    ledger::{Outcome, RunLedger, TestRecord},
};
use indexmap::IndexMap;
use std::{sync::Arc, time::Duration};

/// The records of one class, with per-class totals.
#[derive(Clone, Debug)]
pub struct ClassGroup<'a> {
    class: &'a Arc<TestClass>,
    records: Vec<&'a TestRecord>,
    passed: usize,
    failed: usize,
    errored: usize,
    time: Duration,
}

impl<'a> ClassGroup<'a> {
    fn new(class: &'a Arc<TestClass>) -> Self {
        Self {
            class,
            records: Vec::new(),
            passed: 0,
            failed: 0,
            errored: 0,
            time: Duration::ZERO,
        }
    }

    fn push(&mut self, record: &'a TestRecord) {
        match record.outcome() {
            Outcome::Passed => self.passed += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Errored => self.errored += 1,
        }
        self.time += record.duration();
        self.records.push(record);
    }

    /// Returns the class this group belongs to.
    pub fn class(&self) -> &'a TestClass {
        self.class
    }

    /// Returns the records of this class, in completion order.
    pub fn records(&self) -> &[&'a TestRecord] {
        &self.records
    }

    /// Returns the number of passed tests.
    pub fn passed(&self) -> usize {
        self.passed
    }

    /// Returns the number of failed tests.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Returns the number of errored tests.
    pub fn errored(&self) -> usize {
        self.errored
    }

    /// Returns the number of tests in this group.
    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// Returns the summed durations of this group's records.
    pub fn time(&self) -> Duration {
        self.time
    }

    /// Returns the summed durations in seconds, rounded to two decimals.
    pub fn total_seconds(&self) -> f64 {
        round_to_hundredths(self.time.as_secs_f64())
    }
}

/// Totals across an entire run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunTotals {
    /// The number of passed tests.
    pub passed: usize,

    /// The number of failed tests.
    pub failed: usize,

    /// The number of errored tests.
    pub errored: usize,
}

impl RunTotals {
    /// Returns the number of completed tests.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.errored
    }
}

/// Partitions the ledger's records by owning class.
///
/// Classes appear in the order their first record completed, and records keep their ledger
/// order within a class. Classes are matched by name.
pub fn group(ledger: &RunLedger) -> Vec<ClassGroup<'_>> {
    let mut groups: IndexMap<&str, ClassGroup<'_>> = IndexMap::new();
    for record in ledger.records() {
        let class = record.identity().class();
        groups
            .entry(class.name())
            .or_insert_with(|| ClassGroup::new(class))
            .push(record);
    }
    groups.into_values().collect()
}

/// Sums the per-class counts of `groups`.
pub fn totals(groups: &[ClassGroup<'_>]) -> RunTotals {
    groups.iter().fold(RunTotals::default(), |acc, group| RunTotals {
        passed: acc.passed + group.passed,
        failed: acc.failed + group.failed,
        errored: acc.errored + group.errored,
    })
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
