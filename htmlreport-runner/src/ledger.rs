// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The result sink that execution engines report to, and the ledger it builds.

use crate::{
    capture::{CaptureStrategy, OutputCapture},
    identity::TestIdentity,
    progress::ProgressWriter,
    time::{StopwatchStart, stopwatch},
};
use chrono::{DateTime, Local};
use quick_htmlreport::{CaseStatus, PassRate};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Hooks an execution engine calls while running tests.
///
/// For every test, the engine calls [`on_start`](Self::on_start), then at most one of
/// [`on_success`](Self::on_success), [`on_failure`](Self::on_failure) or
/// [`on_error`](Self::on_error), then exactly one [`on_finalize`](Self::on_finalize), even
/// if the test was aborted before reporting an outcome.
pub trait ResultSink {
    /// A test is about to run.
    fn on_start(&mut self, test: &TestIdentity);

    /// The test passed.
    fn on_success(&mut self, test: &TestIdentity);

    /// The test failed an assertion. `trace` describes the failure.
    fn on_failure(&mut self, test: &TestIdentity, trace: &str);

    /// The test hit an unexpected error. `trace` describes the error.
    fn on_error(&mut self, test: &TestIdentity, trace: &str);

    /// The test is done. Always called once per test.
    fn on_finalize(&mut self, test: &TestIdentity);
}

/// The outcome of a completed test.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Outcome {
    /// The test passed.
    Passed,

    /// The test failed an assertion.
    Failed,

    /// An unexpected error occurred in the test machinery.
    Errored,
}

impl Outcome {
    /// Returns the status shown for this outcome in the report.
    pub fn case_status(self) -> CaseStatus {
        match self {
            Outcome::Passed => CaseStatus::Passed,
            Outcome::Failed => CaseStatus::Failed,
            Outcome::Errored => CaseStatus::Errored,
        }
    }
}

/// One completed test.
#[derive(Clone, Debug)]
pub struct TestRecord {
    outcome: Outcome,
    identity: TestIdentity,
    captured_output: Arc<str>,
    failure_trace: String,
    start_time: DateTime<Local>,
    duration: Duration,
}

impl TestRecord {
    /// Returns the outcome.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Returns the identity of the test.
    pub fn identity(&self) -> &TestIdentity {
        &self.identity
    }

    /// Returns stdout and stderr as written while the test ran, interleaved.
    pub fn captured_output(&self) -> &str {
        &self.captured_output
    }

    /// Returns the failure or error trace. Empty for passed tests.
    pub fn failure_trace(&self) -> &str {
        &self.failure_trace
    }

    /// Returns the captured output followed by the failure trace.
    pub fn combined_output(&self) -> String {
        let mut combined =
            String::with_capacity(self.captured_output.len() + self.failure_trace.len());
        combined.push_str(&self.captured_output);
        combined.push_str(&self.failure_trace);
        combined
    }

    /// Returns the time at which the test started.
    pub fn start_time(&self) -> DateTime<Local> {
        self.start_time
    }

    /// Returns how long the test took, from start until its capture ended.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// The test currently between `on_start` and the next `on_start`.
#[derive(Debug)]
struct InFlight {
    test: TestIdentity,
    stopwatch: StopwatchStart,
    duration: Option<Duration>,
}

/// Ordered record of every test outcome in a run, with running totals.
///
/// The ledger implements [`ResultSink`]. It is populated while the engine runs and becomes
/// read-only once [`finalize`](Self::finalize) is called.
#[derive(Debug)]
pub struct RunLedger {
    capture: OutputCapture,
    progress: ProgressWriter,
    in_flight: Option<InFlight>,
    records: Vec<TestRecord>,
    success_count: usize,
    failure_count: usize,
    error_count: usize,
    finalized: bool,
}

impl RunLedger {
    /// Creates a new, empty ledger that captures output with the given strategy.
    pub fn new(strategy: CaptureStrategy) -> Self {
        Self {
            capture: OutputCapture::new(strategy.into_streams()),
            progress: ProgressWriter::quiet(),
            in_flight: None,
            records: Vec::new(),
            success_count: 0,
            failure_count: 0,
            error_count: 0,
            finalized: false,
        }
    }

    /// Sets the writer for per-test progress lines.
    pub fn with_progress(mut self, progress: ProgressWriter) -> Self {
        self.progress = progress;
        self
    }

    /// Returns the records in completion order.
    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    /// Returns the number of passed tests.
    pub fn success_count(&self) -> usize {
        self.success_count
    }

    /// Returns the number of failed tests.
    pub fn failure_count(&self) -> usize {
        self.failure_count
    }

    /// Returns the number of errored tests.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Returns the number of completed tests.
    pub fn total(&self) -> usize {
        self.success_count + self.failure_count + self.error_count
    }

    /// Returns the share of passed tests. Displays as `0.00%` if no tests ran.
    pub fn pass_rate(&self) -> PassRate {
        PassRate::new(self.success_count, self.total())
    }

    /// Returns true if [`finalize`](Self::finalize) has been called.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Freezes the ledger. Later hook calls are ignored.
    ///
    /// If the engine stopped without finalizing the last test, its capture is ended here so
    /// the console is never left redirected.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        if self.capture.is_active() {
            if let Some(in_flight) = &self.in_flight {
                let test = in_flight.test.clone();
                self.complete(&test);
                debug!("{test} was never finalized, ended its capture");
            }
        }
        self.finalized = true;
        debug_assert_eq!(self.total(), self.records.len());
    }

    /// Ends the capture for `test` (idempotent) and fixes its duration on first call.
    fn complete(&mut self, test: &TestIdentity) -> (Arc<str>, DateTime<Local>, Duration) {
        let output = self.capture.end(test);
        match &mut self.in_flight {
            Some(in_flight) if &in_flight.test == test => {
                let duration = match in_flight.duration {
                    Some(duration) => duration,
                    None => {
                        let duration = in_flight.stopwatch.snapshot().duration;
                        in_flight.duration = Some(duration);
                        duration
                    }
                };
                (output, in_flight.stopwatch.start_time(), duration)
            }
            _ => {
                debug!("{test} completed without a matching start");
                (output, Local::now(), Duration::ZERO)
            }
        }
    }

    fn record(&mut self, test: &TestIdentity, outcome: Outcome, trace: &str) {
        if self.finalized {
            warn!("ignoring {outcome:?} for {test}: the ledger is already finalized");
            return;
        }

        // End the capture before building the record, so the record sees all of the output.
        let (captured_output, start_time, duration) = self.complete(test);
        match outcome {
            Outcome::Passed => self.success_count += 1,
            Outcome::Failed => self.failure_count += 1,
            Outcome::Errored => self.error_count += 1,
        }
        let record = TestRecord {
            outcome,
            identity: test.clone(),
            captured_output,
            failure_trace: trace.to_owned(),
            start_time,
            duration,
        };
        self.progress.write_record(&record);
        self.records.push(record);
    }
}

impl ResultSink for RunLedger {
    fn on_start(&mut self, test: &TestIdentity) {
        if self.finalized {
            warn!("ignoring start of {test}: the ledger is already finalized");
            return;
        }
        self.capture.begin(test);
        self.in_flight = Some(InFlight {
            test: test.clone(),
            stopwatch: stopwatch(),
            duration: None,
        });
    }

    fn on_success(&mut self, test: &TestIdentity) {
        self.record(test, Outcome::Passed, "");
    }

    fn on_failure(&mut self, test: &TestIdentity, trace: &str) {
        self.record(test, Outcome::Failed, trace);
    }

    fn on_error(&mut self, test: &TestIdentity, trace: &str) {
        self.record(test, Outcome::Errored, trace);
    }

    fn on_finalize(&mut self, test: &TestIdentity) {
        self.complete(test);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{capture::SharedConsole, identity::TestClass};
    use std::io::Write;
    use test_strategy::proptest;

    fn identity(class: &str, name: &str) -> TestIdentity {
        TestIdentity::new(Arc::new(TestClass::new(class)), name)
    }

    fn quiet_console() -> SharedConsole {
        SharedConsole::with_writers(std::io::sink(), std::io::sink())
    }

    #[test]
    fn records_outcomes_in_completion_order() {
        let console = quiet_console();
        let mut ledger = RunLedger::new(CaptureStrategy::Console(console.clone()));

        let pass = identity("A", "pass");
        ledger.on_start(&pass);
        write!(console.stdout(), "pass output").unwrap();
        ledger.on_success(&pass);
        ledger.on_finalize(&pass);

        let fail = identity("A", "fail");
        ledger.on_start(&fail);
        writeln!(console.stderr(), "about to fail").unwrap();
        ledger.on_failure(&fail, "assertion failed");
        ledger.on_finalize(&fail);

        let error = identity("B", "error");
        ledger.on_start(&error);
        ledger.on_error(&error, "panicked");
        ledger.on_finalize(&error);

        ledger.finalize();

        let records = ledger.records();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records.iter().map(|r| r.outcome()).collect::<Vec<_>>(),
            vec![Outcome::Passed, Outcome::Failed, Outcome::Errored]
        );
        assert_eq!(records[0].captured_output(), "pass output");
        assert_eq!(records[0].failure_trace(), "");
        assert_eq!(records[1].combined_output(), "about to fail\nassertion failed");
        assert_eq!(records[2].captured_output(), "");
        assert_eq!(
            (ledger.success_count(), ledger.failure_count(), ledger.error_count()),
            (1, 1, 1)
        );
        assert_eq!(ledger.pass_rate().to_string(), "33.33%");
        assert!(!console.is_redirected());
    }

    #[test]
    fn finalize_before_outcome_keeps_output() {
        let console = quiet_console();
        let mut ledger = RunLedger::new(CaptureStrategy::Console(console.clone()));

        let test = identity("A", "late-report");
        ledger.on_start(&test);
        write!(console.stdout(), "written").unwrap();
        ledger.on_finalize(&test);
        // Written after the capture ended, so it passes through instead.
        write!(console.stdout(), "not captured").unwrap();
        ledger.on_success(&test);

        assert_eq!(ledger.records()[0].captured_output(), "written");
    }

    #[test]
    fn aborted_test_produces_no_record() {
        let console = quiet_console();
        let mut ledger = RunLedger::new(CaptureStrategy::Console(console.clone()));

        let test = identity("A", "aborted");
        ledger.on_start(&test);
        ledger.on_finalize(&test);
        ledger.finalize();

        assert!(ledger.records().is_empty());
        assert_eq!(ledger.total(), 0);
        assert_eq!(ledger.pass_rate().to_string(), "0.00%");
    }

    #[test]
    fn finalize_restores_unfinished_capture() {
        let console = quiet_console();
        let mut ledger = RunLedger::new(CaptureStrategy::Console(console.clone()));

        ledger.on_start(&identity("A", "never-finalized"));
        assert!(console.is_redirected());
        ledger.finalize();
        assert!(!console.is_redirected());

        // Hooks after finalization are ignored.
        let late = identity("A", "late");
        ledger.on_start(&late);
        ledger.on_success(&late);
        assert_eq!(ledger.total(), 0);
        assert!(!console.is_redirected());
    }

    #[test]
    fn progress_lines() {
        #[derive(Clone, Default)]
        struct Buf(Arc<std::sync::Mutex<Vec<u8>>>);
        impl Write for Buf {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let buf = Buf::default();
        let mut ledger = RunLedger::new(CaptureStrategy::None).with_progress(
            ProgressWriter::new(crate::progress::Verbosity::Verbose, buf.clone()),
        );
        let test = identity("suite::A", "works");
        ledger.on_start(&test);
        ledger.on_success(&test);
        ledger.on_finalize(&test);
        let failing = identity("suite::A", "breaks");
        ledger.on_start(&failing);
        ledger.on_failure(&failing, "nope");
        ledger.on_finalize(&failing);

        let written = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "  S  works (suite::A)\n  F  breaks (suite::A)\n");
    }

    #[derive(Clone, Copy, Debug, test_strategy::Arbitrary)]
    enum Step {
        Pass,
        Fail,
        Error,
        Abort,
    }

    #[proptest(cases = 64)]
    fn counts_match_records(steps: Vec<Step>) {
        let mut ledger = RunLedger::new(CaptureStrategy::Console(quiet_console()));
        for (index, step) in steps.iter().enumerate() {
            let test = identity(if index % 2 == 0 { "Even" } else { "Odd" }, &index.to_string());
            ledger.on_start(&test);
            match step {
                Step::Pass => ledger.on_success(&test),
                Step::Fail => ledger.on_failure(&test, "failed"),
                Step::Error => ledger.on_error(&test, "errored"),
                Step::Abort => {}
            }
            ledger.on_finalize(&test);
        }
        ledger.finalize();

        let completed = steps.iter().filter(|s| !matches!(s, Step::Abort)).count();
        assert_eq!(ledger.records().len(), completed);
        assert_eq!(
            ledger.success_count() + ledger.failure_count() + ledger.error_count(),
            ledger.records().len()
        );
    }
}
