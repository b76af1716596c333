// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test runner.
//!
//! [`HtmlTestRunner`] runs an execution engine against a fresh [`RunLedger`], then renders
//! the finished ledger as an HTML report.

use crate::{
    aggregator::group,
    config::{OutputSink, ReportConfig},
    engine::ExecutionEngine,
    errors::WriteReportError,
    helpers::plural,
    ledger::RunLedger,
    progress::ProgressWriter,
    render::{RunMetadata, build_report},
    time::stopwatch,
};
use camino::Utf8Path;
use quick_htmlreport::Report;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
};
use tracing::{debug, info};

/// Runs tests through an execution engine and writes an HTML report of the results.
#[derive(Clone, Debug, Default)]
pub struct HtmlTestRunner {
    config: ReportConfig,
}

impl HtmlTestRunner {
    /// Creates a new runner with the given config.
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Returns the config.
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Runs all tests and writes the report to the configured output.
    ///
    /// An output file is created before any test runs, so an unwritable path fails fast.
    /// Test failures and errors are recorded in the returned ledger, not returned as errors.
    pub fn run(&self, engine: &mut dyn ExecutionEngine) -> Result<RunLedger, WriteReportError> {
        match self.config.output() {
            OutputSink::Stdout => {
                let (ledger, report) = self.execute(engine);
                write_report(&report, io::stdout().lock(), WriteReportError::Io)?;
                Ok(ledger)
            }
            OutputSink::File(path) => {
                let file = create_output_file(path)?;
                let (ledger, report) = self.execute(engine);
                write_report(&report, BufWriter::new(file), |error| WriteReportError::Fs {
                    file: path.clone(),
                    error,
                })?;
                debug!("wrote report to {path}");
                Ok(ledger)
            }
        }
    }

    /// Runs all tests and writes the report to `writer`, ignoring the configured output.
    pub fn run_to_writer(
        &self,
        engine: &mut dyn ExecutionEngine,
        writer: impl Write,
    ) -> Result<RunLedger, WriteReportError> {
        let (ledger, report) = self.execute(engine);
        write_report(&report, writer, WriteReportError::Io)?;
        Ok(ledger)
    }

    fn execute(&self, engine: &mut dyn ExecutionEngine) -> (RunLedger, Report) {
        let mut progress = ProgressWriter::stderr(self.config.verbosity());
        if self
            .config
            .color()
            .should_colorize(supports_color::Stream::Stderr)
        {
            progress = progress.colorize();
        }
        let mut ledger = RunLedger::new(self.config.capture().clone()).with_progress(progress);

        let stopwatch = stopwatch();
        debug!("starting test run at {}", stopwatch.start_time());
        engine.run(&mut ledger);
        ledger.finalize();
        let snapshot = stopwatch.snapshot();
        debug!("test run finished at {}", snapshot.end_time());

        let report = {
            let groups = group(&ledger);
            let meta = RunMetadata {
                title: self.config.title().to_owned(),
                description: self.config.description().to_owned(),
                tester: self.config.tester().to_owned(),
                screenshots: self.config.screenshots(),
                start_time: snapshot.start_time,
                elapsed: snapshot.duration,
            };
            info!(
                "{} {} across {} {}: {} passed, {} failed, {} errored (pass rate {}) in {:.2}s",
                ledger.total(),
                plural::tests_str(ledger.total()),
                groups.len(),
                plural::classes_str(groups.len()),
                ledger.success_count(),
                ledger.failure_count(),
                ledger.error_count(),
                ledger.pass_rate(),
                snapshot.duration.as_secs_f64(),
            );
            build_report(&ledger, &groups, &meta)
        };
        (ledger, report)
    }
}

fn create_output_file(path: &Utf8Path) -> Result<File, WriteReportError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|error| WriteReportError::Fs {
            file: parent.to_owned(),
            error,
        })?;
    }
    File::create(path).map_err(|error| WriteReportError::Fs {
        file: path.to_owned(),
        error,
    })
}

fn write_report(
    report: &Report,
    mut writer: impl Write,
    flush_error: impl FnOnce(io::Error) -> WriteReportError,
) -> Result<(), WriteReportError> {
    report
        .serialize(&mut writer)
        .map_err(WriteReportError::Serialize)?;
    writer.flush().map_err(flush_error)
}
