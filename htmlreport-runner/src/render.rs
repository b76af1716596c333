// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds the report document from a finalized ledger.

use crate::{
    aggregator::{ClassGroup, RunTotals, totals},
    ledger::{RunLedger, TestRecord},
    screenshot::ScreenshotMarker,
};
use chrono::{DateTime, Local};
use quick_htmlreport::{Attribute, CaseRow, ClassRow, PassRate, Report};
use std::time::Duration;
use swrite::{SWrite, swrite};

/// Run-level values shown in the report heading.
#[derive(Clone, Debug)]
pub struct RunMetadata {
    /// The report title.
    pub title: String,

    /// Free-form description shown under the heading.
    pub description: String,

    /// The name of the tester.
    pub tester: String,

    /// Whether to extract and show screenshot markers.
    pub screenshots: bool,

    /// When the run started.
    pub start_time: DateTime<Local>,

    /// How long the run took, end to end.
    pub elapsed: Duration,
}

/// Builds the document tree for a finalized ledger and its class groups.
pub fn build_report(ledger: &RunLedger, groups: &[ClassGroup<'_>], meta: &RunMetadata) -> Report {
    let totals = totals(groups);
    debug_assert_eq!(totals.total(), ledger.total());

    let mut report = Report::new(&meta.title);
    report
        .set_generator(concat!("htmlreport-runner ", env!("CARGO_PKG_VERSION")))
        .set_description(&meta.description)
        .set_screenshots(meta.screenshots)
        .add_attributes([
            Attribute::new("Tester", &meta.tester),
            Attribute::new(
                "Start Time",
                meta.start_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
            Attribute::new("Duration", format!("{:.2}s", meta.elapsed.as_secs_f64())),
            Attribute::new("Status", status_line(&totals)),
        ])
        .add_class_rows(groups.iter().map(|group| class_row(group, meta.screenshots)));
    report
}

fn status_line(totals: &RunTotals) -> String {
    let mut status = format!("Total {}", totals.total());
    for (label, count) in [
        ("Passed", totals.passed),
        ("Failed", totals.failed),
        ("Errored", totals.errored),
    ] {
        if count > 0 {
            swrite!(status, ", {label} {count}");
        }
    }
    swrite!(
        status,
        ", Pass rate = {}",
        PassRate::new(totals.passed, totals.total())
    );
    status
}

fn class_row(group: &ClassGroup<'_>, screenshots: bool) -> ClassRow {
    let class = group.class();
    let mut row = ClassRow::new(class.name());
    if let Some(summary) = class.summary() {
        row.set_description(summary);
    }
    row.set_time(Duration::from_secs_f64(group.total_seconds()))
        .add_case_rows(group.records().iter().map(|record| case_row(record, screenshots)));
    row
}

fn case_row(record: &TestRecord, screenshots: bool) -> CaseRow {
    let identity = record.identity();
    let mut row = CaseRow::new(identity.name(), record.outcome().case_status());
    if let Some(summary) = identity.summary() {
        row.set_description(summary);
    }
    let output = record.combined_output();
    if screenshots {
        row.set_screenshot(ScreenshotMarker::extract(&output).into());
    }
    row.set_output(output);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregator::group,
        capture::{CaptureStrategy, SharedConsole},
        identity::{TestClass, TestIdentity},
        ledger::ResultSink,
    };
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use quick_htmlreport::{CaseStatus, Screenshot};
    use std::{io::Write, sync::Arc};

    fn metadata(screenshots: bool) -> RunMetadata {
        RunMetadata {
            title: "Nightly".to_owned(),
            description: "Smoke tests".to_owned(),
            tester: "QA".to_owned(),
            screenshots,
            start_time: Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap(),
            elapsed: Duration::from_millis(1250),
        }
    }

    fn sample_ledger() -> RunLedger {
        let console = SharedConsole::with_writers(std::io::sink(), std::io::sink());
        let mut ledger = RunLedger::new(CaptureStrategy::Console(console.clone()));
        let login = Arc::new(TestClass::new("ui::Login").with_description("Login page.\nDetails."));
        let search = Arc::new(TestClass::new("ui::Search"));

        let valid = TestIdentity::new(login.clone(), "valid_user")
            .with_description("Accepts a valid user");
        ledger.on_start(&valid);
        ledger.on_success(&valid);
        ledger.on_finalize(&valid);

        let invalid = TestIdentity::new(login, "invalid_user");
        ledger.on_start(&invalid);
        writeln!(
            console.stdout(),
            "{}",
            ScreenshotMarker::new("shot3.png", "Chrome(98)")
        )
        .unwrap();
        ledger.on_failure(&invalid, "expected an error banner");
        ledger.on_finalize(&invalid);

        let query = TestIdentity::new(search, "empty_query");
        ledger.on_start(&query);
        ledger.on_error(&query, "panicked at 'index out of bounds'");
        ledger.on_finalize(&query);

        ledger.finalize();
        ledger
    }

    #[test]
    fn heading_attributes() {
        let ledger = sample_ledger();
        let groups = group(&ledger);
        let report = build_report(&ledger, &groups, &metadata(false));

        let attributes: Vec<_> = report
            .attributes
            .iter()
            .map(|a| (a.name.as_str(), a.value.as_str()))
            .collect();
        assert_eq!(
            attributes,
            vec![
                ("Tester", "QA"),
                ("Start Time", "2024-03-09 14:05:00"),
                ("Duration", "1.25s"),
                (
                    "Status",
                    "Total 3, Passed 1, Failed 1, Errored 1, Pass rate = 33.33%"
                ),
            ]
        );
        assert_eq!(report.title, "Nightly");
        assert_eq!(report.description, "Smoke tests");
    }

    #[test]
    fn rows_follow_groups() {
        let ledger = sample_ledger();
        let groups = group(&ledger);
        let report = build_report(&ledger, &groups, &metadata(false));

        assert_eq!((report.tests, report.passed, report.failed, report.errored), (3, 1, 1, 1));
        let classes: Vec<_> = report.class_rows.iter().map(|r| r.display_name()).collect();
        assert_eq!(classes, vec!["ui::Login: Login page.", "ui::Search"]);

        let login = &report.class_rows[0];
        let cases: Vec<_> = login
            .case_rows
            .iter()
            .map(|c| (c.display_name(), c.status))
            .collect();
        assert_eq!(
            cases,
            vec![
                ("valid_user: Accepts a valid user".to_owned(), CaseStatus::Passed),
                ("invalid_user".to_owned(), CaseStatus::Failed),
            ]
        );
        assert!(login.case_rows[0].output.is_none(), "no output, no panel");
        assert_eq!(
            login.case_rows[1].output.as_ref().map(|o| o.as_str()),
            Some(
                "errorImg[shot3.png]errorImg, browser[Chrome(98)]browser\n\
                 expected an error banner"
            )
        );
        // Screenshots are off, so nothing is extracted.
        assert_eq!(login.case_rows[1].screenshot, Screenshot::default());
    }

    #[test]
    fn screenshots_are_extracted() {
        let ledger = sample_ledger();
        let groups = group(&ledger);
        let report = build_report(&ledger, &groups, &metadata(true));

        assert!(report.screenshots);
        let failing = &report.class_rows[0].case_rows[1];
        assert_eq!(failing.screenshot, Screenshot::new("shot3.png", "Chrome(98)"));
        let errored = &report.class_rows[1].case_rows[0];
        assert_eq!(errored.screenshot, Screenshot::default());
    }

    #[test]
    fn empty_run() {
        let ledger = {
            let mut ledger = RunLedger::new(CaptureStrategy::None);
            ledger.finalize();
            ledger
        };
        let report = build_report(&ledger, &group(&ledger), &metadata(false));
        assert!(report.class_rows.is_empty());
        assert_eq!(
            report.attributes[3].value,
            "Total 0, Pass rate = 0.00%"
        );
        assert_eq!(report.pass_rate().to_string(), "0.00%");
    }
}
