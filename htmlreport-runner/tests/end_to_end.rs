// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino_tempfile::Utf8TempDir;
use htmlreport_runner::{
    capture::{CaptureStrategy, SharedConsole},
    config::{OutputSink, ReportConfig},
    engine::{TestFailure, TestSuite},
    identity::TestClass,
    ledger::{ResultSink, RunLedger},
    progress::Verbosity,
    runner::HtmlTestRunner,
    screenshot::ScreenshotMarker,
};
use pretty_assertions::assert_eq;
use report_fixtures::{Element, by_id, parse};
use std::io::Write;

fn test_row_ids(elements: &[Element]) -> Vec<&str> {
    elements
        .iter()
        .filter(|e| e.name == "tr")
        .filter_map(|e| e.attr("id"))
        .filter(|id| !matches!(*id, "header_row" | "total_row"))
        .collect()
}

fn class_row_count(elements: &[Element]) -> usize {
    elements
        .iter()
        .filter(|e| e.name == "tr" && e.attr("class").is_some_and(|c| c.ends_with(" warning")))
        .count()
}

fn total_row_cells(elements: &[Element]) -> Vec<&str> {
    let start = elements
        .iter()
        .position(|e| e.attr("id") == Some("total_row"))
        .expect("total row exists");
    elements[start + 1..]
        .iter()
        .take_while(|e| e.name == "td")
        .map(|e| e.text.as_str())
        .collect()
}

fn quiet_config(console: &SharedConsole) -> ReportConfig {
    ReportConfig::new()
        .with_verbosity(Verbosity::Quiet)
        .with_capture(CaptureStrategy::Console(console.clone()))
}

/// Two classes: X with a passing and a failing test, Y with an erroring test.
fn sample_suite(console: &SharedConsole) -> TestSuite {
    let mut suite = TestSuite::new();
    let out = console.clone();
    let err = console.clone();
    suite
        .add_class(TestClass::new("suite::X").with_description("Checks X.\nMore about X."))
        .add_test_with_description("pass", "Always passes", move || {
            writeln!(out.stdout(), "hello from pass").map_err(io_failure)
        })
        .add_test("fail", move || {
            writeln!(err.stderr(), "about to compare").map_err(io_failure)?;
            Err(TestFailure::new("assertion failed: 1 == 2"))
        });
    suite
        .add_class(TestClass::new("suite::Y"))
        .add_test("error", || panic!("unexpected state"));
    suite
}

fn io_failure(error: std::io::Error) -> TestFailure {
    TestFailure::new(error.to_string())
}

fn run_to_string(config: ReportConfig, suite: &mut TestSuite) -> (RunLedger, String) {
    let mut buf = Vec::new();
    let ledger = HtmlTestRunner::new(config)
        .run_to_writer(suite, &mut buf)
        .expect("report written");
    (ledger, String::from_utf8(buf).expect("report is UTF-8"))
}

#[test]
fn two_classes_three_outcomes() {
    let console = SharedConsole::with_writers(std::io::sink(), std::io::sink());
    let mut suite = sample_suite(&console);
    let (ledger, html) = run_to_string(quiet_config(&console), &mut suite);

    assert_eq!(ledger.total(), 3);
    assert_eq!(
        (
            ledger.success_count(),
            ledger.failure_count(),
            ledger.error_count()
        ),
        (1, 1, 1)
    );
    assert_eq!(ledger.pass_rate().to_string(), "33.33%");
    assert!(!console.is_redirected(), "console restored after the run");

    let elements = parse(&html);
    assert_eq!(class_row_count(&elements), 2);
    assert_eq!(test_row_ids(&elements), vec!["pt1_1", "ft1_2", "et2_1"]);

    // Passed rows start hidden; failed and errored rows are visible.
    assert_eq!(by_id(&elements, "pt1_1").attr("class"), Some("hiddenRow"));
    assert_eq!(by_id(&elements, "ft1_2").attr("class"), None);
    assert_eq!(by_id(&elements, "et2_1").attr("class"), None);

    let cells = total_row_cells(&elements);
    assert_eq!(cells[..5], ["Total", "3", "1", "1", "1"]);
    assert_eq!(cells[6], "Pass rate: 33.33%");

    let failed_output = by_id(&elements, "div_ft1_2");
    assert_eq!(failed_output.attr("class"), Some("collapse in"));
    let pre = elements
        .iter()
        .skip_while(|e| e.attr("id") != Some("div_ft1_2"))
        .find(|e| e.name == "pre")
        .expect("output panel has a pre");
    assert_eq!(pre.text, "about to compare\nassertion failed: 1 == 2");

    let errored_output = elements
        .iter()
        .skip_while(|e| e.attr("id") != Some("div_et2_1"))
        .find(|e| e.name == "pre")
        .expect("error panel has a pre");
    assert_eq!(errored_output.text, "unexpected state");

    let names: Vec<_> = elements
        .iter()
        .filter(|e| e.attr("class") == Some("testcase"))
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(names, vec!["pass: Always passes", "fail", "error"]);
}

#[test]
fn free_text_is_escaped() {
    let console = SharedConsole::with_writers(std::io::sink(), std::io::sink());
    let out = console.clone();
    let mut suite = TestSuite::new();
    suite
        .add_class(TestClass::new("Vec<T> & friends"))
        .add_test("<script>alert(1)</script>", move || {
            write!(out.stdout(), "</pre><b>not bold</b> & more").map_err(io_failure)?;
            Err(TestFailure::new("expected <1> & got <2>"))
        });

    let config = quiet_config(&console)
        .with_title("Report <&> \"quoted\"")
        .with_description("a < b && c > d");
    let (_, html) = run_to_string(config, &mut suite);

    let elements = parse(&html);
    let h1 = elements.iter().find(|e| e.name == "h1").expect("heading");
    assert_eq!(h1.text, "Report <&> \"quoted\"");
    let description = elements
        .iter()
        .find(|e| e.attr("class") == Some("description"))
        .expect("description");
    assert_eq!(description.text, "a < b && c > d");
    let test_name = elements
        .iter()
        .find(|e| e.attr("class") == Some("testcase"))
        .expect("test name");
    assert_eq!(test_name.text, "<script>alert(1)</script>");
    let pre = elements.iter().find(|e| e.name == "pre").expect("output");
    assert_eq!(pre.text, "</pre><b>not bold</b> & moreexpected <1> & got <2>");

    // No markup leaked from the free text. The only script is the report's own.
    assert_eq!(elements.iter().filter(|e| e.name == "script").count(), 1);
    assert!(elements.iter().all(|e| e.name != "b"));
}

#[test]
fn empty_run_is_valid() {
    let console = SharedConsole::with_writers(std::io::sink(), std::io::sink());
    let (ledger, html) = run_to_string(quiet_config(&console), &mut TestSuite::new());

    assert_eq!(ledger.total(), 0);
    let elements = parse(&html);
    assert_eq!(class_row_count(&elements), 0);
    assert!(test_row_ids(&elements).is_empty());
    let cells = total_row_cells(&elements);
    assert_eq!(cells[6], "Pass rate: 0.00%");
    let summary = elements
        .iter()
        .find(|e| e.attr("href") == Some("javascript:showCase(0)"))
        .expect("summary filter");
    assert_eq!(summary.text, "Summary { 0.00% }");
}

#[test]
fn screenshot_column() {
    let console = SharedConsole::with_writers(std::io::sink(), std::io::sink());
    let out = console.clone();
    let mut suite = TestSuite::new();
    suite
        .add_class(TestClass::new("ui::Checkout"))
        .add_test("pay", move || {
            writeln!(out.stdout(), "{}", ScreenshotMarker::new("shot3.png", "Chrome(98)"))
                .map_err(io_failure)?;
            Err(TestFailure::new("button not found"))
        })
        .add_test("browse", || Ok(()));

    let (_, html) = run_to_string(quiet_config(&console).with_screenshots(true), &mut suite);
    let elements = parse(&html);

    let link = elements
        .iter()
        .find(|e| e.attr("target") == Some("_blank"))
        .expect("screenshot link");
    assert_eq!(link.attr("href"), Some("shot3.png"));
    assert_eq!(link.text, "Screenshot: shot3.png");
    assert!(
        elements
            .iter()
            .any(|e| e.name == "td" && e.text == "Browser: Chrome(98)")
    );

    // The passing test has no output, so it gets an empty trailing cell.
    let links = elements
        .iter()
        .filter(|e| e.attr("target") == Some("_blank"))
        .count();
    assert_eq!(links, 1);
}

#[test]
fn writes_to_file_sink() {
    let dir = Utf8TempDir::new().unwrap();
    let path = dir.path().join("nested/dir/report.html");
    let console = SharedConsole::with_writers(std::io::sink(), std::io::sink());
    let config = quiet_config(&console).with_output(OutputSink::File(path.clone()));

    let mut suite = sample_suite(&console);
    let ledger = HtmlTestRunner::new(config)
        .run(&mut suite)
        .expect("report written");
    assert_eq!(ledger.total(), 3);

    let html = std::fs::read_to_string(&path).unwrap();
    let elements = parse(&html);
    assert_eq!(test_row_ids(&elements).len(), 3);
}

#[test]
fn unwritable_output_fails_before_running() {
    let dir = Utf8TempDir::new().unwrap();
    // A file where a directory is expected.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let path = blocker.join("report.html");

    let console = SharedConsole::with_writers(std::io::sink(), std::io::sink());
    let config = quiet_config(&console).with_output(OutputSink::File(path));
    let mut ran = false;
    let mut engine = |_: &mut dyn ResultSink| ran = true;

    let error = HtmlTestRunner::new(config).run(&mut engine).unwrap_err();
    assert!(
        matches!(error, htmlreport_runner::errors::WriteReportError::Fs { .. }),
        "unexpected error: {error}"
    );
    drop(engine);
    assert!(!ran, "no tests ran");
}
