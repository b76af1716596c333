// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{errors::SerializeError, serialize::serialize_report};
use std::{borrow::Cow, fmt, io, time::Duration};

/// The root element of an HTML test report.
#[derive(Clone, Debug)]
pub struct Report {
    /// The title of this report, shown in the browser tab and as the main heading.
    pub title: String,

    /// The value of the `generator` meta tag.
    pub generator: String,

    /// Free-form text shown below the heading attributes.
    pub description: String,

    /// Labelled lines shown in the heading, such as the tester or the start time.
    pub attributes: Vec<Attribute>,

    /// Whether test rows carry a browser and screenshot column.
    pub screenshots: bool,

    /// The total number of tests from all class rows.
    pub tests: usize,

    /// The total number of passed tests from all class rows.
    pub passed: usize,

    /// The total number of failed tests from all class rows.
    pub failed: usize,

    /// The total number of errored tests from all class rows.
    pub errored: usize,

    /// The summed time of all class rows.
    pub time: Duration,

    /// The class rows contained in this report, in display order.
    pub class_rows: Vec<ClassRow>,
}

impl Report {
    /// Creates a new, empty `Report` with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            generator: concat!("quick-htmlreport ", env!("CARGO_PKG_VERSION")).to_owned(),
            description: String::new(),
            attributes: vec![],
            screenshots: false,
            tests: 0,
            passed: 0,
            failed: 0,
            errored: 0,
            time: Duration::ZERO,
            class_rows: vec![],
        }
    }

    /// Sets the generator string.
    pub fn set_generator(&mut self, generator: impl Into<String>) -> &mut Self {
        self.generator = generator.into();
        self
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    /// Enables or disables the screenshot column.
    pub fn set_screenshots(&mut self, screenshots: bool) -> &mut Self {
        self.screenshots = screenshots;
        self
    }

    /// Adds a heading attribute.
    pub fn add_attribute(&mut self, attribute: impl Into<Attribute>) -> &mut Self {
        self.attributes.push(attribute.into());
        self
    }

    /// Adds several heading attributes.
    pub fn add_attributes(
        &mut self,
        attributes: impl IntoIterator<Item = impl Into<Attribute>>,
    ) -> &mut Self {
        for attribute in attributes {
            self.add_attribute(attribute);
        }
        self
    }

    /// Adds a new class row and updates the counts and the total time.
    ///
    /// When generating a new report, use of this method is recommended over adding to
    /// `self.class_rows` directly.
    pub fn add_class_row(&mut self, class_row: ClassRow) -> &mut Self {
        self.tests += class_row.tests;
        self.passed += class_row.passed;
        self.failed += class_row.failed;
        self.errored += class_row.errored;
        self.time += class_row.time;
        self.class_rows.push(class_row);
        self
    }

    /// Adds several class rows and updates the counts and the total time.
    pub fn add_class_rows(&mut self, class_rows: impl IntoIterator<Item = ClassRow>) -> &mut Self {
        for class_row in class_rows {
            self.add_class_row(class_row);
        }
        self
    }

    /// Returns the pass rate over all class rows.
    pub fn pass_rate(&self) -> PassRate {
        PassRate::new(self.passed, self.tests)
    }

    /// Serialize this report to the given writer.
    pub fn serialize(&self, writer: impl io::Write) -> Result<(), SerializeError> {
        serialize_report(self, writer)
    }

    /// Serialize this report to a string.
    pub fn to_string(&self) -> Result<String, SerializeError> {
        let mut buf: Vec<u8> = vec![];
        self.serialize(&mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

/// A labelled line in the report heading.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    /// The label.
    pub name: String,

    /// The value.
    pub value: String,
}

impl Attribute {
    /// Creates a new `Attribute`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<T> From<(T, T)> for Attribute
where
    T: Into<String>,
{
    fn from((k, v): (T, T)) -> Self {
        Attribute::new(k, v)
    }
}

/// The share of passed tests, displayed as a percentage with two decimals.
///
/// A report with no tests has a pass rate of `0.00%`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PassRate {
    passed: usize,
    total: usize,
}

impl PassRate {
    /// Creates a new `PassRate`.
    pub fn new(passed: usize, total: usize) -> Self {
        Self { passed, total }
    }

    /// Returns the pass rate as a percentage in `0.0..=100.0`.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }
}

impl fmt::Display for PassRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.percent())
    }
}

/// A group of test rows sharing an owning class.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct ClassRow {
    /// The qualified name of the class.
    pub name: String,

    /// The first line of the class description, if any.
    pub description: Option<String>,

    /// The number of tests in this class row.
    pub tests: usize,

    /// The number of passed tests in this class row.
    pub passed: usize,

    /// The number of failed tests in this class row.
    pub failed: usize,

    /// The number of errored tests in this class row.
    pub errored: usize,

    /// The time displayed for this class row.
    pub time: Duration,

    /// The test rows nested under this class row.
    pub case_rows: Vec<CaseRow>,
}

impl ClassRow {
    /// Creates a new `ClassRow`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            tests: 0,
            passed: 0,
            failed: 0,
            errored: 0,
            time: Duration::ZERO,
            case_rows: vec![],
        }
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the time displayed for this row.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = time;
        self
    }

    /// Adds a test row and updates the counts.
    pub fn add_case_row(&mut self, case_row: CaseRow) -> &mut Self {
        self.tests += 1;
        match case_row.status {
            CaseStatus::Passed => self.passed += 1,
            CaseStatus::Failed => self.failed += 1,
            CaseStatus::Errored => self.errored += 1,
        }
        self.case_rows.push(case_row);
        self
    }

    /// Adds several test rows and updates the counts.
    pub fn add_case_rows(&mut self, case_rows: impl IntoIterator<Item = CaseRow>) -> &mut Self {
        for case_row in case_rows {
            self.add_case_row(case_row);
        }
        self
    }

    /// Returns the text shown in the first cell: the name, followed by the description if
    /// there is one.
    pub fn display_name(&self) -> String {
        display_name(&self.name, self.description.as_deref())
    }

    /// Returns the style of this row.
    ///
    /// A row is erroring if any test errored, else failing if any test failed, else passing.
    pub fn style(&self) -> RowStyle {
        if self.errored > 0 {
            RowStyle::Erroring
        } else if self.failed > 0 {
            RowStyle::Failing
        } else {
            RowStyle::Passing
        }
    }
}

/// A single test row.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct CaseRow {
    /// The name of the test.
    pub name: String,

    /// The first line of the test description, if any.
    pub description: Option<String>,

    /// The outcome of the test.
    pub status: CaseStatus,

    /// Captured output followed by the failure trace. `None` if both were empty.
    pub output: Option<Output>,

    /// The screenshot reported for this test.
    ///
    /// Only serialized if the report has screenshots enabled.
    pub screenshot: Screenshot,
}

impl CaseRow {
    /// Creates a new `CaseRow`.
    pub fn new(name: impl Into<String>, status: CaseStatus) -> Self {
        Self {
            name: name.into(),
            description: None,
            status,
            output: None,
            screenshot: Screenshot::default(),
        }
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the output panel contents. Empty text clears the panel.
    pub fn set_output(&mut self, output: impl AsRef<str>) -> &mut Self {
        let output = output.as_ref();
        self.output = (!output.is_empty()).then(|| Output::new(output));
        self
    }

    /// Sets the screenshot.
    pub fn set_screenshot(&mut self, screenshot: Screenshot) -> &mut Self {
        self.screenshot = screenshot;
        self
    }

    /// Returns the text shown in the first cell.
    pub fn display_name(&self) -> String {
        display_name(&self.name, self.description.as_deref())
    }

    /// Returns true if this row starts out hidden.
    ///
    /// Passed tests are collapsed by default; failures and errors are shown.
    pub fn starts_hidden(&self) -> bool {
        self.status == CaseStatus::Passed
    }
}

fn display_name(name: &str, description: Option<&str>) -> String {
    match description {
        Some(description) if !description.is_empty() => format!("{name}: {description}"),
        _ => name.to_owned(),
    }
}

/// The outcome of a test as shown in the report.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum CaseStatus {
    /// The test passed.
    Passed,

    /// The test failed an assertion.
    Failed,

    /// The test hit an unexpected error.
    Errored,
}

impl CaseStatus {
    /// Returns the single-letter prefix used in row identifiers.
    pub fn id_prefix(self) -> char {
        match self {
            CaseStatus::Passed => 'p',
            CaseStatus::Failed => 'f',
            CaseStatus::Errored => 'e',
        }
    }

    /// Returns the label shown for this outcome.
    pub fn label(self) -> &'static str {
        match self {
            CaseStatus::Passed => "Passed",
            CaseStatus::Failed => "Failed",
            CaseStatus::Errored => "Errored",
        }
    }

    /// Returns the row style for this outcome.
    pub fn style(self) -> RowStyle {
        match self {
            CaseStatus::Passed => RowStyle::Passing,
            CaseStatus::Failed => RowStyle::Failing,
            CaseStatus::Errored => RowStyle::Erroring,
        }
    }
}

/// Visual classification of a row.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RowStyle {
    /// Everything in the row passed.
    Passing,

    /// At least one failure and no errors.
    Failing,

    /// At least one error.
    Erroring,
}

impl RowStyle {
    /// The CSS class for a class row with this style.
    pub fn class_css(self) -> &'static str {
        match self {
            RowStyle::Passing => "passClass",
            RowStyle::Failing => "failClass",
            RowStyle::Erroring => "errorClass",
        }
    }

    /// The CSS class for a test row with this style.
    pub fn case_css(self) -> &'static str {
        match self {
            RowStyle::Passing => "passCase",
            RowStyle::Failing => "failCase",
            RowStyle::Erroring => "errorCase",
        }
    }
}

/// Identifier of a toggleable row in the rendered document.
///
/// Class rows are numbered by their 1-based position (`c2`). Test rows combine the outcome
/// prefix, the class position and the 1-based position within the class (`ft2_1`), so they
/// are unique across the document even though the positions restart for every class.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum RowId {
    /// A class row.
    Class {
        /// 1-based position of the class row.
        seq: usize,
    },

    /// A test row.
    Case {
        /// The outcome of the test.
        status: CaseStatus,
        /// 1-based position of the owning class row.
        class_seq: usize,
        /// 1-based position of the test within its class.
        pos: usize,
    },
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Class { seq } => write!(f, "c{seq}"),
            RowId::Case {
                status,
                class_seq,
                pos,
            } => write!(f, "{}t{class_seq}_{pos}", status.id_prefix()),
        }
    }
}

/// A screenshot artifact reported for a test, along with the browser that produced it.
///
/// Empty strings mean nothing was reported.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Screenshot {
    /// The file name or link target of the screenshot.
    pub file: String,

    /// The browser descriptor, e.g. `Chrome(98)`.
    pub browser: String,
}

impl Screenshot {
    /// Creates a new `Screenshot`.
    pub fn new(file: impl Into<String>, browser: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            browser: browser.into(),
        }
    }
}

/// Text written by a test while it ran, plus any failure trace.
///
/// # Encoding
///
/// Captured streams are arbitrary bytes, but the document is Unicode; callers are expected
/// to decode lossily. Control characters other than tab, newline and carriage return are
/// not representable in the document and are removed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Output {
    output: Box<str>,
}

impl Output {
    /// Creates a new output, removing any non-printable characters from it.
    pub fn new(output: impl AsRef<str>) -> Self {
        let output = strip_invalid_chars(output.as_ref()).into_owned().into_boxed_str();
        Self { output }
    }

    /// Returns the output.
    pub fn as_str(&self) -> &str {
        &self.output
    }

    /// Converts the output into a string.
    pub fn into_string(self) -> String {
        self.output.into_string()
    }
}

impl AsRef<str> for Output {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<Output> for String {
    fn from(output: Output) -> Self {
        output.into_string()
    }
}

/// Removes characters that cannot appear in an XML document.
///
/// Tab, newline and carriage return are kept. Text without such characters is borrowed.
pub(crate) fn strip_invalid_chars(text: &str) -> Cow<'_, str> {
    fn is_invalid(c: char) -> bool {
        matches!(
            c,
            '\x00'..='\x08' | '\x0b' | '\x0c' | '\x0e'..='\x1f' | '\u{fffe}' | '\u{ffff}'
        )
    }

    if text.contains(is_invalid) {
        Cow::Owned(text.replace(is_invalid, ""))
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 0, "0.00%" ; "no tests")]
    #[test_case(1, 3, "33.33%" ; "one of three")]
    #[test_case(2, 3, "66.67%" ; "two of three")]
    #[test_case(4, 4, "100.00%" ; "all passed")]
    fn pass_rate_display(passed: usize, total: usize, expected: &str) {
        assert_eq!(PassRate::new(passed, total).to_string(), expected);
    }

    #[test]
    fn row_ids() {
        assert_eq!(RowId::Class { seq: 3 }.to_string(), "c3");
        let id = RowId::Case {
            status: CaseStatus::Failed,
            class_seq: 1,
            pos: 2,
        };
        assert_eq!(id.to_string(), "ft1_2");
    }

    #[test]
    fn class_row_counts_and_style() {
        let mut row = ClassRow::new("suite::Login");
        row.add_case_rows([
            CaseRow::new("a", CaseStatus::Passed),
            CaseRow::new("b", CaseStatus::Failed),
        ]);
        assert_eq!((row.tests, row.passed, row.failed, row.errored), (2, 1, 1, 0));
        assert_eq!(row.style(), RowStyle::Failing);

        row.add_case_row(CaseRow::new("c", CaseStatus::Errored));
        assert_eq!(row.style(), RowStyle::Erroring);

        let mut report = Report::new("t");
        report.add_class_row(row);
        assert_eq!(report.tests, 3);
        assert_eq!(report.pass_rate().to_string(), "33.33%");
    }

    #[test]
    fn display_names() {
        let mut case = CaseRow::new("login_works", CaseStatus::Passed);
        assert_eq!(case.display_name(), "login_works");
        case.set_description("Logs in with a valid user");
        assert_eq!(case.display_name(), "login_works: Logs in with a valid user");
        assert!(case.starts_hidden());
    }

    #[test]
    fn output_strips_control_characters() {
        let output = Output::new("a\x00b\x1b[31mc\td\n");
        assert_eq!(output.as_str(), "ab[31mc\td\n");

        let mut case = CaseRow::new("t", CaseStatus::Failed);
        case.set_output("");
        assert_eq!(case.output, None);
    }
}
