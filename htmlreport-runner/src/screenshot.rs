// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The marker convention screenshot utilities use to attach an artifact to a test.
//!
//! A utility that saves a screenshot prints one line to the console while the test runs:
//!
//! ```text
//! errorImg[3.png]errorImg, browser[Chrome(98)]browser
//! ```
//!
//! The capture collects that line with the rest of the test's output, and the renderer
//! extracts both values when screenshots are enabled.

use quick_htmlreport::Screenshot;
use std::fmt;

const FILE_OPEN: &str = "errorImg[";
const FILE_CLOSE: &str = "]errorImg";
const BROWSER_OPEN: &str = "browser[";
const BROWSER_CLOSE: &str = "]browser";

/// A screenshot file name and browser descriptor, as reported through captured output.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScreenshotMarker {
    file: String,
    browser: String,
}

impl ScreenshotMarker {
    /// Creates a new marker.
    pub fn new(file: impl Into<String>, browser: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            browser: browser.into(),
        }
    }

    /// Extracts a marker from captured output.
    ///
    /// Each value is the text between the first opening delimiter and the first closing
    /// delimiter after it. A value whose delimiters are missing is empty.
    pub fn extract(output: &str) -> Self {
        Self {
            file: between(output, FILE_OPEN, FILE_CLOSE).to_owned(),
            browser: between(output, BROWSER_OPEN, BROWSER_CLOSE).to_owned(),
        }
    }

    /// Returns the screenshot file name.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Returns the browser descriptor.
    pub fn browser(&self) -> &str {
        &self.browser
    }

    /// Returns true if neither value was reported.
    pub fn is_empty(&self) -> bool {
        self.file.is_empty() && self.browser.is_empty()
    }
}

impl From<ScreenshotMarker> for Screenshot {
    fn from(marker: ScreenshotMarker) -> Self {
        Screenshot::new(marker.file, marker.browser)
    }
}

impl fmt::Display for ScreenshotMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{FILE_OPEN}{}{FILE_CLOSE}, {BROWSER_OPEN}{}{BROWSER_CLOSE}",
            self.file, self.browser
        )
    }
}

fn between<'a>(text: &'a str, open: &str, close: &str) -> &'a str {
    let Some(start) = text.find(open).map(|index| index + open.len()) else {
        return "";
    };
    let rest = &text[start..];
    match rest.find(close) {
        Some(end) => &rest[..end],
        None => "",
    }
}
