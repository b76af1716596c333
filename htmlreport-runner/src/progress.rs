// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-line progress output as each test completes.

use crate::{
    errors::DisplayErrorChain,
    ledger::{Outcome, TestRecord},
};
use debug_ignore::DebugIgnore;
use owo_colors::{OwoColorize, Style};
use serde::Deserialize;
use std::io::{self, Write};
use tracing::debug;

/// How much progress output to produce while tests run.
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum Verbosity {
    /// No progress output.
    Quiet,

    /// A status letter per test.
    Normal,

    /// A status letter followed by the test name.
    #[default]
    Verbose,
}

/// Writes a short progress line after each test completes.
///
/// Lines are written after the test's capture has ended, so they always reach the real
/// console.
#[derive(Debug)]
pub struct ProgressWriter {
    verbosity: Verbosity,
    styles: Styles,
    writer: DebugIgnore<Box<dyn Write + Send>>,
}

impl ProgressWriter {
    /// Creates a new `ProgressWriter` writing to `writer`.
    pub fn new(verbosity: Verbosity, writer: impl Write + Send + 'static) -> Self {
        Self {
            verbosity,
            styles: Styles::default(),
            writer: DebugIgnore(Box::new(writer)),
        }
    }

    /// Creates a `ProgressWriter` that writes to standard error.
    pub fn stderr(verbosity: Verbosity) -> Self {
        Self::new(verbosity, io::stderr())
    }

    /// Creates a `ProgressWriter` that writes nothing.
    pub fn quiet() -> Self {
        Self::new(Verbosity::Quiet, io::sink())
    }

    /// Enables colorized status letters.
    pub fn colorize(mut self) -> Self {
        self.styles.colorize();
        self
    }

    pub(crate) fn write_record(&mut self, record: &TestRecord) {
        if let Err(error) = self.write_record_impl(record) {
            debug!("failed to write progress: {}", DisplayErrorChain::new(&error));
        }
    }

    fn write_record_impl(&mut self, record: &TestRecord) -> io::Result<()> {
        let (letter, style) = match record.outcome() {
            Outcome::Passed => ("S", self.styles.pass),
            Outcome::Failed => ("F", self.styles.fail),
            Outcome::Errored => ("E", self.styles.error),
        };
        match self.verbosity {
            Verbosity::Quiet => return Ok(()),
            Verbosity::Normal => writeln!(self.writer, "  {}", letter.style(style))?,
            Verbosity::Verbose => writeln!(
                self.writer,
                "  {}  {}",
                letter.style(style),
                record.identity()
            )?,
        }
        self.writer.flush()
    }
}

#[derive(Debug, Default)]
struct Styles {
    pass: Style,
    fail: Style,
    error: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.error = Style::new().yellow().bold();
    }
}
