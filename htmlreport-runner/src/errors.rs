// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by htmlreport-runner.

use camino::Utf8PathBuf;
use config::ConfigError;
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse report config{}", display_config_file(.config_file))]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Option<Utf8PathBuf>,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<Utf8PathBuf>, err: ConfigError) -> Self {
        Self { config_file, err }
    }

    /// Returns the config file that failed to parse, if one was provided.
    pub fn config_file(&self) -> Option<&Utf8PathBuf> {
        self.config_file.as_ref()
    }
}

fn display_config_file(config_file: &Option<Utf8PathBuf>) -> String {
    match config_file {
        Some(path) => format!(" at `{path}`"),
        None => String::new(),
    }
}

/// An error that occurred while redirecting or restoring the console streams.
///
/// These errors never abort a run: the ledger logs them and records empty output instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaptureError {
    /// Creating the per-test capture buffer failed.
    #[error("failed to create capture buffer")]
    CreateBuffer(#[source] std::io::Error),

    /// Saving or replacing a console stream failed.
    #[error("failed to redirect {stream}")]
    Redirect {
        /// The stream being redirected.
        stream: &'static str,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// Re-installing a saved console stream failed.
    #[error("failed to restore {stream}")]
    Restore {
        /// The stream being restored.
        stream: &'static str,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// Reading back the captured output failed.
    #[error("failed to read captured output")]
    ReadBuffer(#[source] std::io::Error),
}

/// An error that occurred while writing the rendered report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteReportError {
    /// An error occurred while writing the report to the provided output.
    #[error("error writing report to output")]
    Io(#[source] std::io::Error),

    /// An error occurred while operating on the file system.
    #[error("error operating on path {file}")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// An error occurred while producing HTML.
    #[error("error serializing HTML report")]
    Serialize(#[source] quick_htmlreport::SerializeError),
}

/// Walks an error's source chain for display on a single line.
pub struct DisplayErrorChain<E>(E);

impl<E: std::error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self(error)
    }
}

impl<E: std::error::Error> std::fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(error) = source {
            write!(f, ": {error}")?;
            source = error.source();
        }
        Ok(())
    }
}
