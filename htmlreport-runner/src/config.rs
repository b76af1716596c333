// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for a report run.
//!
//! A [`ReportConfig`] can be built in code, or loaded from the embedded defaults, an optional
//! TOML file and `HTMLREPORT_*` environment variables, in increasing order of precedence.

use crate::{
    capture::CaptureStrategy, errors::ConfigParseError, output::Color, progress::Verbosity,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;

/// Where the rendered report is written.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum OutputSink {
    /// Standard output.
    #[default]
    Stdout,

    /// A file, created or truncated. Missing parent directories are created.
    File(Utf8PathBuf),
}

/// How test output is captured, as named in configuration.
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    /// Redirect the process's stdout and stderr descriptors.
    #[default]
    Redirect,

    /// Don't capture output.
    None,
}

impl From<CaptureMode> for CaptureStrategy {
    fn from(mode: CaptureMode) -> Self {
        match mode {
            CaptureMode::Redirect => CaptureStrategy::Redirect,
            CaptureMode::None => CaptureStrategy::None,
        }
    }
}

/// Settings for a report run.
#[derive(Clone, Debug)]
pub struct ReportConfig {
    title: String,
    description: String,
    tester: String,
    screenshots: bool,
    output: OutputSink,
    verbosity: Verbosity,
    capture: CaptureStrategy,
    color: Color,
}

impl ReportConfig {
    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Environment configuration uses this prefix, plus a `_`.
    pub const ENVIRONMENT_PREFIX: &'static str = "HTMLREPORT";

    /// Creates a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the config from the embedded defaults, then `config_file` if given, then
    /// environment variables prefixed with [`Self::ENVIRONMENT_PREFIX`].
    pub fn from_sources(config_file: Option<&Utf8Path>) -> Result<Self, ConfigParseError> {
        Self::from_sources_impl(config_file, Environment::with_prefix(Self::ENVIRONMENT_PREFIX))
    }

    fn from_sources_impl(
        config_file: Option<&Utf8Path>,
        environment: Environment,
    ) -> Result<Self, ConfigParseError> {
        let mut builder = Self::make_default_config();
        if let Some(config_file) = config_file {
            builder = builder.add_source(File::new(config_file.as_str(), FileFormat::Toml));
        }
        builder = builder.add_source(environment.try_parsing(true));

        let deserialized: DeserializedConfig = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|err| ConfigParseError::new(config_file.map(ToOwned::to_owned), err))?;
        Ok(deserialized.into())
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// Sets the report title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the description shown under the heading.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the tester name.
    pub fn with_tester(mut self, tester: impl Into<String>) -> Self {
        self.tester = tester.into();
        self
    }

    /// Enables or disables the screenshot column.
    pub fn with_screenshots(mut self, screenshots: bool) -> Self {
        self.screenshots = screenshots;
        self
    }

    /// Sets where the report is written.
    pub fn with_output(mut self, output: OutputSink) -> Self {
        self.output = output;
        self
    }

    /// Sets how much progress output is printed.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Sets how test output is captured.
    pub fn with_capture(mut self, capture: CaptureStrategy) -> Self {
        self.capture = capture;
        self
    }

    /// Sets whether progress output is colorized.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Returns the report title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the tester name.
    pub fn tester(&self) -> &str {
        &self.tester
    }

    /// Returns true if the screenshot column is enabled.
    pub fn screenshots(&self) -> bool {
        self.screenshots
    }

    /// Returns where the report is written.
    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    /// Returns the progress verbosity.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Returns the capture strategy.
    pub fn capture(&self) -> &CaptureStrategy {
        &self.capture
    }

    /// Returns the color choice.
    pub fn color(&self) -> Color {
        self.color
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Test Report".to_owned(),
            description: String::new(),
            tester: "QA".to_owned(),
            screenshots: false,
            output: OutputSink::Stdout,
            verbosity: Verbosity::default(),
            capture: CaptureStrategy::default(),
            color: Color::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedConfig {
    title: String,
    description: String,
    tester: String,
    screenshots: bool,
    // Environment variables arrive with underscores.
    #[serde(default, alias = "output_file")]
    output_file: Option<Utf8PathBuf>,
    verbosity: Verbosity,
    capture: CaptureMode,
    color: Color,
}

impl From<DeserializedConfig> for ReportConfig {
    fn from(config: DeserializedConfig) -> Self {
        Self {
            title: config.title,
            description: config.description,
            tester: config.tester,
            screenshots: config.screenshots,
            output: config.output_file.map_or(OutputSink::Stdout, OutputSink::File),
            verbosity: config.verbosity,
            capture: config.capture.into(),
            color: config.color,
        }
    }
}
