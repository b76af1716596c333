// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-test capture of the process's console output.
//!
//! While a test runs, everything written to stdout and stderr is routed into a buffer owned
//! by that test. The binding that was installed before the test is saved and put back when
//! the capture ends. Ending is idempotent: execution engines report a test's outcome and
//! then always call a finalization hook, and both end the capture.

mod shared;
#[cfg(unix)]
mod unix;

use crate::{
    errors::{CaptureError, DisplayErrorChain},
    identity::TestIdentity,
};
use debug_ignore::DebugIgnore;
pub use shared::*;
use std::sync::Arc;
use tracing::{debug, warn};
#[cfg(unix)]
pub use unix::FdRedirect;

/// A swappable binding of the console streams.
///
/// Implementations save the currently installed stdout and stderr on [`redirect`], route both
/// into a single fresh buffer, and put the saved streams back on [`restore`].
///
/// [`redirect`]: ConsoleStreams::redirect
/// [`restore`]: ConsoleStreams::restore
pub trait ConsoleStreams: Send {
    /// Saves the current bindings and routes stdout and stderr into a fresh buffer.
    fn redirect(&mut self) -> Result<(), CaptureError>;

    /// Restores the saved bindings and returns everything written since [`redirect`].
    ///
    /// Returns an empty buffer if no redirect is active.
    ///
    /// [`redirect`]: ConsoleStreams::redirect
    fn restore(&mut self) -> Result<Vec<u8>, CaptureError>;
}

/// Console streams that are never redirected. Captured output is always empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCapture;

impl ConsoleStreams for NoCapture {
    fn redirect(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn restore(&mut self) -> Result<Vec<u8>, CaptureError> {
        Ok(Vec::new())
    }
}

/// How test output should be captured.
#[derive(Clone, Debug, Default)]
pub enum CaptureStrategy {
    /// Redirect the process's stdout and stderr file descriptors.
    ///
    /// This captures everything the process writes, including output from child processes
    /// that inherit the descriptors. Only available on Unix; elsewhere this falls back to
    /// [`CaptureStrategy::None`].
    #[default]
    Redirect,

    /// Capture writes made through a [`SharedConsole`].
    Console(SharedConsole),

    /// Do not capture output.
    None,
}

impl CaptureStrategy {
    pub(crate) fn into_streams(self) -> Box<dyn ConsoleStreams> {
        match self {
            CaptureStrategy::Redirect => {
                cfg_if::cfg_if! {
                    if #[cfg(unix)] {
                        Box::new(FdRedirect::new())
                    } else {
                        warn!(
                            "file descriptor redirection is not supported on this platform, \
                             output will not be captured"
                        );
                        Box::new(NoCapture)
                    }
                }
            }
            CaptureStrategy::Console(console) => Box::new(console),
            CaptureStrategy::None => Box::new(NoCapture),
        }
    }
}

/// Captures console output for one test at a time.
#[derive(Debug)]
pub struct OutputCapture {
    streams: DebugIgnore<Box<dyn ConsoleStreams>>,
    state: CaptureState,
}

#[derive(Debug)]
enum CaptureState {
    Idle,
    Active { test: TestIdentity },
    Finished { test: TestIdentity, output: Arc<str> },
}

impl OutputCapture {
    /// Creates a new `OutputCapture` that swaps the given streams.
    pub fn new(streams: Box<dyn ConsoleStreams>) -> Self {
        Self {
            streams: DebugIgnore(streams),
            state: CaptureState::Idle,
        }
    }

    /// Returns true if a capture is currently active.
    pub fn is_active(&self) -> bool {
        matches!(self.state, CaptureState::Active { .. })
    }

    /// Starts capturing output for `test`.
    ///
    /// If a previous capture was never ended, it is ended first so that streams are never
    /// redirected twice.
    pub fn begin(&mut self, test: &TestIdentity) {
        if let CaptureState::Active { test: previous } = &self.state {
            let previous = previous.clone();
            self.end(&previous);
            debug!("capture for {previous} was not ended before {test} started");
        }

        match self.streams.redirect() {
            Ok(()) => {
                self.state = CaptureState::Active { test: test.clone() };
            }
            Err(error) => {
                warn!(
                    "output for {test} will not be captured: {}",
                    DisplayErrorChain::new(&error)
                );
                self.state = CaptureState::Finished {
                    test: test.clone(),
                    output: Arc::from(""),
                };
            }
        }
    }

    /// Stops capturing output for `test`, restoring the previous streams, and returns the
    /// captured text.
    ///
    /// Calling this again for the same test returns the same text without touching the
    /// streams. Calling it when no capture exists for `test` is a no-op that returns an empty
    /// string.
    pub fn end(&mut self, test: &TestIdentity) -> Arc<str> {
        match &self.state {
            CaptureState::Finished {
                test: finished,
                output,
            } if finished == test => output.clone(),
            CaptureState::Active { test: active } => {
                let active = active.clone();
                // Logs go to the console, so only emit them once the streams are back.
                let output = self.restore_streams();
                if &active != test {
                    debug!("ended capture for {active} on behalf of {test}");
                }
                self.state = CaptureState::Finished {
                    test: test.clone(),
                    output: output.clone(),
                };
                output
            }
            CaptureState::Idle | CaptureState::Finished { .. } => {
                debug!("no active capture for {test}, nothing to restore");
                Arc::from("")
            }
        }
    }

    fn restore_streams(&mut self) -> Arc<str> {
        match self.streams.restore() {
            Ok(bytes) => Arc::from(String::from_utf8_lossy(&bytes)),
            Err(error) => {
                warn!(
                    "failed to read back captured output: {}",
                    DisplayErrorChain::new(&error)
                );
                Arc::from("")
            }
        }
    }
}

impl Drop for OutputCapture {
    fn drop(&mut self) {
        if self.is_active() {
            // The engine never finalized the last test; don't leave the process redirected.
            self.restore_streams();
        }
    }
}
