// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::ConsoleStreams;
use crate::errors::CaptureError;
use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom, Write},
    os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
};
use tracing::debug;

/// Redirects file descriptors 1 and 2 into an anonymous temporary file.
///
/// The previous descriptors are duplicated before being replaced and are put back on
/// restore. Rust's buffered stdout is flushed on both transitions so that buffered output
/// lands on the correct side of the boundary.
#[derive(Debug, Default)]
pub struct FdRedirect {
    active: Option<ActiveRedirect>,
}

#[derive(Debug)]
struct ActiveRedirect {
    saved_stdout: OwnedFd,
    saved_stderr: OwnedFd,
    buffer: File,
}

impl FdRedirect {
    /// Creates a new, inactive `FdRedirect`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsoleStreams for FdRedirect {
    fn redirect(&mut self) -> Result<(), CaptureError> {
        if self.active.is_some() {
            // Keep the originally saved descriptors; the abandoned buffer is discarded.
            self.restore()?;
        }

        let buffer = camino_tempfile::tempfile().map_err(CaptureError::CreateBuffer)?;
        // Anything logged past this point would land in the buffer.
        debug!("redirecting stdout and stderr");
        io::stdout()
            .flush()
            .map_err(|error| CaptureError::Redirect {
                stream: "stdout",
                error,
            })?;

        let saved_stdout = dup(libc::STDOUT_FILENO).map_err(|error| CaptureError::Redirect {
            stream: "stdout",
            error,
        })?;
        let saved_stderr = dup(libc::STDERR_FILENO).map_err(|error| CaptureError::Redirect {
            stream: "stderr",
            error,
        })?;

        let target = buffer.as_raw_fd();
        dup2(target, libc::STDOUT_FILENO).map_err(|error| CaptureError::Redirect {
            stream: "stdout",
            error,
        })?;
        if let Err(error) = dup2(target, libc::STDERR_FILENO) {
            // Undo the half-done redirect before bailing out.
            let _ = dup2(saved_stdout.as_raw_fd(), libc::STDOUT_FILENO);
            return Err(CaptureError::Redirect {
                stream: "stderr",
                error,
            });
        }

        self.active = Some(ActiveRedirect {
            saved_stdout,
            saved_stderr,
            buffer,
        });
        Ok(())
    }

    fn restore(&mut self) -> Result<Vec<u8>, CaptureError> {
        let Some(active) = self.active.take() else {
            return Ok(Vec::new());
        };
        let ActiveRedirect {
            saved_stdout,
            saved_stderr,
            mut buffer,
        } = active;

        // Flush into the buffer before the descriptors change back.
        let flushed = io::stdout().flush();

        let stdout_restored = dup2(saved_stdout.as_raw_fd(), libc::STDOUT_FILENO);
        let stderr_restored = dup2(saved_stderr.as_raw_fd(), libc::STDERR_FILENO);
        stdout_restored
            .and(flushed)
            .map_err(|error| CaptureError::Restore {
                stream: "stdout",
                error,
            })?;
        stderr_restored.map_err(|error| CaptureError::Restore {
            stream: "stderr",
            error,
        })?;

        let mut output = Vec::new();
        buffer
            .seek(SeekFrom::Start(0))
            .and_then(|_| buffer.read_to_end(&mut output))
            .map_err(CaptureError::ReadBuffer)?;
        Ok(output)
    }
}

impl Drop for FdRedirect {
    fn drop(&mut self) {
        if self.active.is_some() {
            let _ = self.restore();
        }
    }
}

fn dup(fd: RawFd) -> io::Result<OwnedFd> {
    // SAFETY: dup has no memory-safety preconditions.
    let new_fd = unsafe { libc::dup(fd) };
    if new_fd < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: a non-negative return value is a freshly allocated descriptor owned by no one
    // else.
    Ok(unsafe { OwnedFd::from_raw_fd(new_fd) })
}

fn dup2(src: RawFd, dst: RawFd) -> io::Result<()> {
    loop {
        // SAFETY: dup2 has no memory-safety preconditions; dst is one of the standard
        // descriptors, which this process owns for its whole lifetime.
        if unsafe { libc::dup2(src, dst) } >= 0 {
            return Ok(());
        }
        let error = io::Error::last_os_error();
        if error.kind() != io::ErrorKind::Interrupted {
            return Err(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing::Level;

    // The standard descriptors are process-wide.
    static FD_LOCK: Mutex<()> = Mutex::new(());

    fn lock_fds() -> std::sync::MutexGuard<'static, ()> {
        FD_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn captures_raw_writes() {
        let _guard = lock_fds();
        let mut redirect = FdRedirect::new();
        redirect.redirect().unwrap();
        // print! is intercepted by the test harness, so write to the handles directly.
        io::stdout().write_all(b"fd-capture-stdout\n").unwrap();
        io::stderr().write_all(b"fd-capture-stderr\n").unwrap();
        let output = redirect.restore().unwrap();

        // Tests outside this module may write to the same descriptors concurrently.
        let output = String::from_utf8_lossy(&output);
        assert!(output.contains("fd-capture-stdout"), "stdout captured: {output}");
        assert!(output.contains("fd-capture-stderr"), "stderr captured: {output}");

        assert!(redirect.restore().unwrap().is_empty(), "second restore is a no-op");
    }

    #[test]
    fn own_logs_stay_out_of_the_buffer() {
        let _guard = lock_fds();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_writer(io::stderr)
            .finish();

        let output = tracing::subscriber::with_default(subscriber, || {
            let mut redirect = FdRedirect::new();
            redirect.redirect().unwrap();
            io::stderr().write_all(b"written-by-the-test\n").unwrap();
            redirect.restore().unwrap()
        });

        let output = String::from_utf8_lossy(&output);
        assert!(output.contains("written-by-the-test"), "test output captured: {output}");
        assert!(
            !output.contains("stdout and stderr"),
            "no log lines in the captured output: {output}"
        );
    }
}
