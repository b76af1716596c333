// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::ConsoleStreams;
use crate::errors::CaptureError;
use std::{
    fmt,
    io::{self, Write},
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// An in-process console shared between an execution engine and the capture.
///
/// Code that writes through [`stdout`](Self::stdout) and [`stderr`](Self::stderr) treats this
/// as the process's console. Outside a capture, writes pass through to the underlying
/// writers. While redirected, both streams are interleaved into one buffer.
#[derive(Clone)]
pub struct SharedConsole {
    inner: Arc<Mutex<ConsoleInner>>,
}

struct ConsoleInner {
    binding: Binding,
    saved: Option<Binding>,
}

enum Binding {
    Passthrough {
        stdout: Box<dyn Write + Send>,
        stderr: Box<dyn Write + Send>,
    },
    Buffer(Vec<u8>),
}

impl SharedConsole {
    /// Creates a console that passes through to the process's real stdout and stderr.
    pub fn new() -> Self {
        Self::with_writers(io::stdout(), io::stderr())
    }

    /// Creates a console that passes through to the given writers.
    pub fn with_writers(
        stdout: impl Write + Send + 'static,
        stderr: impl Write + Send + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ConsoleInner {
                binding: Binding::Passthrough {
                    stdout: Box::new(stdout),
                    stderr: Box::new(stderr),
                },
                saved: None,
            })),
        }
    }

    /// Returns a writer for this console's stdout.
    pub fn stdout(&self) -> ConsoleWriter {
        ConsoleWriter {
            console: self.clone(),
            stream: Stream::Stdout,
        }
    }

    /// Returns a writer for this console's stderr.
    pub fn stderr(&self) -> ConsoleWriter {
        ConsoleWriter {
            console: self.clone(),
            stream: Stream::Stderr,
        }
    }

    /// Returns true if output is currently being captured.
    pub fn is_redirected(&self) -> bool {
        self.lock().saved.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, ConsoleInner> {
        // A panic while holding the lock can't leave the binding half-swapped.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SharedConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedConsole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedConsole")
            .field("redirected", &self.is_redirected())
            .finish()
    }
}

impl ConsoleStreams for SharedConsole {
    fn redirect(&mut self) -> Result<(), CaptureError> {
        let mut inner = self.lock();
        let previous = mem::replace(&mut inner.binding, Binding::Buffer(Vec::new()));
        // If already redirected, keep the outermost binding and drop the abandoned buffer.
        if inner.saved.is_none() {
            inner.saved = Some(previous);
        }
        Ok(())
    }

    fn restore(&mut self) -> Result<Vec<u8>, CaptureError> {
        let mut inner = self.lock();
        let Some(saved) = inner.saved.take() else {
            return Ok(Vec::new());
        };
        match mem::replace(&mut inner.binding, saved) {
            Binding::Buffer(buf) => Ok(buf),
            Binding::Passthrough { .. } => Ok(Vec::new()),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Stream {
    Stdout,
    Stderr,
}

/// A writer for one stream of a [`SharedConsole`].
#[derive(Clone, Debug)]
pub struct ConsoleWriter {
    console: SharedConsole,
    stream: Stream,
}

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.console.lock();
        match (&mut inner.binding, self.stream) {
            (Binding::Buffer(captured), _) => {
                captured.extend_from_slice(buf);
                Ok(buf.len())
            }
            (Binding::Passthrough { stdout, .. }, Stream::Stdout) => stdout.write(buf),
            (Binding::Passthrough { stderr, .. }, Stream::Stderr) => stderr.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self.console.lock();
        match (&mut inner.binding, self.stream) {
            (Binding::Buffer(_), _) => Ok(()),
            (Binding::Passthrough { stdout, .. }, Stream::Stdout) => stdout.flush(),
            (Binding::Passthrough { stderr, .. }, Stream::Stderr) => stderr.flush(),
        }
    }
}
