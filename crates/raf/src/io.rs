//! Output seam for the `print` builtin.
//!
//! Everything the language writes to standard output flows through a
//! [`PrintWriter`], so hosts and tests can capture or discard it.

use std::{
    borrow::Cow,
    io::{self, Write as _},
};

use crate::error::{RafError, RafResult};

/// Trait for handling output from the `print()` builtin.
///
/// `stdout_write` receives one formatted argument at a time without
/// separators; spaces between arguments and the trailing newline arrive via
/// `stdout_push`.
pub trait PrintWriter {
    fn stdout_write(&mut self, output: Cow<'_, str>) -> RafResult<()>;

    /// Adds a single character, generally a separator space or the final
    /// newline.
    fn stdout_push(&mut self, end: char) -> RafResult<()>;
}

/// Default `PrintWriter` that writes to the process stdout.
#[derive(Debug, Default)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn stdout_write(&mut self, output: Cow<'_, str>) -> RafResult<()> {
        io::stdout()
            .write_all(output.as_bytes())
            .map_err(|err| RafError::runtime(format!("failed to write to stdout: {err}")))
    }

    fn stdout_push(&mut self, end: char) -> RafResult<()> {
        let mut buf = [0u8; 4];
        io::stdout()
            .write_all(end.encode_utf8(&mut buf).as_bytes())
            .map_err(|err| RafError::runtime(format!("failed to write to stdout: {err}")))
    }
}

/// A `PrintWriter` that collects all output into a string.
///
/// Used by tests, including the back-end equivalence checks.
#[derive(Debug, Default)]
pub struct CollectStringPrint(String);

impl CollectStringPrint {
    #[must_use]
    pub fn new() -> Self {
        Self(String::new())
    }

    /// Returns the collected output as a string slice.
    #[must_use]
    pub fn output(&self) -> &str {
        self.0.as_str()
    }

    /// Consumes the writer and returns the collected output.
    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl PrintWriter for CollectStringPrint {
    fn stdout_write(&mut self, output: Cow<'_, str>) -> RafResult<()> {
        self.0.push_str(&output);
        Ok(())
    }

    fn stdout_push(&mut self, end: char) -> RafResult<()> {
        self.0.push(end);
        Ok(())
    }
}

/// `PrintWriter` that ignores all output.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn stdout_write(&mut self, _output: Cow<'_, str>) -> RafResult<()> {
        Ok(())
    }

    fn stdout_push(&mut self, _end: char) -> RafResult<()> {
        Ok(())
    }
}
