//! Capture of the process's standard output and error.
//!
//! Engines write diagnostics straight to fds 1 and 2, which an embedding host
//! usually cannot see. [`OutputRedirector::install`] points both descriptors
//! at one pipe and starts a background thread that forwards every line read
//! from it to a [`LineSink`], by default the tracing target
//! [`ENGINE_OUTPUT_TARGET`].
//!
//! The original descriptors are duplicated before redirection and handed back
//! as [`SavedStreams`]. A host that logs through tracing must write its own
//! log output to the saved stderr; writing it to fd 2 would feed every
//! forwarded line back into the pipe.

use std::fs::File;
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use thiserror::Error;

/// Tracing target of forwarded engine output.
pub const ENGINE_OUTPUT_TARGET: &str = "engine_output";

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Receiver of captured output, one line at a time.
pub trait LineSink: Send + 'static {
    fn forward_line(&self, line: &str);
}

impl<F> LineSink for F
where
    F: Fn(&str) + Send + 'static,
{
    fn forward_line(&self, line: &str) {
        self(line)
    }
}

/// Forwards each line as a `debug` event under [`ENGINE_OUTPUT_TARGET`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLineSink;

impl LineSink for TracingLineSink {
    fn forward_line(&self, line: &str) {
        tracing::debug!(target: ENGINE_OUTPUT_TARGET, "{}", line);
    }
}

#[derive(Debug, Error)]
pub enum RedirectError {
    #[error("output redirection is already installed")]
    AlreadyInstalled,
    #[error("output redirection failed: {0}")]
    Io(#[from] io::Error),
    #[error("output redirection is not supported on this platform")]
    Unsupported,
}

/// Copies of stdout and stderr taken before they were redirected.
#[derive(Debug)]
pub struct SavedStreams {
    pub stdout: File,
    pub stderr: File,
}

/// Read `reader` until end of input, handing each non-empty line to `sink`.
///
/// Trailing whitespace (including `\r\n`) is stripped and invalid UTF-8 is
/// replaced. A final line without a newline is still delivered. Returns the
/// number of lines forwarded.
pub fn forward_lines<R: BufRead>(mut reader: R, sink: &dyn LineSink) -> io::Result<usize> {
    let mut buf = Vec::with_capacity(256);
    let mut forwarded = 0;
    loop {
        buf.clear();
        let read = match reader.read_until(b'\n', &mut buf) {
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        if read == 0 {
            return Ok(forwarded);
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        sink.forward_line(line);
        forwarded += 1;
    }
}

/// Handle to the installed redirection.
///
/// Dropping it does not undo the redirection; the forwarding thread runs for
/// the rest of the process.
#[derive(Debug)]
pub struct OutputRedirector {
    saved: SavedStreams,
    reader: JoinHandle<()>,
}

impl OutputRedirector {
    /// Redirect fds 1 and 2 into a pipe drained by a background thread.
    ///
    /// May be installed once per process.
    pub fn install<S: LineSink>(sink: S) -> Result<Self, RedirectError> {
        if INSTALLED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RedirectError::AlreadyInstalled);
        }

        match imp::install(sink) {
            Ok((saved, reader)) => {
                tracing::info!("standard output redirected");
                Ok(Self { saved, reader })
            }
            Err(err) => {
                INSTALLED.store(false, Ordering::Release);
                Err(err)
            }
        }
    }

    /// The streams as they were before redirection.
    pub fn saved(&self) -> &SavedStreams {
        &self.saved
    }

    /// A fresh handle to the original stderr, e.g. for a log writer.
    pub fn original_stderr(&self) -> io::Result<File> {
        self.saved.stderr.try_clone()
    }

    /// Whether the forwarding thread is still draining the pipe.
    pub fn is_forwarding(&self) -> bool {
        !self.reader.is_finished()
    }

    pub fn into_saved(self) -> SavedStreams {
        self.saved
    }
}

#[cfg(unix)]
mod imp {
    use super::{forward_lines, LineSink, RedirectError, SavedStreams};
    use std::fs::File;
    use std::io::{self, BufReader, Write};
    use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
    use std::thread::{self, JoinHandle};

    fn cvt(ret: libc::c_int) -> io::Result<libc::c_int> {
        if ret == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(ret)
        }
    }

    fn dup(fd: RawFd) -> io::Result<File> {
        // SAFETY: `dup` returns a new descriptor we own exclusively.
        let fd = cvt(unsafe { libc::dup(fd) })?;
        Ok(unsafe { File::from_raw_fd(fd) })
    }

    fn dup2(src: &File, dst: RawFd) -> io::Result<()> {
        // SAFETY: both descriptors are open for the duration of the call.
        cvt(unsafe { libc::dup2(src.as_raw_fd(), dst) })?;
        Ok(())
    }

    fn pipe() -> io::Result<(File, File)> {
        let mut fds = [0 as libc::c_int; 2];
        // SAFETY: `fds` has room for the two descriptors `pipe` writes.
        cvt(unsafe { libc::pipe(fds.as_mut_ptr()) })?;
        Ok(unsafe { (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])) })
    }

    pub(super) fn install<S: LineSink>(
        sink: S,
    ) -> Result<(SavedStreams, JoinHandle<()>), RedirectError> {
        io::stdout().flush()?;
        io::stderr().flush()?;

        let saved = SavedStreams {
            stdout: dup(libc::STDOUT_FILENO)?,
            stderr: dup(libc::STDERR_FILENO)?,
        };
        let (read_end, write_end) = pipe()?;

        dup2(&write_end, libc::STDOUT_FILENO)?;
        if let Err(err) = dup2(&write_end, libc::STDERR_FILENO) {
            let _ = dup2(&saved.stdout, libc::STDOUT_FILENO);
            return Err(err.into());
        }
        // fds 1 and 2 now keep the pipe's write side open.
        drop(write_end);

        let reader = thread::Builder::new()
            .name("output-redirect".to_string())
            .spawn(move || match forward_lines(BufReader::new(read_end), &sink) {
                Ok(lines) => tracing::debug!(lines, "engine output pipe closed"),
                Err(err) => tracing::warn!(error = %err, "engine output pipe failed"),
            })?;

        Ok((saved, reader))
    }
}

#[cfg(not(unix))]
mod imp {
    use super::{LineSink, RedirectError, SavedStreams};
    use std::thread::JoinHandle;

    pub(super) fn install<S: LineSink>(
        _sink: S,
    ) -> Result<(SavedStreams, JoinHandle<()>), RedirectError> {
        Err(RedirectError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::Cursor;
    use std::sync::Arc;

    fn collect(input: &[u8]) -> (usize, Vec<String>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = lines.clone();
        let sink = move |line: &str| sink_lines.lock().push(line.to_string());
        let count = forward_lines(Cursor::new(input.to_vec()), &sink).unwrap();
        let lines = lines.lock().clone();
        (count, lines)
    }

    #[test]
    fn test_lines_are_forwarded_in_order() {
        let (count, lines) = collect(b"first\nsecond\nthird\n");
        assert_eq!(count, 3);
        assert_eq!(lines, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_empty_lines_are_skipped() {
        let (count, lines) = collect(b"a\n\n   \nb\n");
        assert_eq!(count, 2);
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_trailing_whitespace_and_crlf_trimmed() {
        let (_, lines) = collect(b"loading table  \r\nready\r\n");
        assert_eq!(lines, vec!["loading table", "ready"]);
    }

    #[test]
    fn test_last_line_without_newline() {
        let (count, lines) = collect(b"done\npartial");
        assert_eq!(count, 2);
        assert_eq!(lines.last().map(String::as_str), Some("partial"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let (_, lines) = collect(b"bad \xff byte\n");
        assert_eq!(lines, vec!["bad \u{fffd} byte"]);
    }

    #[test]
    fn test_empty_input_forwards_nothing() {
        let (count, lines) = collect(b"");
        assert_eq!(count, 0);
        assert!(lines.is_empty());
    }
}
