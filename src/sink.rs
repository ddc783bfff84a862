//! # Line Sinks
//!
//! The drain worker only needs a destination that can append a line with an
//! explicit flush-or-fail contract and that can be truncated once at startup.
//! [`LineSink`] captures exactly that. Colouring, CI annotations and replay are
//! done by the loggers before a line ever reaches a sink.
//!
//! ## Provided sinks
//!
//! - [`FileSink`]: append-only text file, reopened for every drain cycle
//! - [`ConsoleSink`]: any `Write` stream, stdout by default
//! - [`MemorySink`]: shared in-memory line list, mostly for tests and replay

use crate::error::{LoggerError, Result, SinkOperation};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Append-only text destination driven by the drain worker.
///
/// A drain cycle calls `open`, then `append_line` once per element, then
/// `close`. Only the worker thread touches a sink, so implementations need
/// `Send` but not `Sync`.
pub trait LineSink: Send {
    /// Destroy any pre-existing content. Called once before the first cycle.
    fn reset(&mut self) -> Result<()>;

    /// Prepare for a drain cycle.
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    /// Write `line` followed by a newline and flush before returning.
    fn append_line(&mut self, line: &str) -> Result<()>;

    /// Finish a drain cycle and release any handle held since `open`.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Sink name for diagnostics
    fn name(&self) -> &'static str;
}

impl<S: LineSink + ?Sized> LineSink for Box<S> {
    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn append_line(&mut self, line: &str) -> Result<()> {
        (**self).append_line(line)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Flat text file sink, one message per line.
///
/// Lines go straight to the file in a single `write_all`, so a failed write
/// leaves nothing buffered that a later cycle could replay.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: Option<File>,
}

impl FileSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_append(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LoggerError::sink(SinkOperation::Open, e))
    }
}

impl LineSink for FileSink {
    fn reset(&mut self) -> Result<()> {
        self.writer = None;
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| LoggerError::sink(SinkOperation::Reset, e))?;
        debug!("Truncated log sink {:?}", self.path);
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        self.writer = Some(self.open_append()?);
        Ok(())
    }

    fn append_line(&mut self, line: &str) -> Result<()> {
        if self.writer.is_none() {
            self.open()?;
        }
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');
        let result = writer.write_all(record.as_bytes()).and_then(|_| writer.flush());
        if let Err(e) = result {
            // Drop the handle; the next cycle starts from a fresh open.
            self.writer = None;
            return Err(LoggerError::sink(SinkOperation::Write, e));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| LoggerError::sink(SinkOperation::Close, e))?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Sink writing to an arbitrary output stream.
pub struct ConsoleSink {
    writer: Box<dyn Write + Send>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::from_writer(std::io::stdout())
    }

    pub fn stderr() -> Self {
        Self::from_writer(std::io::stderr())
    }

    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }
}

impl LineSink for ConsoleSink {
    // A terminal has nothing to truncate.
    fn reset(&mut self) -> Result<()> {
        Ok(())
    }

    fn append_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .map_err(|e| LoggerError::sink(SinkOperation::Write, e))
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// In-memory sink; clones share the same line list.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl LineSink for MemorySink {
    fn reset(&mut self) -> Result<()> {
        self.lines.lock().clear();
        Ok(())
    }

    fn append_line(&mut self, line: &str) -> Result<()> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
