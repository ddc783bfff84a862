//! # Logger Facade and Adapters
//!
//! Everything in this module is a thin, stateless mapping from a semantic
//! level to a formatted line, in front of the shared buffering core.
//!
//! ## Key Components
//!
//! - **Level / Log**: the small capability every adapter implements
//! - **LogPipeline**: one ring buffer plus one drain worker plus per-instance
//!   level counters; embedded by each sink-specific adapter
//! - **FileLogger**: timestamped plain lines into a file
//! - **ConsoleLogger**: level-coloured lines on stdout
//! - **PipelineLogger**: CI pipeline annotations (`##vso[...]` markers)
//! - **MemoryLogger**: keeps records in memory for later replay
//!
//! Adapters are independent types; none inherits from another. Counters such
//! as "one or more errors logged" belong to the adapter instance.

use crate::config::LoggerConfig;
use crate::error::Result;
use crate::ring_buffer::BoundedRingBuffer;
use crate::sink::{ConsoleSink, FileSink, LineSink};
use crate::worker::{DrainWorker, WorkerOptions, WorkerStats};
use chrono::{SecondsFormat, Utc};
use clap::ValueEnum;
use colored::Colorize;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Message severity, ordered from least to most severe.
///
/// `Command` marks an external command being run and sits between `Info`
/// and `Warning` for filtering. `Exception` carries an unpacked error chain
/// and counts as an error.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
pub enum Level {
    Debug,
    Info,
    Command,
    Warning,
    Error,
    Exception,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Debug,
        Level::Info,
        Level::Command,
        Level::Warning,
        Level::Error,
        Level::Exception,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Command => "COMMAND",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Exception => "EXCEPTION",
        }
    }

    /// Error and Exception both fail a pipeline run.
    pub fn is_error(&self) -> bool {
        matches!(self, Level::Error | Level::Exception)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability implemented by every logger adapter.
pub trait Log: Send + Sync {
    fn log(&self, level: Level, text: &str);

    fn debug(&self, text: &str) {
        self.log(Level::Debug, text);
    }

    fn info(&self, text: &str) {
        self.log(Level::Info, text);
    }

    fn warning(&self, text: &str) {
        self.log(Level::Warning, text);
    }

    fn error(&self, text: &str) {
        self.log(Level::Error, text);
    }

    fn command(&self, text: &str) {
        self.log(Level::Command, text);
    }

    /// Log an error followed by one line per underlying cause, all at
    /// [`Level::Exception`].
    fn log_error_chain(&self, error: &(dyn std::error::Error + 'static)) {
        for line in error_chain_lines(error) {
            self.log(Level::Exception, &line);
        }
    }
}

/// Unpack an error and its `source()` chain into printable lines.
pub fn error_chain_lines(error: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut lines = vec![error.to_string()];
    let mut cause = error.source();
    while let Some(inner) = cause {
        lines.push(format!("  caused by: {}", inner));
        cause = inner.source();
    }
    lines
}

/// Per-instance message counts by level.
#[derive(Debug, Default)]
pub struct LevelCounters {
    debug: AtomicU64,
    info: AtomicU64,
    command: AtomicU64,
    warning: AtomicU64,
    error: AtomicU64,
    exception: AtomicU64,
}

/// Serializable copy of [`LevelCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub debug: u64,
    pub info: u64,
    pub command: u64,
    pub warning: u64,
    pub error: u64,
    pub exception: u64,
}

impl LevelCounters {
    fn slot(&self, level: Level) -> &AtomicU64 {
        match level {
            Level::Debug => &self.debug,
            Level::Info => &self.info,
            Level::Command => &self.command,
            Level::Warning => &self.warning,
            Level::Error => &self.error,
            Level::Exception => &self.exception,
        }
    }

    pub fn record(&self, level: Level) {
        self.slot(level).fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, level: Level) -> u64 {
        self.slot(level).load(Ordering::Relaxed)
    }

    pub fn errors_logged(&self) -> bool {
        self.count(Level::Error) + self.count(Level::Exception) > 0
    }

    pub fn warnings_logged(&self) -> bool {
        self.count(Level::Warning) > 0
    }

    pub fn snapshot(&self) -> LevelCounts {
        LevelCounts {
            debug: self.count(Level::Debug),
            info: self.count(Level::Info),
            command: self.count(Level::Command),
            warning: self.count(Level::Warning),
            error: self.count(Level::Error),
            exception: self.count(Level::Exception),
        }
    }
}

/// A ring buffer and the drain worker that empties it into one sink.
pub struct LogPipeline {
    buffer: Arc<BoundedRingBuffer<String>>,
    worker: Mutex<Option<DrainWorker>>,
    final_stats: Mutex<WorkerStats>,
    min_level: Level,
    counters: LevelCounters,
}

impl LogPipeline {
    /// Allocate the buffer and start draining it into `sink`.
    pub fn start<S>(sink: S, config: &LoggerConfig, options: WorkerOptions) -> Result<Self>
    where
        S: LineSink + 'static,
    {
        config.validate()?;
        let buffer = Arc::new(BoundedRingBuffer::new(config.capacity)?);
        let worker = DrainWorker::spawn(Arc::clone(&buffer), sink, options)?;

        Ok(Self {
            buffer,
            worker: Mutex::new(Some(worker)),
            final_stats: Mutex::new(WorkerStats::default()),
            min_level: config.min_level,
            counters: LevelCounters::default(),
        })
    }

    pub fn accepts(&self, level: Level) -> bool {
        level >= self.min_level
    }

    /// Count and buffer an already formatted line. Never blocks on I/O.
    pub fn submit(&self, level: Level, line: String) {
        self.counters.record(level);
        self.buffer.push(line);
    }

    pub fn buffer(&self) -> &Arc<BoundedRingBuffer<String>> {
        &self.buffer
    }

    pub fn counters(&self) -> &LevelCounters {
        &self.counters
    }

    pub fn worker_stats(&self) -> WorkerStats {
        match self.worker.lock().as_ref() {
            Some(worker) => worker.stats(),
            None => self.final_stats.lock().clone(),
        }
    }

    /// Stop the drain worker and return its final statistics.
    ///
    /// Lines submitted afterwards stay in the buffer. Calling this twice is
    /// harmless.
    pub fn shutdown(&self) -> WorkerStats {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            *self.final_stats.lock() = worker.shutdown();
        }
        self.final_stats.lock().clone()
    }
}

impl fmt::Debug for LogPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogPipeline")
            .field("buffer", &self.buffer)
            .field("min_level", &self.min_level)
            .field("counters", &self.counters.snapshot())
            .finish()
    }
}

/// Logger backed by a [`LogPipeline`], which exposes buffer and worker state.
pub trait BufferedLog: Log {
    fn pipeline(&self) -> &LogPipeline;

    fn shutdown(&self) -> WorkerStats {
        self.pipeline().shutdown()
    }
}

/// `<RFC3339 timestamp> <LEVEL> <text>`
pub fn format_file_line(level: Level, text: &str) -> String {
    format!(
        "{} {:<9} {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        level.as_str(),
        text
    )
}

/// Whole line coloured by level.
pub fn format_console_line(level: Level, text: &str) -> String {
    let line = format!("{}: {}", level, text);
    match level {
        Level::Debug => line.bright_black().to_string(),
        Level::Info => line.white().to_string(),
        Level::Command => line.green().to_string(),
        Level::Warning => line.yellow().to_string(),
        Level::Error => line.red().to_string(),
        // dark red
        Level::Exception => line.truecolor(139, 0, 0).to_string(),
    }
}

/// Azure Pipelines logging commands; info lines pass through unchanged.
pub fn format_pipeline_line(level: Level, text: &str) -> String {
    match level {
        Level::Debug => format!("##[debug]{}", text),
        Level::Info => text.to_string(),
        Level::Command => format!("##[command]{}", text),
        Level::Warning => format!("##vso[task.logissue type=warning;]{}", text),
        Level::Error | Level::Exception => format!("##vso[task.logissue type=error;]{}", text),
    }
}

/// Outcome reported by the final `task.complete` command of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskResult {
    Succeeded,
    SucceededWithIssues,
    Failed,
}

impl TaskResult {
    pub fn from_counters(counters: &LevelCounters) -> Self {
        if counters.errors_logged() {
            TaskResult::Failed
        } else if counters.warnings_logged() {
            TaskResult::SucceededWithIssues
        } else {
            TaskResult::Succeeded
        }
    }

    pub fn completion_line(&self) -> &'static str {
        match self {
            TaskResult::Succeeded => "##vso[task.complete result=Succeeded;]DONE",
            TaskResult::SucceededWithIssues => {
                "##vso[task.complete result=SucceededWithIssues;]DONE WITH ISSUES"
            }
            TaskResult::Failed => "##vso[task.complete result=Failed;]FAIL",
        }
    }
}

/// Writes timestamped lines to `config.sink_path`.
#[derive(Debug)]
pub struct FileLogger {
    pipeline: LogPipeline,
}

impl FileLogger {
    pub fn new(config: &LoggerConfig) -> Result<Self> {
        Self::with_options(config, config.worker_options())
    }

    pub fn with_options(config: &LoggerConfig, options: WorkerOptions) -> Result<Self> {
        let sink = FileSink::new(&config.sink_path);
        Ok(Self {
            pipeline: LogPipeline::start(sink, config, options)?,
        })
    }
}

impl Log for FileLogger {
    fn log(&self, level: Level, text: &str) {
        if self.pipeline.accepts(level) {
            self.pipeline.submit(level, format_file_line(level, text));
        }
    }
}

impl BufferedLog for FileLogger {
    fn pipeline(&self) -> &LogPipeline {
        &self.pipeline
    }
}

/// Writes level-coloured lines, to stdout unless another sink is given.
#[derive(Debug)]
pub struct ConsoleLogger {
    pipeline: LogPipeline,
}

impl ConsoleLogger {
    pub fn stdout(config: &LoggerConfig) -> Result<Self> {
        Self::with_sink(ConsoleSink::stdout(), config, config.worker_options())
    }

    pub fn with_sink<S>(sink: S, config: &LoggerConfig, options: WorkerOptions) -> Result<Self>
    where
        S: LineSink + 'static,
    {
        Ok(Self {
            pipeline: LogPipeline::start(sink, config, options)?,
        })
    }
}

impl Log for ConsoleLogger {
    fn log(&self, level: Level, text: &str) {
        if self.pipeline.accepts(level) {
            self.pipeline.submit(level, format_console_line(level, text));
        }
    }
}

impl BufferedLog for ConsoleLogger {
    fn pipeline(&self) -> &LogPipeline {
        &self.pipeline
    }
}

/// Emits CI pipeline annotations so warnings and errors show up as issues.
#[derive(Debug)]
pub struct PipelineLogger {
    pipeline: LogPipeline,
}

impl PipelineLogger {
    pub fn stdout(config: &LoggerConfig) -> Result<Self> {
        Self::with_sink(ConsoleSink::stdout(), config, config.worker_options())
    }

    pub fn with_sink<S>(sink: S, config: &LoggerConfig, options: WorkerOptions) -> Result<Self>
    where
        S: LineSink + 'static,
    {
        Ok(Self {
            pipeline: LogPipeline::start(sink, config, options)?,
        })
    }

    /// Task result matching what this instance has logged so far.
    pub fn task_result(&self) -> TaskResult {
        TaskResult::from_counters(self.pipeline.counters())
    }

    pub fn completion_line(&self) -> String {
        self.task_result().completion_line().to_string()
    }

    /// Buffer the completion command and stop the worker.
    pub fn finish(&self) -> WorkerStats {
        self.pipeline.buffer().push(self.completion_line());
        self.pipeline.shutdown()
    }
}

impl Log for PipelineLogger {
    fn log(&self, level: Level, text: &str) {
        if self.pipeline.accepts(level) {
            self.pipeline.submit(level, format_pipeline_line(level, text));
        }
    }
}

impl BufferedLog for PipelineLogger {
    fn pipeline(&self) -> &LogPipeline {
        &self.pipeline
    }

    fn shutdown(&self) -> WorkerStats {
        self.finish()
    }
}

/// One message held by a [`MemoryLogger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: Level,
    pub text: String,
}

/// Keeps the most recent messages in memory, without any worker.
#[derive(Debug)]
pub struct MemoryLogger {
    records: BoundedRingBuffer<LogRecord>,
    min_level: Level,
    counters: LevelCounters,
}

impl MemoryLogger {
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            records: BoundedRingBuffer::new(capacity)?,
            min_level: Level::Debug,
            counters: LevelCounters::default(),
        })
    }

    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn counters(&self) -> &LevelCounters {
        &self.counters
    }

    pub fn buffered_count(&self) -> usize {
        self.records.buffered_count()
    }

    /// Remove and return every held record, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        std::iter::from_fn(|| self.records.pop()).collect()
    }

    /// Forward every held record to `target` in order; returns how many.
    ///
    /// Records stay in place, so the same history can be replayed into
    /// several loggers.
    pub fn replay_into(&self, target: &dyn Log) -> usize {
        let records = self.records.buffered_items();
        for record in &records {
            target.log(record.level, &record.text);
        }
        records.len()
    }
}

impl Log for MemoryLogger {
    fn log(&self, level: Level, text: &str) {
        if level < self.min_level {
            return;
        }
        self.counters.record(level);
        self.records.push(LogRecord {
            level,
            text: text.to_string(),
        });
    }
}
