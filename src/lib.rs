//! # ringlog
//!
//! A bounded, lossy, concurrent log buffer with a background drain worker.
//!
//! Producers push formatted lines into a fixed-size ring without ever
//! blocking on I/O. When the ring is full the oldest line is overwritten.
//! A dedicated worker thread wakes on a fixed interval and writes everything
//! buffered so far into a sink, reopening the sink for every cycle.
//!
//! ## Architecture Overview
//!
//! - `ring_buffer`: the shared ring, its observable metrics and observers
//! - `sink`: line destinations (file, console, memory)
//! - `worker`: the periodic drain thread and its statistics
//! - `logger`: the level-based facade and one adapter per output format
//! - `config`: validated logger configuration
//! - `stress`, `metrics`, `results`: the `ringlog` stress binary
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use ringlog::{BufferedLog, FileLogger, Log, LoggerConfig};
//!
//! fn main() -> ringlog::Result<()> {
//!     let config = LoggerConfig::default().with_sink_path("app.log");
//!     let logger = FileLogger::new(&config)?;
//!
//!     logger.info("service started");
//!     logger.warning("disk almost full");
//!
//!     let stats = logger.shutdown();
//!     println!("{} lines written", stats.lines_written);
//!     Ok(())
//! }
//! ```

/// Command-line interface of the stress binary
pub mod cli;

/// Logger configuration and its validation
pub mod config;

pub mod error;

/// Level-based logging facade and the per-format adapters
///
/// Every adapter formats a line and hands it to its own ring buffer. None of
/// them performs I/O on the calling thread.
pub mod logger;

/// Diagnostics of the crate itself via `tracing`
pub mod logging;

/// Push latency and producer throughput measurement using HDR histograms
pub mod metrics;

/// Stress run results, the summary table and the JSON report
pub mod results;

/// The fixed-capacity overwrite-oldest ring buffer
pub mod ring_buffer;

/// Destinations the drain worker writes into
pub mod sink;

pub mod stress;

pub mod utils;

/// The background drain worker
pub mod worker;

pub use cli::{Args, LoggerKind};
pub use config::LoggerConfig;
pub use error::{LoggerError, Result};
pub use logger::{
    BufferedLog, ConsoleLogger, FileLogger, Level, Log, LogPipeline, MemoryLogger, PipelineLogger,
    TaskResult,
};
pub use ring_buffer::{BoundedRingBuffer, BufferMetric, BufferSnapshot};
pub use sink::{ConsoleSink, FileSink, LineSink, MemorySink};
pub use stress::StressRunner;
pub use worker::{DrainWorker, WorkerOptions, WorkerStats};

/// The current version of ringlog, reported in run results
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    /// Default ring capacity in slots. One slot always stays empty, so at
    /// most `CAPACITY - 1` lines are buffered at once.
    pub const CAPACITY: usize = 2048;

    /// Default time between two drain cycles
    pub const DRAIN_INTERVAL: Duration = Duration::from_secs(1);

    /// Name given to every drain worker thread
    pub const WORKER_THREAD_NAME: &str = "ringlog-drain";

    /// Default sink file of the file logger
    pub const SINK_PATH: &str = "ringlog.log";

    /// Default number of messages pushed by each stress producer
    pub const MESSAGES_PER_PRODUCER: usize = 10000;
}
