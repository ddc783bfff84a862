//! # Drain Worker
//!
//! A dedicated background thread that periodically empties a
//! [`BoundedRingBuffer<String>`] into a [`LineSink`].
//!
//! ## Lifecycle
//!
//! 1. **Startup**: the sink is reset (truncated) once
//! 2. **Idle-wait**: block on the stop channel for one polling interval
//! 3. **Draining**: open the sink, pop at most the number of elements buffered
//!    when the cycle began, append each as one flushed line, close the sink
//! 4. Back to idle-wait until [`DrainWorker::shutdown`] is called or the handle
//!    is dropped
//!
//! ## Failure Model
//!
//! Delivery is best-effort. A failing open, write or close ends the current
//! cycle, is handed to the failure hook and counted in [`WorkerStats`]. The
//! element whose write failed is gone; anything not yet popped waits for the
//! next cycle. The worker itself never stops because of a sink error.

use crate::error::{LoggerError, Result};
use crate::ring_buffer::BoundedRingBuffer;
use crate::sink::LineSink;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Callback receiving sink failures the worker recovered from.
pub type FailureHook = Arc<dyn Fn(&LoggerError) + Send + Sync>;

/// Failure hook that writes the error to standard error.
pub fn stderr_failure_hook() -> FailureHook {
    Arc::new(|error: &LoggerError| eprintln!("ringlog: drain failed: {}", error))
}

/// Tuning knobs for a [`DrainWorker`].
#[derive(Clone)]
pub struct WorkerOptions {
    /// Time between drain cycles
    pub interval: Duration,

    /// Run one last drain cycle after the stop signal
    pub drain_on_shutdown: bool,

    pub thread_name: String,

    /// Fallback channel for sink failures
    pub on_failure: FailureHook,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            interval: crate::defaults::DRAIN_INTERVAL,
            drain_on_shutdown: true,
            thread_name: crate::defaults::WORKER_THREAD_NAME.to_string(),
            on_failure: stderr_failure_hook(),
        }
    }
}

impl WorkerOptions {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_drain_on_shutdown(mut self, enabled: bool) -> Self {
        self.drain_on_shutdown = enabled;
        self
    }

    pub fn with_failure_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&LoggerError) + Send + Sync + 'static,
    {
        self.on_failure = Arc::new(hook);
        self
    }
}

impl fmt::Debug for WorkerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerOptions")
            .field("interval", &self.interval)
            .field("drain_on_shutdown", &self.drain_on_shutdown)
            .field("thread_name", &self.thread_name)
            .finish_non_exhaustive()
    }
}

/// Counters describing what a worker has done so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub cycles: u64,
    pub lines_written: u64,
    pub failures: u64,
    pub last_failure: Option<String>,
}

#[derive(Default)]
struct StatsCell {
    cycles: AtomicU64,
    lines_written: AtomicU64,
    failures: AtomicU64,
    last_failure: Mutex<Option<String>>,
}

impl StatsCell {
    fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            cycles: self.cycles.load(Ordering::Acquire),
            lines_written: self.lines_written.load(Ordering::Acquire),
            failures: self.failures.load(Ordering::Acquire),
            last_failure: self.last_failure.lock().clone(),
        }
    }
}

/// Handle to a running drain thread.
///
/// Dropping the handle stops the thread the same way [`DrainWorker::shutdown`]
/// does.
pub struct DrainWorker {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<StatsCell>,
}

impl DrainWorker {
    /// Start draining `buffer` into `sink` on a new thread.
    pub fn spawn<S>(
        buffer: Arc<BoundedRingBuffer<String>>,
        sink: S,
        options: WorkerOptions,
    ) -> Result<Self>
    where
        S: LineSink + 'static,
    {
        if options.interval.is_zero() {
            return Err(LoggerError::InvalidConfig(
                "drain interval must be non-zero".to_string(),
            ));
        }

        let (stop_tx, stop_rx) = channel::bounded(1);
        let stats = Arc::new(StatsCell::default());
        let thread_name = options.thread_name.clone();

        let mut drain = DrainLoop {
            buffer,
            sink,
            interval: options.interval,
            drain_on_shutdown: options.drain_on_shutdown,
            on_failure: options.on_failure,
            stats: Arc::clone(&stats),
        };

        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || drain.run(stop_rx))
            .map_err(LoggerError::Spawn)?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            stats,
        })
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Signal the worker, wait for any in-flight cycle (and the final drain,
    /// if enabled) to finish, and join the thread.
    pub fn shutdown(mut self) -> WorkerStats {
        self.stop();
        self.stats.snapshot()
    }

    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // A full or disconnected channel means the signal is already there.
            let _ = stop_tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Drain worker thread panicked");
            }
        }
    }
}

impl Drop for DrainWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for DrainWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrainWorker")
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish()
    }
}

/// State owned by the worker thread.
struct DrainLoop<S> {
    buffer: Arc<BoundedRingBuffer<String>>,
    sink: S,
    interval: Duration,
    drain_on_shutdown: bool,
    on_failure: FailureHook,
    stats: Arc<StatsCell>,
}

impl<S: LineSink> DrainLoop<S> {
    fn run(&mut self, stop: Receiver<()>) {
        info!(
            "Drain worker started (sink: {}, interval: {:?})",
            self.sink.name(),
            self.interval
        );

        if let Err(e) = self.sink.reset() {
            self.report(e);
        }

        loop {
            match stop.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => self.cycle(),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if self.drain_on_shutdown {
            self.cycle();
        }

        info!(
            "Drain worker stopped ({} lines written, {} failures)",
            self.stats.lines_written.load(Ordering::Acquire),
            self.stats.failures.load(Ordering::Acquire)
        );
    }

    fn cycle(&mut self) {
        match self.drain_cycle() {
            Ok(0) => {}
            Ok(written) => debug!("Drained {} lines to {} sink", written, self.sink.name()),
            Err(e) => self.report(e),
        }
        self.stats.cycles.fetch_add(1, Ordering::AcqRel);
    }

    /// One bounded drain pass. The bound is the buffered count observed when
    /// the cycle starts; elements pushed meanwhile wait for the next cycle.
    fn drain_cycle(&mut self) -> Result<usize> {
        self.sink.open()?;

        let bound = self.buffer.buffered_count();
        let mut written = 0;
        for _ in 0..bound {
            let Some(line) = self.buffer.pop() else {
                break;
            };
            self.sink.append_line(&line)?;
            written += 1;
            self.stats.lines_written.fetch_add(1, Ordering::AcqRel);
        }

        self.sink.close()?;
        Ok(written)
    }

    fn report(&self, error: LoggerError) {
        error!("Drain cycle failed on {} sink: {}", self.sink.name(), error);
        self.stats.failures.fetch_add(1, Ordering::AcqRel);
        *self.stats.last_failure.lock() = Some(error.to_string());
        (self.on_failure)(&error);
    }
}
