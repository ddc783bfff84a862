use anyhow::Result;
use parking_lot::Mutex;
use ringlog::error::{LoggerError, SinkOperation};
use ringlog::{BoundedRingBuffer, DrainWorker, LineSink, WorkerOptions};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sink whose first `failing_opens` opens and `failing_writes` writes fail.
#[derive(Clone, Default)]
struct UnreliableSink {
    failing_opens: Arc<AtomicUsize>,
    failing_writes: Arc<AtomicUsize>,
    lines: Arc<Mutex<Vec<String>>>,
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok()
}

fn injected(operation: SinkOperation, message: &str) -> LoggerError {
    LoggerError::Sink {
        operation,
        source: io::Error::new(io::ErrorKind::PermissionDenied, message.to_string()),
    }
}

impl LineSink for UnreliableSink {
    fn reset(&mut self) -> ringlog::Result<()> {
        Ok(())
    }

    fn open(&mut self) -> ringlog::Result<()> {
        if take_failure(&self.failing_opens) {
            return Err(injected(SinkOperation::Open, "sink locked"));
        }
        Ok(())
    }

    fn append_line(&mut self, line: &str) -> ringlog::Result<()> {
        if take_failure(&self.failing_writes) {
            return Err(injected(SinkOperation::Write, "disk full"));
        }
        self.lines.lock().push(line.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "unreliable"
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// A failed open is reported to the hook and the lines wait for the next cycle.
#[test]
fn failed_open_is_reported_and_lines_survive() -> Result<()> {
    let sink = UnreliableSink::default();
    sink.failing_opens.store(2, Ordering::SeqCst);

    let reported = Arc::new(Mutex::new(Vec::new()));
    let hook_reported = Arc::clone(&reported);
    let options = WorkerOptions::default()
        .with_interval(Duration::from_millis(10))
        .with_failure_hook(move |error| hook_reported.lock().push(error.to_string()));

    let buffer = Arc::new(BoundedRingBuffer::new(16)?);
    buffer.push("first".to_string());
    buffer.push("second".to_string());

    let worker = DrainWorker::spawn(Arc::clone(&buffer), sink.clone(), options)?;
    assert!(wait_until(Duration::from_secs(5), || sink.lines.lock().len() == 2));

    let stats = worker.shutdown();
    assert_eq!(*sink.lines.lock(), vec!["first", "second"]);
    assert_eq!(stats.failures, 2);
    assert_eq!(
        stats.last_failure.as_deref(),
        Some("sink open failed: sink locked")
    );

    let reported = reported.lock();
    assert_eq!(reported.len(), 2);
    assert!(reported.iter().all(|message| message.contains("open")));
    Ok(())
}

/// A failed write loses exactly the line being written; the rest of the
/// buffer is delivered by the next cycle.
#[test]
fn failed_write_loses_one_line_and_draining_resumes() -> Result<()> {
    let sink = UnreliableSink::default();
    sink.failing_writes.store(1, Ordering::SeqCst);

    let reported = Arc::new(Mutex::new(Vec::new()));
    let hook_reported = Arc::clone(&reported);
    let options = WorkerOptions::default()
        .with_interval(Duration::from_millis(10))
        .with_failure_hook(move |error| hook_reported.lock().push(error.to_string()));

    let buffer = Arc::new(BoundedRingBuffer::new(16)?);
    for line in ["lost", "kept-1", "kept-2"] {
        buffer.push(line.to_string());
    }

    let worker = DrainWorker::spawn(Arc::clone(&buffer), sink.clone(), options)?;
    assert!(wait_until(Duration::from_secs(5), || sink.lines.lock().len() == 2));
    assert!(worker.is_running());

    buffer.push("after".to_string());
    assert!(wait_until(Duration::from_secs(5), || sink.lines.lock().len() == 3));

    let stats = worker.shutdown();
    assert_eq!(*sink.lines.lock(), vec!["kept-1", "kept-2", "after"]);
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.lines_written, 3);
    assert_eq!(*reported.lock(), vec!["sink write failed: disk full"]);
    Ok(())
}
