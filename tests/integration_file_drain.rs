use anyhow::Result;
use ringlog::{BoundedRingBuffer, DrainWorker, FileSink, WorkerOptions};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
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

fn quiet(interval: Duration) -> WorkerOptions {
    WorkerOptions::default()
        .with_interval(interval)
        .with_failure_hook(|_| {})
}

/// `x`,`y` are drained by a regular cycle; a burst of five pushed right after
/// is cut down by the overwrite rule before it reaches the file.
#[test]
fn periodic_drain_then_burst_overwrite() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("drain.log");
    std::fs::write(&path, "left over from a previous run\n")?;

    let buffer = Arc::new(BoundedRingBuffer::new(4)?);
    let worker = DrainWorker::spawn(
        Arc::clone(&buffer),
        FileSink::new(&path),
        quiet(Duration::from_millis(250)),
    )?;

    buffer.push("x".to_string());
    buffer.push("y".to_string());
    assert!(wait_until(Duration::from_secs(5), || read_lines(&path).len() == 2));
    assert_eq!(read_lines(&path), vec!["x", "y"]);

    let burst = ["a", "b", "c", "d", "e"];
    for line in burst {
        buffer.push(line.to_string());
    }

    let stats = worker.shutdown();
    let lines = read_lines(&path);
    assert_eq!(&lines[..2], ["x", "y"]);

    // Whatever a cycle managed to drain mid-burst, the newest three always
    // survive and everything written keeps push order.
    let tail = &lines[2..];
    assert!(tail.len() >= 3 && tail.len() <= burst.len());
    assert_eq!(&tail[tail.len() - 3..], ["c", "d", "e"]);
    assert!(tail.iter().all(|line| burst.contains(&line.as_str())));
    assert!(tail.windows(2).all(|w| w[0] < w[1]));

    assert_eq!(stats.lines_written, lines.len() as u64);
    assert_eq!(stats.failures, 0);
    assert!(buffer.is_empty());
    Ok(())
}

/// Overflow between cycles keeps only the newest `capacity - 1` lines.
#[test]
fn overflow_between_cycles_keeps_newest_lines() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("overflow.log");

    let buffer = Arc::new(BoundedRingBuffer::new(4)?);
    let worker = DrainWorker::spawn(
        Arc::clone(&buffer),
        FileSink::new(&path),
        quiet(Duration::from_secs(3600)),
    )?;

    for line in ["a", "b", "c", "d", "e"] {
        buffer.push(line.to_string());
    }
    assert_eq!(buffer.buffered_count(), 3);
    assert_eq!(buffer.total_pushed(), 5);

    let stats = worker.shutdown();
    assert_eq!(read_lines(&path), vec!["c", "d", "e"]);
    assert_eq!(stats.lines_written, 3);
    Ok(())
}
