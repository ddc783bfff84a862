use anyhow::Result;
use ringlog::{BufferedLog, FileLogger, Level, Log, LoggerConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const PRODUCERS: usize = 4;
const MESSAGES: usize = 250;

/// Nothing is lost while the ring is large enough, and every producer's lines
/// keep their relative order.
#[test]
fn concurrent_producers_lose_nothing_below_capacity() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("producers.log");
    let config = LoggerConfig::default()
        .with_sink_path(&path)
        .with_capacity(PRODUCERS * MESSAGES + 1)
        .with_drain_interval(Duration::from_millis(5));

    let logger = Arc::new(FileLogger::new(&config)?);
    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let logger = Arc::clone(&logger);
            std::thread::spawn(move || {
                for seq in 0..MESSAGES {
                    logger.log(Level::Info, &format!("producer={} seq={}", producer, seq));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("producer thread panicked");
    }

    let stats = logger.shutdown();
    assert_eq!(stats.lines_written, (PRODUCERS * MESSAGES) as u64);
    assert_eq!(logger.pipeline().counters().count(Level::Info), (PRODUCERS * MESSAGES) as u64);

    let content = std::fs::read_to_string(&path)?;
    assert_eq!(content.lines().count(), PRODUCERS * MESSAGES);
    for producer in 0..PRODUCERS {
        let tag = format!("producer={} ", producer);
        let sequence: Vec<usize> = content
            .lines()
            .filter_map(|line| line.split_once(&tag).map(|(_, rest)| rest))
            .filter_map(|rest| rest.strip_prefix("seq="))
            .map(|seq| seq.parse().expect("sequence number"))
            .collect();
        assert_eq!(sequence, (0..MESSAGES).collect::<Vec<_>>());
    }
    Ok(())
}
