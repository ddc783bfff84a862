use crate::{
    logger::LevelCounts,
    metrics::{format_latency, LatencyMetrics, ThroughputMetrics},
    ring_buffer::BufferSnapshot,
    utils::{format_duration, format_message_rate},
    worker::WorkerStats,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Parameters a stress run was executed with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub logger: String,
    pub capacity: usize,
    pub drain_interval: Duration,
    pub producers: usize,
    pub messages_per_producer: usize,
    pub sink_path: Option<PathBuf>,
}

/// Complete results of one stress run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResults {
    pub run_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub config: RunConfiguration,
    pub buffer: BufferSnapshot,
    pub worker: WorkerStats,
    pub levels: LevelCounts,
    pub push_latency: Option<LatencyMetrics>,
    pub throughput: ThroughputMetrics,
    pub summary: RunSummary,
    pub system_info: SystemInfo,
}

/// Delivery accounting derived from the buffer and worker counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_pushed: u64,
    pub lines_written: u64,
    pub still_buffered: u64,
    /// Overwritten in the ring or lost to a failed write
    pub lost: u64,
    pub sink_failures: u64,
}

impl RunSummary {
    pub fn from_counters(buffer: &BufferSnapshot, worker: &WorkerStats) -> Self {
        let still_buffered = buffer.buffered_count as u64;
        Self {
            total_pushed: buffer.total_pushed,
            lines_written: worker.lines_written,
            still_buffered,
            lost: buffer
                .total_pushed
                .saturating_sub(worker.lines_written + still_buffered),
            sink_failures: worker.failures,
        }
    }
}

/// System information for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
    pub version: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: num_cpus::get(),
            version: crate::VERSION.to_string(),
        }
    }
}

impl fmt::Display for RunResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "-----------------------------------------------------------------"
        )?;
        writeln!(f, "Run {} ({} logger)", self.run_id, self.config.logger)?;
        writeln!(f, "  Buffer:            {}", buffer_line(&self.buffer))?;
        writeln!(
            f,
            "  Drain Cycles:      {} ({} failures)",
            self.worker.cycles, self.worker.failures
        )?;
        writeln!(f, "  Pushed:            {}", self.summary.total_pushed)?;
        writeln!(f, "  Written:           {}", self.summary.lines_written)?;
        writeln!(f, "  Still Buffered:    {}", self.summary.still_buffered)?;
        writeln!(f, "  Lost:              {}", self.summary.lost)?;
        writeln!(
            f,
            "  Producer Rate:     {} over {}",
            format_message_rate(self.throughput.messages_per_second),
            format_duration(Duration::from_nanos(self.throughput.duration_ns))
        )?;
        if let Some(latency) = &self.push_latency {
            let percentiles: Vec<String> = latency
                .percentiles
                .iter()
                .map(|p| format!("p{}={}", p.percentile, format_latency(p.value_ns)))
                .collect();
            writeln!(
                f,
                "  Push Latency:      mean={} max={} {}",
                format_latency(latency.mean_ns as u64),
                format_latency(latency.max_ns),
                percentiles.join(" ")
            )?;
        }
        if let Some(failure) = &self.worker.last_failure {
            writeln!(f, "  Last Failure:      {}", failure)?;
        }
        write!(
            f,
            "-----------------------------------------------------------------"
        )
    }
}

fn buffer_line(snapshot: &BufferSnapshot) -> String {
    format!(
        "capacity={} buffered={} load={}%",
        snapshot.capacity, snapshot.buffered_count, snapshot.load_percentile
    )
}

/// Results manager for writing the JSON report
pub struct ResultsManager {
    output_file: Option<PathBuf>,
}

impl ResultsManager {
    pub fn new(output_file: Option<&Path>) -> Self {
        Self {
            output_file: output_file.map(Path::to_path_buf),
        }
    }

    /// Print the summary and, if configured, write the JSON report.
    pub fn finalize(&self, results: &RunResults) -> Result<()> {
        println!("{}", results);

        if let Some(output_file) = &self.output_file {
            let json = serde_json::to_string_pretty(results)?;
            std::fs::write(output_file, json)
                .with_context(|| format!("failed to write results to {:?}", output_file))?;
            info!("Results written to: {:?}", output_file);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ThroughputCalculator;
    use tempfile::NamedTempFile;

    fn sample_results() -> RunResults {
        let buffer = BufferSnapshot {
            capacity: 8,
            write_cursor: 3,
            read_cursor: 1,
            buffered_count: 2,
            load_percentile: 37,
            total_pushed: 20,
        };
        let worker = WorkerStats {
            cycles: 4,
            lines_written: 15,
            failures: 1,
            last_failure: Some("sink write failed: injected".to_string()),
        };
        RunResults {
            run_id: "test".to_string(),
            timestamp: chrono::Utc::now(),
            config: RunConfiguration {
                logger: "file".to_string(),
                capacity: 8,
                drain_interval: Duration::from_millis(100),
                producers: 2,
                messages_per_producer: 10,
                sink_path: None,
            },
            summary: RunSummary::from_counters(&buffer, &worker),
            buffer,
            worker,
            levels: LevelCounts::default(),
            push_latency: None,
            throughput: ThroughputCalculator::new().get_metrics(),
            system_info: SystemInfo::default(),
        }
    }

    #[test]
    fn test_summary_accounts_for_losses() {
        let results = sample_results();
        assert_eq!(
            results.summary,
            RunSummary {
                total_pushed: 20,
                lines_written: 15,
                still_buffered: 2,
                lost: 3,
                sink_failures: 1,
            }
        );
    }

    #[test]
    fn test_finalize_writes_json() {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = ResultsManager::new(Some(temp_file.path()));
        manager.finalize(&sample_results()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(temp_file.path()).unwrap()).unwrap();
        assert_eq!(json["summary"]["lost"], 3);
        assert_eq!(json["buffer"]["capacity"], 8);
    }

    #[test]
    fn test_display_mentions_last_failure() {
        let text = sample_results().to_string();
        assert!(text.contains("Lost:              3"));
        assert!(text.contains("sink write failed: injected"));
    }

    #[test]
    fn test_system_info_default() {
        let info = SystemInfo::default();
        assert!(!info.os.is_empty());
        assert!(info.cpu_cores > 0);
    }
}
