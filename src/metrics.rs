use anyhow::Result;
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Push latency statistics including percentiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyMetrics {
    pub min_ns: u64,
    pub max_ns: u64,
    pub mean_ns: f64,
    pub std_dev_ns: f64,
    pub percentiles: Vec<PercentileValue>,
    pub total_samples: u64,
}

/// Percentile value pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub value_ns: u64,
}

/// Message rate achieved by the producers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThroughputMetrics {
    pub messages_per_second: f64,
    pub total_messages: u64,
    pub duration_ns: u64,
}

/// Latency collector using HDR histogram for accurate measurement
///
/// Each producer thread owns one collector; they are merged once the
/// producers have finished.
pub struct LatencyCollector {
    histogram: Histogram<u64>,
}

impl LatencyCollector {
    pub fn new() -> Result<Self> {
        // 3 significant figures, auto-resizing
        let histogram = Histogram::<u64>::new(3)?;
        Ok(Self { histogram })
    }

    /// Record a latency measurement
    pub fn record(&mut self, latency: Duration) -> Result<()> {
        // A zero sample is legal for very fast pushes; clamp to 1ns.
        let latency_ns = (latency.as_nanos() as u64).max(1);
        self.histogram.record(latency_ns)?;
        Ok(())
    }

    /// Fold another collector's samples into this one.
    pub fn merge(&mut self, other: &LatencyCollector) -> Result<()> {
        self.histogram.add(&other.histogram)?;
        Ok(())
    }

    pub fn sample_count(&self) -> u64 {
        self.histogram.len()
    }

    pub fn get_metrics(&self, percentiles: &[f64]) -> LatencyMetrics {
        let percentile_values = percentiles
            .iter()
            .map(|&p| PercentileValue {
                percentile: p,
                value_ns: self.histogram.value_at_percentile(p),
            })
            .collect();

        LatencyMetrics {
            min_ns: self.histogram.min(),
            max_ns: self.histogram.max(),
            mean_ns: self.histogram.mean(),
            std_dev_ns: self.histogram.stdev(),
            percentiles: percentile_values,
            total_samples: self.histogram.len(),
        }
    }
}

/// Throughput calculator for measuring message rates
pub struct ThroughputCalculator {
    start_time: Instant,
    message_count: u64,
}

impl Default for ThroughputCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl ThroughputCalculator {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            message_count: 0,
        }
    }

    pub fn record_messages(&mut self, count: u64) {
        self.message_count += count;
    }

    pub fn get_metrics(&self) -> ThroughputMetrics {
        let elapsed = self.start_time.elapsed();
        let duration_secs = elapsed.as_secs_f64();

        let messages_per_second = if duration_secs > 0.0 {
            self.message_count as f64 / duration_secs
        } else {
            0.0
        };

        ThroughputMetrics {
            messages_per_second,
            total_messages: self.message_count,
            duration_ns: elapsed.as_nanos() as u64,
        }
    }
}

/// Format latency value for human-readable output
pub fn format_latency(latency_ns: u64) -> String {
    crate::utils::format_duration_ns(latency_ns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_collector() {
        let mut collector = LatencyCollector::new().unwrap();

        collector.record(Duration::from_micros(1)).unwrap();
        collector.record(Duration::from_micros(2)).unwrap();
        collector.record(Duration::from_micros(3)).unwrap();

        let metrics = collector.get_metrics(&[50.0, 99.0]);
        assert_eq!(metrics.total_samples, 3);
        assert_eq!(metrics.percentiles.len(), 2);
        assert!(metrics.mean_ns > 0.0);
        assert!(metrics.min_ns <= metrics.max_ns);
    }

    #[test]
    fn test_merge_combines_samples() {
        let mut a = LatencyCollector::new().unwrap();
        let mut b = LatencyCollector::new().unwrap();
        a.record(Duration::from_nanos(100)).unwrap();
        b.record(Duration::from_nanos(200)).unwrap();
        b.record(Duration::ZERO).unwrap();

        a.merge(&b).unwrap();
        assert_eq!(a.sample_count(), 3);
    }

    #[test]
    fn test_throughput_calculator() {
        let mut calculator = ThroughputCalculator::new();
        calculator.record_messages(2);
        calculator.record_messages(3);

        let metrics = calculator.get_metrics();
        assert_eq!(metrics.total_messages, 5);
        assert!(metrics.messages_per_second >= 0.0);
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(500), "500ns");
        assert_eq!(format_latency(1500), "1.50μs");
    }
}
