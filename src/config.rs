use crate::error::{LoggerError, Result};
use crate::logger::Level;
use crate::worker::WorkerOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration shared by the buffered loggers
///
/// Only `sink_path` and `capacity` matter to the core; the remaining fields
/// tune the drain worker and the level filter in front of the buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Destination file for [`crate::FileLogger`]; ignored by console loggers
    pub sink_path: PathBuf,

    /// Number of ring buffer slots (at most `capacity - 1` lines are held)
    pub capacity: usize,

    /// Time between drain cycles
    pub drain_interval: Duration,

    /// Drain whatever is left when the logger shuts down
    pub drain_on_shutdown: bool,

    /// Messages below this level are discarded before buffering
    pub min_level: Level,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            sink_path: PathBuf::from(crate::defaults::SINK_PATH),
            capacity: crate::defaults::CAPACITY,
            drain_interval: crate::defaults::DRAIN_INTERVAL,
            drain_on_shutdown: true,
            min_level: Level::Debug,
        }
    }
}

impl LoggerConfig {
    pub fn with_sink_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.sink_path = path.into();
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval = interval;
        self
    }

    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Check the values before any thread is started.
    pub fn validate(&self) -> Result<()> {
        crate::utils::validate_capacity(self.capacity)?;
        crate::utils::validate_drain_interval(self.drain_interval)?;
        if self.sink_path.as_os_str().is_empty() {
            return Err(LoggerError::InvalidConfig(
                "sink path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Worker options derived from this configuration.
    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions::default()
            .with_interval(self.drain_interval)
            .with_drain_on_shutdown(self.drain_on_shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LoggerConfig::default();
        assert_eq!(config.capacity, 2048);
        assert_eq!(config.drain_interval, Duration::from_secs(1));
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(LoggerConfig::default().with_capacity(0).validate().is_err());
        assert!(LoggerConfig::default()
            .with_drain_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(LoggerConfig::default().with_sink_path("").validate().is_err());
    }

    #[test]
    fn test_config_json_round_trip_keeps_level() {
        let config = LoggerConfig::default().with_min_level(Level::Warning);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: LoggerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_worker_options_follow_config() {
        let config = LoggerConfig::default().with_drain_interval(Duration::from_millis(250));
        let options = config.worker_options();
        assert_eq!(options.interval, Duration::from_millis(250));
        assert!(options.drain_on_shutdown);
    }
}
