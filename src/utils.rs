//! # Utility Functions and Helper Module
//!
//! Small helpers shared by the library and the `ringlog` binary.
//!
//! ## Key Functionality Categories
//!
//! - **Parsing**: Human-friendly duration strings (`"500ms"`, `"10s"`, `"5m"`)
//! - **Validation**: Capacity, interval and producer-count checks with clear
//!   error messages
//! - **Formatting**: Human-readable durations and message rates
//! - **System Information**: CPU count and run identifiers
//!
//! ## Usage Examples
//!
//! ```rust
//! use ringlog::utils::*;
//! use std::time::Duration;
//!
//! # fn main() -> ringlog::Result<()> {
//! assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
//! assert_eq!(format_duration(Duration::from_micros(1500)), "1.50ms");
//!
//! validate_capacity(2048)?; // OK
//! # Ok(())
//! # }
//! ```

use crate::error::{LoggerError, Result};
use std::time::Duration;
use uuid::Uuid;

/// Largest ring buffer accepted from configuration.
pub const MAX_CAPACITY: usize = 16 * 1024 * 1024;

/// Generate a unique identifier for a run
///
/// Used to tag JSON reports so results from concurrent or repeated runs can
/// be told apart.
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Parse duration from string (e.g., "10s", "5m", "1h", "500ms")
///
/// A bare number is taken as seconds. Fractional values are accepted for the
/// larger units (`"1.5m"` is ninety seconds).
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else {
        (s, "s") // Default to seconds
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;

    if !num.is_finite() || num < 0.0 {
        return Err(format!("Duration must be a non-negative number: {}", s));
    }

    let seconds = match unit {
        "ms" => num / 1000.0,
        "s" => num,
        "m" => num * 60.0,
        "h" => num * 3600.0,
        _ => return Err(format!("Invalid duration unit: {}", unit)),
    };

    Duration::try_from_secs_f64(seconds).map_err(|e| format!("Duration out of range: {}", e))
}

/// Validate a ring buffer capacity
///
/// ## Validation Rules
///
/// - **Minimum**: 1 slot. Note that a single slot never retains anything,
///   since the wrap rule keeps one slot free.
/// - **Maximum**: [`MAX_CAPACITY`] slots, to keep pre-allocation bounded
pub fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity < 1 {
        return Err(LoggerError::InvalidCapacity(capacity));
    }
    if capacity > MAX_CAPACITY {
        return Err(LoggerError::InvalidConfig(format!(
            "capacity {} is too large (maximum {})",
            capacity, MAX_CAPACITY
        )));
    }
    Ok(())
}

/// Validate the polling interval of the drain worker
///
/// A zero interval would turn the worker into a busy loop.
pub fn validate_drain_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(LoggerError::InvalidConfig(
            "drain interval must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Validate the number of producer threads for a stress run
pub fn validate_producers(producers: usize) -> Result<()> {
    if producers == 0 {
        return Err(LoggerError::InvalidConfig(
            "at least one producer is required".to_string(),
        ));
    }
    if producers > 1024 {
        return Err(LoggerError::InvalidConfig(format!(
            "producer count {} is too high (maximum 1024)",
            producers
        )));
    }
    Ok(())
}

/// Format a duration in a human-readable way
///
/// ## Unit Selection Logic
///
/// - **Nanoseconds**: < 1,000 ns (e.g., "500ns")
/// - **Microseconds**: < 1,000,000 ns (e.g., "1.50μs")
/// - **Milliseconds**: < 1,000,000,000 ns (e.g., "25.75ms")
/// - **Seconds**: < 60 seconds (e.g., "5.25s")
/// - **Minutes and Hours**: For longer durations (e.g., "5m 30s", "2h 15m 30s")
///
/// ## Examples
///
/// ```rust
/// # use ringlog::utils::format_duration;
/// # use std::time::Duration;
/// assert_eq!(format_duration(Duration::from_nanos(750)), "750ns");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ns = duration.as_nanos();

    if total_ns < 1_000 {
        format!("{}ns", total_ns)
    } else if total_ns < 1_000_000 {
        format!("{:.2}μs", total_ns as f64 / 1_000.0)
    } else if total_ns < 1_000_000_000 {
        format!("{:.2}ms", total_ns as f64 / 1_000_000.0)
    } else if total_ns < 60_000_000_000 {
        format!("{:.2}s", total_ns as f64 / 1_000_000_000.0)
    } else {
        let seconds = duration.as_secs();
        let minutes = seconds / 60;
        let remaining_seconds = seconds % 60;

        if minutes < 60 {
            format!("{}m {}s", minutes, remaining_seconds)
        } else {
            let hours = minutes / 60;
            let remaining_minutes = minutes % 60;
            format!("{}h {}m {}s", hours, remaining_minutes, remaining_seconds)
        }
    }
}

/// Convert nanoseconds to a human-readable duration string
pub fn format_duration_ns(ns: u64) -> String {
    format_duration(Duration::from_nanos(ns))
}

/// Format a message rate in a human-readable way
///
/// Uses decimal scaling (powers of 1000):
/// - Messages/sec: < 1,000 (e.g., "750 msg/s")
/// - Thousands: < 1,000,000 (e.g., "15.50K msg/s")
/// - Millions: ≥ 1,000,000 (e.g., "2.30M msg/s")
pub fn format_message_rate(messages_per_second: f64) -> String {
    if messages_per_second < 1000.0 {
        format!("{:.0} msg/s", messages_per_second)
    } else if messages_per_second < 1_000_000.0 {
        format!("{:.2}K msg/s", messages_per_second / 1000.0)
    } else {
        format!("{:.2}M msg/s", messages_per_second / 1_000_000.0)
    }
}

/// Get the number of logical CPU cores
///
/// Used as the default producer count of the stress binary.
pub fn get_cpu_cores() -> usize {
    num_cpus::get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("0.5s").unwrap(), Duration::from_millis(500));

        assert!(parse_duration("").is_err());
        assert!(parse_duration("invalid").is_err());
        assert!(parse_duration("-3s").is_err());
    }

    #[test]
    fn test_validate_capacity() {
        assert!(validate_capacity(1).is_ok());
        assert!(validate_capacity(2048).is_ok());
        assert!(matches!(
            validate_capacity(0),
            Err(LoggerError::InvalidCapacity(0))
        ));
        assert!(validate_capacity(MAX_CAPACITY + 1).is_err());
    }

    #[test]
    fn test_validate_drain_interval() {
        assert!(validate_drain_interval(Duration::from_millis(1)).is_ok());
        assert!(validate_drain_interval(Duration::ZERO).is_err());
    }

    #[test]
    fn test_validate_producers() {
        assert!(validate_producers(1).is_ok());
        assert!(validate_producers(0).is_err());
        assert!(validate_producers(1025).is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration_ns(500), "500ns");
        assert_eq!(format_duration_ns(1500), "1.50μs");
        assert_eq!(format_duration_ns(1_500_000), "1.50ms");
        assert_eq!(format_duration_ns(1_500_000_000), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn test_format_message_rate() {
        assert_eq!(format_message_rate(500.0), "500 msg/s");
        assert_eq!(format_message_rate(1500.0), "1.50K msg/s");
        assert_eq!(format_message_rate(1500000.0), "1.50M msg/s");
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(generate_run_id(), generate_run_id());
        assert!(get_cpu_cores() > 0);
    }
}
