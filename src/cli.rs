use crate::config::LoggerConfig;
use crate::logger::Level;
use crate::utils::parse_duration;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// ringlog - stress the bounded log buffer and its drain worker
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Logger adapter to drive
    #[clap(short = 'l', long, value_enum, default_value_t = LoggerKind::File, help_heading = "Core Options")]
    pub logger: LoggerKind,

    /// Sink file for the file logger (truncated at startup)
    #[clap(short = 's', long, default_value = crate::defaults::SINK_PATH)]
    pub sink: PathBuf,

    /// Ring buffer capacity in slots
    #[clap(short = 'c', long, default_value_t = crate::defaults::CAPACITY)]
    pub capacity: usize,

    /// Time between drain cycles (e.g. "500ms", "1s")
    #[clap(short = 'i', long, value_parser = parse_duration, default_value = "1s")]
    pub interval: Duration,

    /// Number of producer threads (defaults to the CPU count)
    #[clap(short = 'p', long)]
    pub producers: Option<usize>,

    /// Messages pushed by each producer
    #[clap(short = 'n', long, default_value_t = crate::defaults::MESSAGES_PER_PRODUCER)]
    pub messages: usize,

    /// Pause between two pushes of the same producer
    #[clap(long, value_parser = parse_duration)]
    pub send_delay: Option<Duration>,

    /// Messages below this level are discarded
    #[clap(long, value_enum, default_value_t = Level::Debug)]
    pub level: Level,

    /// Skip the final drain when shutting down
    #[clap(long, default_value_t = false)]
    pub no_final_drain: bool,

    /// Write a JSON report of the run to this file
    #[clap(short = 'o', long)]
    pub output_file: Option<PathBuf>,

    /// Verbose diagnostics
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            logger: LoggerKind::File,
            sink: PathBuf::from(crate::defaults::SINK_PATH),
            capacity: crate::defaults::CAPACITY,
            interval: crate::defaults::DRAIN_INTERVAL,
            producers: None,
            messages: crate::defaults::MESSAGES_PER_PRODUCER,
            send_delay: None,
            level: Level::Debug,
            no_final_drain: false,
            output_file: None,
            verbose: false,
        }
    }
}

impl Args {
    /// Producer count, falling back to the number of CPU cores.
    pub fn producer_count(&self) -> usize {
        self.producers.unwrap_or_else(crate::utils::get_cpu_cores)
    }
}

impl From<&Args> for LoggerConfig {
    fn from(args: &Args) -> Self {
        LoggerConfig {
            sink_path: args.sink.clone(),
            capacity: args.capacity,
            drain_interval: args.interval,
            drain_on_shutdown: !args.no_final_drain,
            min_level: args.level,
        }
    }
}

/// Logger adapters selectable from the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum LoggerKind {
    /// Timestamped lines in a file
    #[clap(name = "file")]
    File,

    /// Coloured lines on stdout
    #[clap(name = "console")]
    Console,

    /// CI pipeline annotations on stdout
    #[clap(name = "pipeline")]
    Pipeline,
}

impl std::fmt::Display for LoggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoggerKind::File => write!(f, "file"),
            LoggerKind::Console => write!(f, "console"),
            LoggerKind::Pipeline => write!(f, "pipeline"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_command_line() {
        let args = Args::try_parse_from(["ringlog"]).unwrap();
        assert_eq!(args.logger, LoggerKind::File);
        assert_eq!(args.capacity, 2048);
        assert_eq!(args.interval, Duration::from_secs(1));
        assert!(args.producer_count() > 0);
    }

    #[test]
    fn test_parse_full_command_line() {
        let args = Args::try_parse_from([
            "ringlog", "-l", "pipeline", "-c", "64", "-i", "250ms", "-p", "3", "-n", "10",
            "--level", "warning", "--no-final-drain",
        ])
        .unwrap();

        assert_eq!(args.logger, LoggerKind::Pipeline);
        assert_eq!(args.producer_count(), 3);

        let config = LoggerConfig::from(&args);
        assert_eq!(config.capacity, 64);
        assert_eq!(config.drain_interval, Duration::from_millis(250));
        assert_eq!(config.min_level, Level::Warning);
        assert!(!config.drain_on_shutdown);
    }

    #[test]
    fn test_invalid_interval_is_rejected() {
        assert!(Args::try_parse_from(["ringlog", "-i", "soon"]).is_err());
    }

    #[test]
    fn test_logger_kind_display() {
        assert_eq!(LoggerKind::File.to_string(), "file");
        assert_eq!(LoggerKind::Console.to_string(), "console");
        assert_eq!(LoggerKind::Pipeline.to_string(), "pipeline");
    }
}
