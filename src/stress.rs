//! # Stress Runner
//!
//! Drives one logger adapter with many concurrent producers and collects
//! what happened to every message.
//!
//! ## Execution Lifecycle
//!
//! 1. **Initialization**: build the selected logger (its drain worker starts)
//! 2. **Production**: each producer runs on a blocking thread and pushes its
//!    messages, timing every push with an HDR histogram
//! 3. **Interruption**: ctrl-c stops the producers early; the run still
//!    completes normally
//! 4. **Shutdown**: the logger is shut down (final drain unless disabled) and
//!    buffer, worker and latency figures are assembled into [`RunResults`]

use crate::{
    cli::{Args, LoggerKind},
    config::LoggerConfig,
    logger::{BufferedLog, ConsoleLogger, FileLogger, Level, PipelineLogger},
    metrics::{LatencyCollector, ThroughputCalculator},
    results::{RunConfiguration, RunResults, RunSummary, SystemInfo},
    sink::ConsoleSink,
};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Percentiles reported for push latency
pub const PERCENTILES: [f64; 4] = [50.0, 95.0, 99.0, 99.9];

/// Orchestrates one stress run.
pub struct StressRunner {
    kind: LoggerKind,
    config: LoggerConfig,
    producers: usize,
    messages_per_producer: usize,
    send_delay: Option<Duration>,
}

impl StressRunner {
    pub fn from_args(args: &Args) -> Result<Self> {
        let config = LoggerConfig::from(args);
        config.validate().context("invalid logger configuration")?;

        let producers = args.producer_count();
        crate::utils::validate_producers(producers)?;

        Ok(Self {
            kind: args.logger,
            config,
            producers,
            messages_per_producer: args.messages,
            send_delay: args.send_delay,
        })
    }

    fn build_logger(&self) -> Result<Arc<dyn BufferedLog>> {
        let options = self.config.worker_options();
        let logger: Arc<dyn BufferedLog> = match self.kind {
            LoggerKind::File => Arc::new(
                FileLogger::with_options(&self.config, options).with_context(|| {
                    format!("failed to start file logger on {:?}", self.config.sink_path)
                })?,
            ),
            LoggerKind::Console => Arc::new(ConsoleLogger::with_sink(
                ConsoleSink::stdout(),
                &self.config,
                options,
            )?),
            LoggerKind::Pipeline => Arc::new(PipelineLogger::with_sink(
                ConsoleSink::stdout(),
                &self.config,
                options,
            )?),
        };
        Ok(logger)
    }

    /// Execute the run and return its results.
    pub async fn run(&self) -> Result<RunResults> {
        info!(
            "Starting {} producers x {} messages against the {} logger (capacity {})",
            self.producers, self.messages_per_producer, self.kind, self.config.capacity
        );

        let logger = self.build_logger()?;
        let stop = Arc::new(AtomicBool::new(false));
        let mut throughput = ThroughputCalculator::new();

        let mut tasks = Vec::with_capacity(self.producers);
        for producer_id in 0..self.producers {
            let logger = Arc::clone(&logger);
            let stop = Arc::clone(&stop);
            let messages = self.messages_per_producer;
            let delay = self.send_delay;
            tasks.push(tokio::task::spawn_blocking(move || {
                produce(producer_id, logger.as_ref(), messages, delay, &stop)
            }));
        }

        let joined = async {
            let mut collectors = Vec::with_capacity(tasks.len());
            for task in tasks {
                collectors.push(task.await.context("producer task panicked")??);
            }
            Ok::<_, anyhow::Error>(collectors)
        };
        tokio::pin!(joined);

        let collectors = tokio::select! {
            result = &mut joined => result?,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping producers");
                stop.store(true, Ordering::Relaxed);
                (&mut joined).await?
            }
        };

        let mut latency = LatencyCollector::new()?;
        for collector in &collectors {
            latency.merge(collector)?;
        }
        throughput.record_messages(latency.sample_count());
        let throughput = throughput.get_metrics();

        debug!("Producers finished, shutting down logger");
        let shutdown_logger = Arc::clone(&logger);
        let worker = tokio::task::spawn_blocking(move || shutdown_logger.shutdown())
            .await
            .context("logger shutdown panicked")?;

        let pipeline = logger.pipeline();
        let buffer = pipeline.buffer().snapshot();
        let push_latency = (latency.sample_count() > 0).then(|| latency.get_metrics(&PERCENTILES));

        Ok(RunResults {
            run_id: crate::utils::generate_run_id(),
            timestamp: chrono::Utc::now(),
            config: RunConfiguration {
                logger: self.kind.to_string(),
                capacity: self.config.capacity,
                drain_interval: self.config.drain_interval,
                producers: self.producers,
                messages_per_producer: self.messages_per_producer,
                sink_path: (self.kind == LoggerKind::File).then(|| self.config.sink_path.clone()),
            },
            summary: RunSummary::from_counters(&buffer, &worker),
            buffer,
            worker,
            levels: pipeline.counters().snapshot(),
            push_latency,
            throughput,
            system_info: SystemInfo::default(),
        })
    }
}

/// Push `messages` lines, cycling through every level, timing each push.
fn produce(
    producer_id: usize,
    logger: &dyn BufferedLog,
    messages: usize,
    delay: Option<Duration>,
    stop: &AtomicBool,
) -> Result<LatencyCollector> {
    let mut collector = LatencyCollector::new()?;

    for seq in 0..messages {
        if stop.load(Ordering::Relaxed) {
            debug!("Producer {} stopped after {} messages", producer_id, seq);
            break;
        }

        let level = Level::ALL[seq % Level::ALL.len()];
        let text = format!("producer={} seq={}", producer_id, seq);

        let start = Instant::now();
        logger.log(level, &text);
        collector.record(start.elapsed())?;

        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }

    Ok(collector)
}
