//! # ringlog - Main Entry Point
//!
//! Stress driver for the bounded log buffer. It starts one logger adapter,
//! floods it from several producer threads and reports how many lines were
//! written, how many were still buffered and how many were overwritten.
//!
//! ## Flow
//!
//! 1. **Parse arguments** and install the diagnostic subscriber
//! 2. **Build the runner** from the validated configuration
//! 3. **Run** producers until they finish or ctrl-c arrives
//! 4. **Report** the summary table and the optional JSON file

use anyhow::Result;
use clap::Parser;
use ringlog::{cli::Args, logging::init_tracing, results::ResultsManager, stress::StressRunner};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Dropping the guard flushes pending diagnostics, so it lives until exit.
    let _guard = init_tracing(args.verbose);

    info!("Starting ringlog {}", ringlog::VERSION);
    info!("Configuration: {:?}", args);

    let runner = StressRunner::from_args(&args)?;
    let results = runner.run().await?;

    ResultsManager::new(args.output_file.as_deref()).finalize(&results)?;

    info!("ringlog completed");
    Ok(())
}
