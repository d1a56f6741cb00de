//! slotgate: worker pool demonstration of the timed admission gate
//!
//! Spawns a configurable number of worker threads contending for a
//! fixed-capacity gate and reports how many were admitted, how many were
//! rejected at the timeout, and the peak concurrency observed.

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};

mod cli;
mod error;
mod workload;

use cli::Args;
use workload::WorkloadConfig;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging based on verbosity and quiet mode
    if args.quiet {
        // In quiet mode, only log errors
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::ERROR)
            .with_target(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(match args.verbose {
                0 => Level::INFO,
                1 => Level::DEBUG,
                _ => Level::TRACE,
            })
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(true)
            .finish();

        tracing::subscriber::set_global_default(subscriber)?;
    }

    if !args.quiet {
        info!("Starting slotgate v{}", env!("CARGO_PKG_VERSION"));
    }

    // Validate arguments
    args.validate()?;

    let config = WorkloadConfig {
        permits: args.permits,
        timeout: args.timeout(),
        workers: args.effective_workers(),
        hold: args.hold(),
    };

    let report = workload::run(&config)?;

    info!(
        "Run finished in {:?}: {} completed, {} rejected, peak concurrency {}",
        report.elapsed, report.completed, report.rejected, report.peak_concurrency
    );
    if report.rejected > 0 {
        warn!(
            "{} of {} workers could not be admitted within {:?}",
            report.rejected, config.workers, config.timeout
        );
    }

    Ok(())
}
