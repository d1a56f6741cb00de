//! Command-line interface definitions

use anyhow::Result;
use clap::Parser;
use std::time::Duration;

/// Bounded-concurrency admission gate demo driver
#[derive(Parser, Debug)]
#[command(author, version, long_about = None)]
pub struct Args {
    /// Maximum number of workers admitted through the gate at once
    #[arg(long, default_value = "3")]
    pub permits: usize,

    /// Admission timeout in milliseconds
    ///
    /// A worker that cannot be admitted within this budget is rejected
    /// and counted in the final report. 0 means "admit immediately or
    /// reject immediately".
    #[arg(long, default_value = "5000")]
    pub timeout_ms: u64,

    /// Number of worker threads to spawn (0 = auto-detect)
    #[arg(long, default_value = "5")]
    pub workers: usize,

    /// How long each admitted worker holds its permit, in milliseconds
    #[arg(long, default_value = "2000")]
    pub hold_ms: u64,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Number of worker threads to spawn, resolving `0` to the CPU count
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    /// Admission timeout as a [`Duration`]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Permit hold time as a [`Duration`]
    #[must_use]
    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    /// Validate command-line arguments
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - Permits is zero or outside valid bounds (1-10000)
    /// - Worker count is outside valid bounds (auto-detect failed or >10000)
    /// - Both --quiet and --verbose options are used
    pub fn validate(&self) -> Result<()> {
        if self.permits == 0 {
            anyhow::bail!("Permits must be at least 1");
        }
        if self.permits > 10_000 {
            anyhow::bail!("Permits must be between 1 and 10000");
        }
        if self.effective_workers() == 0 {
            anyhow::bail!("No CPU cores available");
        }
        if self.effective_workers() > 10_000 {
            anyhow::bail!("Workers must be between 1 and 10000");
        }
        if self.quiet && self.verbose > 0 {
            anyhow::bail!("Cannot use both --quiet and --verbose options");
        }
        Ok(())
    }
}

#[cfg(test)]
impl Args {
    /// Create a test Args instance with default values (for testing)
    pub fn test_default() -> Self {
        Self {
            permits: 3,
            timeout_ms: 5000,
            workers: 5,
            hold_ms: 2000,
            verbose: 0,
            quiet: false,
        }
    }
}
