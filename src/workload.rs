//! Worker pool driver exercising the admission gate
//!
//! Spawns a configurable number of worker threads that contend for a
//! [`TimedSemaphore`], hold a permit for a fixed duration, and release it
//! on the way out. Workers the gate rejects are counted rather than
//! retried; retry policy belongs to the caller, not the gate.

use crate::error::{GateError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use timed_sync::TimedSemaphore;
use tracing::{info, warn};

/// Configuration for a workload run
#[derive(Debug, Clone, Copy)]
pub struct WorkloadConfig {
    /// Maximum concurrent holders
    pub permits: usize,
    /// Admission budget per worker
    pub timeout: Duration,
    /// Worker threads to spawn
    pub workers: usize,
    /// How long each admitted worker holds its permit
    pub hold: Duration,
}

/// Summary of a completed workload run
#[derive(Debug, Clone, Copy)]
pub struct WorkloadReport {
    /// Workers that were admitted and finished their hold
    pub completed: usize,
    /// Workers rejected because the gate stayed full past their budget
    pub rejected: usize,
    /// Highest number of workers observed inside the gate at once
    pub peak_concurrency: usize,
    /// Wall-clock duration of the whole run
    pub elapsed: Duration,
}

/// Shared per-run counters updated by the workers
#[derive(Default)]
struct Counters {
    current: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
    rejected: AtomicUsize,
}

/// Run the workload: spawn the workers, let them contend for the gate,
/// wait for all of them, and gather the report
///
/// # Errors
///
/// Returns an error if the configuration names no workers, the gate
/// cannot be constructed (zero permits), a worker thread cannot be
/// spawned, or a worker panics.
pub fn run(config: &WorkloadConfig) -> Result<WorkloadReport> {
    if config.workers == 0 {
        return Err(GateError::InvalidConfig(
            "worker count must be at least 1".to_string(),
        ));
    }
    let gate = TimedSemaphore::new(config.permits, config.timeout)?;
    let counters = Arc::new(Counters::default());

    info!(
        "Spawning {} workers over a {}-permit gate (timeout {:?}, hold {:?})",
        config.workers, config.permits, config.timeout, config.hold
    );

    let started = Instant::now();
    let mut handles = Vec::with_capacity(config.workers);
    for id in 0..config.workers {
        let gate = gate.clone();
        let counters = Arc::clone(&counters);
        let hold = config.hold;
        let handle = thread::Builder::new()
            .name(format!("worker-{id}"))
            .spawn(move || run_worker(id, &gate, &counters, hold))?;
        handles.push(handle);
    }

    for handle in handles {
        if let Err(panic) = handle.join() {
            let msg = panic
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            return Err(GateError::WorkerPanicked(msg));
        }
    }

    let report = WorkloadReport {
        completed: counters.completed.load(Ordering::SeqCst),
        rejected: counters.rejected.load(Ordering::SeqCst),
        peak_concurrency: counters.peak.load(Ordering::SeqCst),
        elapsed: started.elapsed(),
    };

    debug_assert_eq!(gate.available_permits(), config.permits);
    Ok(report)
}

/// One worker's life: acquire, hold, release via permit drop
fn run_worker(id: usize, gate: &TimedSemaphore, counters: &Counters, hold: Duration) {
    match gate.acquire() {
        Ok(_permit) => {
            let now = counters.current.fetch_add(1, Ordering::SeqCst) + 1;
            counters.peak.fetch_max(now, Ordering::SeqCst);
            info!(worker = id, "acquired a permit");

            // Simulated protected work
            thread::sleep(hold);

            counters.current.fetch_sub(1, Ordering::SeqCst);
            counters.completed.fetch_add(1, Ordering::SeqCst);
            info!(worker = id, "released its permit");
        } // _permit dropped here, freeing the slot
        Err(e) => {
            counters.rejected.fetch_add(1, Ordering::SeqCst);
            warn!(worker = id, "rejected: {e}");
        }
    }
}
