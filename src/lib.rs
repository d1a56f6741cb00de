//! slotgate: bounded-concurrency admission gate with timed, FIFO-fair acquisition
//!
//! This library provides a thread-blocking semaphore that admits at most N
//! callers at a time, queues the rest in arrival order, and rejects any
//! caller that cannot be admitted within a configured timeout, plus a
//! worker-pool driver for exercising the gate under load.

pub mod cli;
pub mod error;
pub mod workload;

// Re-export commonly used types
pub use error::{GateError, Result};
pub use timed_sync::{CapacityError, SemaphorePermit, TimedSemaphore, TimeoutError};
pub use workload::{WorkloadConfig, WorkloadReport};
