//! Error handling and types

use thiserror::Error;

/// Admission gate and workload driver errors
#[derive(Error, Debug)]
pub enum GateError {
    /// Standard I/O error (thread spawning)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Gate constructed with an unusable capacity
    #[error("Invalid capacity: {0}")]
    Capacity(#[from] timed_sync::CapacityError),

    /// A caller could not be admitted within the configured budget
    #[error("Admission timed out: {0}")]
    Timeout(#[from] timed_sync::TimeoutError),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A worker thread terminated abnormally
    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),
}

pub type Result<T> = std::result::Result<T, GateError>;
