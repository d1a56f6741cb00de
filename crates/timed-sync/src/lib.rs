//! Blocking synchronization primitives with bounded wait times
//!
//! This crate provides thread-blocking synchronization primitives whose
//! wait times are always bounded by a configured timeout, so a contended
//! caller gets a typed failure instead of an indefinite hang.
//!
//! # Primitives
//!
//! - [`TimedSemaphore`] - FIFO-fair admission gate with a per-acquire wait budget
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use timed_sync::TimedSemaphore;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gate = TimedSemaphore::new(3, Duration::from_secs(5))?;
//!
//!     // Spawn many threads, but only 3 run the protected section at once
//!     let handles: Vec<_> = (0..5)
//!         .map(|i| {
//!             let gate = gate.clone();
//!             std::thread::spawn(move || match gate.acquire() {
//!                 Ok(_permit) => println!("worker {i} admitted"),
//!                 Err(e) => println!("worker {i} rejected: {e}"),
//!             })
//!         })
//!         .collect();
//!     for handle in handles {
//!         let _ = handle.join();
//!     }
//!     Ok(())
//! }
//! ```

mod semaphore;

pub use semaphore::{CapacityError, SemaphorePermit, TimedSemaphore, TimeoutError};
