//! Timed semaphore for blocking threads
//!
//! Provides an admission gate that lets at most N threads hold a permit at
//! once, queues the rest in arrival order, and bounds how long any of them
//! may wait. A thread that cannot be admitted within the configured budget
//! gets a typed [`TimeoutError`] instead of hanging.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use timed_sync::TimedSemaphore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // At most 8 holders, each caller waits at most 2 seconds
//! let gate = TimedSemaphore::new(8, Duration::from_secs(2))?;
//!
//! // Acquire a permit before starting work
//! let permit = gate.acquire()?;
//!
//! // Do work while holding the permit
//! // ...
//!
//! // Permit automatically released when dropped
//! drop(permit);
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error returned when constructing a semaphore with no permits.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("semaphore capacity must be at least one permit")]
pub struct CapacityError;

/// Error returned by [`TimedSemaphore::acquire`] when no permit became
/// available within the configured wait budget.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no permit became available within {timeout:?}")]
pub struct TimeoutError {
    timeout: Duration,
}

impl TimeoutError {
    /// The wait budget that was exhausted.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// A FIFO-fair admission gate with a bounded wait time
///
/// The semaphore maintains a fixed number of permits that must be acquired
/// before performing an operation. When all permits are in use, `acquire()`
/// blocks the calling thread until a permit frees up or the configured
/// timeout elapses, whichever comes first.
///
/// # Design
///
/// - **Count plus wait queue**: admission is tracked by a plain holder
///   count; a separate FIFO queue of tickets orders only the threads that
///   are still waiting. A thread that passes the capacity check never
///   waits again for a queue position.
/// - **FIFO admission**: a waiter is admitted only when capacity is free
///   *and* its ticket is at the head of the queue; newcomers never barge
///   past an existing waiter.
/// - **Bounded wait**: the elapsed wait is accumulated across wake-ups, so
///   spurious wake-ups never extend the budget.
/// - **RAII permits**: [`SemaphorePermit`] releases on drop, on every exit
///   path.
/// - **Cloneable**: backed by an `Arc`, so clones share one gate.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use timed_sync::TimedSemaphore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let gate = TimedSemaphore::new(3, Duration::from_secs(5))?;
///
/// let handles: Vec<_> = (0..5)
///     .map(|i| {
///         let gate = gate.clone();
///         std::thread::spawn(move || {
///             // Only 3 workers run this section concurrently
///             let _permit = gate.acquire()?;
///             println!("worker {i} admitted");
///             Ok::<(), timed_sync::TimeoutError>(())
///         })
///     })
///     .collect();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TimedSemaphore {
    /// Shared state between all clones of this semaphore
    inner: Arc<SemaphoreInner>,
}

/// Internal shared state for the semaphore
struct SemaphoreInner {
    /// Maximum concurrent holders, fixed at construction
    max_permits: usize,
    /// Wait budget per `acquire` call, fixed at construction
    timeout: Duration,
    /// Holder count and waiter queue, guarded by one lock
    state: Mutex<State>,
    /// Signalled on every release and on every withdrawn ticket
    slot_freed: Condvar,
}

/// Mutable state behind the lock
struct State {
    /// Permits currently handed out; never exceeds `max_permits`
    admitted: usize,
    /// Tickets of blocked callers, in arrival order
    waiters: VecDeque<u64>,
    /// Next ticket to hand out; tickets are never reused
    next_ticket: u64,
}

impl TimedSemaphore {
    /// Create a new semaphore with the given number of permits and wait budget
    ///
    /// A `timeout` of zero means "admit immediately or fail immediately":
    /// `acquire` never blocks on such a gate.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError`] if `permits` is zero; a gate nobody can
    /// enter is a configuration bug, not a usable semaphore.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use timed_sync::TimedSemaphore;
    ///
    /// let gate = TimedSemaphore::new(1024, Duration::from_secs(5)).unwrap();
    /// assert_eq!(gate.available_permits(), 1024);
    ///
    /// assert!(TimedSemaphore::new(0, Duration::from_secs(5)).is_err());
    /// ```
    pub fn new(permits: usize, timeout: Duration) -> Result<Self, CapacityError> {
        if permits == 0 {
            return Err(CapacityError);
        }
        Ok(Self {
            inner: Arc::new(SemaphoreInner {
                max_permits: permits,
                timeout,
                state: Mutex::new(State {
                    admitted: 0,
                    waiters: VecDeque::new(),
                    next_ticket: 0,
                }),
                slot_freed: Condvar::new(),
            }),
        })
    }

    /// Acquire a permit, blocking until one is available or the budget elapses
    ///
    /// Returns a [`SemaphorePermit`] that releases the permit when dropped.
    /// Waiters are admitted in arrival order: a caller that began waiting
    /// earlier is admitted no later than one that arrived afterwards.
    ///
    /// The wait is measured from the moment `acquire` is invoked and
    /// accumulated across wake cycles, so no caller ever blocks longer than
    /// the configured timeout in total.
    ///
    /// # Errors
    ///
    /// Returns [`TimeoutError`] if the gate stayed full for the whole
    /// budget. A timed-out call leaves no trace: the caller is admitted
    /// nowhere and the remaining waiters are unaffected.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::time::Duration;
    /// use timed_sync::TimedSemaphore;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let gate = TimedSemaphore::new(10, Duration::from_millis(500))?;
    ///
    /// let permit = gate.acquire()?;
    /// // Do work...
    /// drop(permit); // Release permit
    /// # Ok(())
    /// # }
    /// ```
    pub fn acquire(&self) -> Result<SemaphorePermit, TimeoutError> {
        let inner = &self.inner;
        let mut state = inner.state.lock().unwrap_or_else(PoisonError::into_inner);

        // Fast path: free capacity and nobody queued ahead of us.
        if state.admitted < inner.max_permits && state.waiters.is_empty() {
            state.admitted += 1;
            return Ok(SemaphorePermit {
                semaphore: self.clone(),
            });
        }

        // Zero budget: fail without ever joining the queue.
        if inner.timeout.is_zero() {
            return Err(TimeoutError {
                timeout: inner.timeout,
            });
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiters.push_back(ticket);
        let started = Instant::now();

        loop {
            // Admission requires both a free slot and being first in line.
            if state.admitted < inner.max_permits && state.waiters.front() == Some(&ticket) {
                state.waiters.pop_front();
                state.admitted += 1;
                return Ok(SemaphorePermit {
                    semaphore: self.clone(),
                });
            }

            let waited = started.elapsed();
            if waited >= inner.timeout {
                // Withdraw the ticket from wherever it sits. The head may
                // have changed, so wake the others to re-check.
                if let Some(pos) = state.waiters.iter().position(|&t| t == ticket) {
                    let _ = state.waiters.remove(pos);
                }
                inner.slot_freed.notify_all();
                return Err(TimeoutError {
                    timeout: inner.timeout,
                });
            }

            // Sleep for the remaining budget; re-check on every wake-up,
            // spurious or not.
            let (guard, _) = inner
                .slot_freed
                .wait_timeout(state, inner.timeout - waited)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    /// Try to acquire a permit without waiting
    ///
    /// Returns `Some(SemaphorePermit)` only if a permit is free *and* no
    /// other caller is queued ahead; queue-jumping past existing waiters
    /// is never allowed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use timed_sync::TimedSemaphore;
    ///
    /// let gate = TimedSemaphore::new(1, Duration::from_secs(1)).unwrap();
    ///
    /// let permit1 = gate.try_acquire();
    /// assert!(permit1.is_some());
    ///
    /// let permit2 = gate.try_acquire();
    /// assert!(permit2.is_none()); // No permits left
    /// ```
    #[must_use]
    pub fn try_acquire(&self) -> Option<SemaphorePermit> {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if state.admitted < self.inner.max_permits && state.waiters.is_empty() {
            state.admitted += 1;
            Some(SemaphorePermit {
                semaphore: self.clone(),
            })
        } else {
            None
        }
    }

    /// Get the number of available permits
    ///
    /// Useful for monitoring and debugging but not for decisions: the
    /// value may change immediately after reading.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        let state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.max_permits - state.admitted
    }

    /// Get the maximum number of permits (configured limit)
    #[must_use]
    pub fn max_permits(&self) -> usize {
        self.inner.max_permits
    }

    /// Get the number of permits currently in use (max - available)
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use timed_sync::TimedSemaphore;
    ///
    /// let gate = TimedSemaphore::new(100, Duration::from_secs(1)).unwrap();
    /// let _permit = gate.try_acquire().unwrap();
    /// assert_eq!(gate.in_use(), 1);
    /// ```
    #[must_use]
    pub fn in_use(&self) -> usize {
        let state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.admitted
    }

    /// Get the number of callers currently blocked waiting for a permit
    #[must_use]
    pub fn waiting(&self) -> usize {
        let state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.waiters.len()
    }

    /// Get the configured wait budget
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Release a permit (called internally by `SemaphorePermit::drop`)
    fn release(&self) {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.admitted = state.admitted.saturating_sub(1);

        // Wake every waiter; each re-checks eligibility itself and only
        // the queue head can take the freed slot.
        self.inner.slot_freed.notify_all();
    }
}

/// RAII guard that releases a semaphore permit on drop
///
/// Returned by [`TimedSemaphore::acquire`] and
/// [`TimedSemaphore::try_acquire`]. Dropping the guard releases the permit
/// and wakes the waiting threads, so a permit is released exactly once per
/// successful acquisition on every exit path, including panics in the
/// protected section.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use timed_sync::TimedSemaphore;
///
/// let gate = TimedSemaphore::new(10, Duration::from_secs(1)).unwrap();
///
/// {
///     let permit = gate.try_acquire().unwrap();
///     // Permit is held here
/// } // Permit released automatically when scope ends
///
/// assert_eq!(gate.available_permits(), 10);
/// ```
pub struct SemaphorePermit {
    /// Reference to the semaphore that issued this permit
    semaphore: TimedSemaphore,
}

impl Drop for SemaphorePermit {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::Barrier;
    use std::thread;

    /// Spin until the gate reports `n` queued waiters.
    fn wait_for_waiters(gate: &TimedSemaphore, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while gate.waiting() < n {
            assert!(Instant::now() < deadline, "waiters never queued up");
            thread::yield_now();
        }
    }

    #[test]
    fn test_new() {
        let gate = TimedSemaphore::new(100, Duration::from_secs(1)).unwrap();
        assert_eq!(gate.available_permits(), 100);
        assert_eq!(gate.max_permits(), 100);
        assert_eq!(gate.in_use(), 0);
        assert_eq!(gate.waiting(), 0);
        assert_eq!(gate.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_capacity_is_construction_error() {
        let result = TimedSemaphore::new(0, Duration::from_secs(1));
        assert_eq!(result.err(), Some(CapacityError));
    }

    #[test]
    fn test_try_acquire() {
        let gate = TimedSemaphore::new(2, Duration::from_secs(1)).unwrap();

        let permit1 = gate.try_acquire();
        assert!(permit1.is_some());
        assert_eq!(gate.available_permits(), 1);
        assert_eq!(gate.in_use(), 1);

        let permit2 = gate.try_acquire();
        assert!(permit2.is_some());
        assert_eq!(gate.available_permits(), 0);
        assert_eq!(gate.in_use(), 2);

        // Third must fail, gate is full
        assert!(gate.try_acquire().is_none());

        drop(permit1);
        assert_eq!(gate.available_permits(), 1);

        let permit4 = gate.try_acquire();
        assert!(permit4.is_some());
        assert_eq!(gate.available_permits(), 0);
    }

    #[test]
    fn test_permit_drop_releases() {
        let gate = TimedSemaphore::new(1, Duration::from_secs(1)).unwrap();

        {
            let _permit = gate.try_acquire().unwrap();
            assert_eq!(gate.available_permits(), 0);
        } // Permit dropped here

        assert_eq!(gate.available_permits(), 1);
    }

    #[test]
    fn test_release_admits_waiter_before_timeout() {
        // Scenario: capacity 1, generous budget. The waiter must be
        // admitted as soon as the holder releases, well under the budget.
        let gate = TimedSemaphore::new(1, Duration::from_millis(1000)).unwrap();
        let permit = gate.acquire().unwrap();

        let waiter = {
            let gate = gate.clone();
            thread::spawn(move || {
                let started = Instant::now();
                let result = gate.acquire();
                (result.is_ok(), started.elapsed())
            })
        };

        wait_for_waiters(&gate, 1);
        thread::sleep(Duration::from_millis(200));
        drop(permit);

        let (admitted, waited) = waiter.join().unwrap();
        assert!(admitted);
        assert!(
            waited < Duration::from_millis(1000),
            "admission took {waited:?}, expected well under the budget"
        );
    }

    #[test]
    fn test_timeout_when_holder_never_releases_in_time() {
        // Scenario: capacity 1, short budget, holder outlives it. The
        // waiter must fail at the budget, and the eventual release must
        // not retroactively admit the already-failed call.
        let gate = TimedSemaphore::new(1, Duration::from_millis(200)).unwrap();
        let permit = gate.acquire().unwrap();

        let waiter = {
            let gate = gate.clone();
            thread::spawn(move || {
                let started = Instant::now();
                let result = gate.acquire();
                (result, started.elapsed())
            })
        };

        let (result, waited) = waiter.join().unwrap();
        assert_eq!(
            result.map(|_| ()),
            Err(TimeoutError {
                timeout: Duration::from_millis(200)
            })
        );
        assert!(
            waited >= Duration::from_millis(200),
            "failed after only {waited:?}"
        );
        assert!(
            waited < Duration::from_secs(2),
            "failed only after {waited:?}, far past the budget"
        );

        // The failed caller left no trace
        assert_eq!(gate.waiting(), 0);
        drop(permit);
        assert_eq!(gate.available_permits(), 1);
    }

    #[test]
    fn test_capacity_three_admits_exactly_three_of_five() {
        let gate = TimedSemaphore::new(3, Duration::from_millis(200)).unwrap();
        let barrier = Arc::new(Barrier::new(5));
        let admitted = Arc::new(AtomicUsize::new(0));
        let rejected = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let gate = gate.clone();
                let barrier = Arc::clone(&barrier);
                let admitted = Arc::clone(&admitted);
                let rejected = Arc::clone(&rejected);
                thread::spawn(move || {
                    barrier.wait();
                    match gate.acquire() {
                        Ok(_permit) => {
                            admitted.fetch_add(1, Ordering::SeqCst);
                            // Hold past every loser's budget
                            thread::sleep(Duration::from_millis(600));
                        }
                        Err(_) => {
                            rejected.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 3);
        assert_eq!(rejected.load(Ordering::SeqCst), 2);
        assert_eq!(gate.available_permits(), 3);
    }

    #[test]
    fn test_holder_count_never_exceeds_capacity() {
        let gate = TimedSemaphore::new(4, Duration::from_secs(10)).unwrap();
        let current = Arc::new(AtomicUsize::new(0));
        let high_water = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = gate.clone();
                let current = Arc::clone(&current);
                let high_water = Arc::clone(&high_water);
                thread::spawn(move || {
                    for _ in 0..25 {
                        let _permit = gate.acquire().unwrap();
                        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                        high_water.fetch_max(now, Ordering::SeqCst);
                        thread::yield_now();
                        current.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(high_water.load(Ordering::SeqCst) <= 4);
        assert_eq!(gate.available_permits(), 4);
    }

    #[test]
    fn test_fifo_admission_order() {
        let gate = TimedSemaphore::new(1, Duration::from_secs(10)).unwrap();
        let permit = gate.acquire().unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        // Queue waiters one at a time so arrival order is deterministic
        let mut handles = Vec::new();
        for i in 0..4 {
            let gate_clone = gate.clone();
            let order = Arc::clone(&order);
            handles.push(thread::spawn(move || {
                let _permit = gate_clone.acquire().unwrap();
                order.lock().unwrap().push(i);
            }));
            wait_for_waiters(&gate, i + 1);
        }

        drop(permit);
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_release_frees_exactly_one_slot() {
        let gate = TimedSemaphore::new(1, Duration::from_secs(10)).unwrap();
        let permit = gate.acquire().unwrap();

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let stop_rx = Arc::new(Mutex::new(stop_rx));

        let handles: Vec<_> = (0..2)
            .map(|i| {
                let gate_clone = gate.clone();
                let stop_rx = Arc::clone(&stop_rx);
                let handle = thread::spawn(move || {
                    let _permit = gate_clone.acquire().unwrap();
                    // Hold until the test says otherwise
                    let _ = stop_rx.lock().unwrap().recv();
                });
                wait_for_waiters(&gate, i + 1);
                handle
            })
            .collect();

        drop(permit);

        // One freed slot admits exactly one of the two waiters
        thread::sleep(Duration::from_millis(200));
        assert_eq!(gate.in_use(), 1);
        assert_eq!(gate.waiting(), 1);

        drop(stop_tx);
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(gate.available_permits(), 1);
    }

    #[test]
    fn test_zero_timeout_admits_or_fails_immediately() {
        let gate = TimedSemaphore::new(1, Duration::ZERO).unwrap();

        // Free capacity: admitted without blocking
        let permit = gate.acquire().unwrap();

        // Full gate: immediate failure, no wait
        let started = Instant::now();
        assert!(gate.acquire().is_err());
        assert!(started.elapsed() < Duration::from_millis(100));

        drop(permit);
        assert!(gate.acquire().is_ok());
    }

    #[test]
    fn test_clone_shares_the_gate() {
        let gate = TimedSemaphore::new(10, Duration::from_secs(1)).unwrap();
        let gate2 = gate.clone();

        let permit1 = gate.try_acquire().unwrap();
        assert_eq!(gate2.available_permits(), 9);

        let permit2 = gate2.try_acquire().unwrap();
        assert_eq!(gate.available_permits(), 8);

        drop(permit1);
        drop(permit2);
        assert_eq!(gate.available_permits(), 10);
    }

    #[test]
    fn test_timeout_error_reports_budget() {
        let gate = TimedSemaphore::new(1, Duration::ZERO).unwrap();
        let _permit = gate.acquire().unwrap();

        let err = gate.acquire().err().expect("gate should be full");
        assert_eq!(err.timeout(), Duration::ZERO);
        assert!(err.to_string().contains("no permit became available"));
    }
}
