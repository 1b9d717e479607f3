//! Bounded polling for sensor-driven waits.
//!
//! The control thread never blocks on a notification from the samplers; it
//! re-reads the latest published sample until a condition holds. `Poller`
//! puts a deadline and a cancellation check around that loop so a silent
//! sensor shows up as a `ScoutError::Timeout` instead of a hung thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{ScoutError, ScoutResult};

/// Shared stop flag for the control thread
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Deadline-bounded polling loop
#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    timeout: Duration,
    cancel: CancelToken,
}

impl Poller {
    pub fn new(interval: Duration, timeout: Duration, cancel: CancelToken) -> Self {
        Poller {
            interval,
            timeout,
            cancel,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Same poller with a different deadline
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Poller {
            timeout,
            ..self.clone()
        }
    }

    /// Evaluate `cond` until it returns true.
    pub fn wait_until<F>(&self, phase: &'static str, mut cond: F) -> ScoutResult<()>
    where
        F: FnMut() -> bool,
    {
        self.poll(phase, || if cond() { Some(()) } else { None })
    }

    /// Evaluate `probe` until it yields a value, returning that value.
    pub fn poll<T, F>(&self, phase: &'static str, mut probe: F) -> ScoutResult<T>
    where
        F: FnMut() -> Option<T>,
    {
        let started = Instant::now();
        loop {
            if self.cancel.is_cancelled() {
                return Err(ScoutError::Cancelled { phase });
            }
            if let Some(value) = probe() {
                return Ok(value);
            }
            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                log::warn!("{} gave up after {:?}", phase, elapsed);
                return Err(ScoutError::Timeout {
                    phase,
                    after: elapsed,
                });
            }
            if self.interval.is_zero() {
                thread::yield_now();
            } else {
                thread::sleep(self.interval);
            }
        }
    }
}
