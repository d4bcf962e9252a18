//! Shutdown signalling for the worker.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A one-shot stop signal with interruptible sleeps.
///
/// The worker sleeps between handshake rounds and poll ticks through
/// [`ShutdownSignal::wait`], so triggering the signal ends the sleep at once.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    triggered: Mutex<bool>,
    cond: Condvar,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers the signal and wakes every waiter. Idempotent.
    pub fn trigger(&self) {
        *self.triggered.lock() = true;
        self.cond.notify_all();
    }

    /// Returns true once triggered.
    pub fn is_triggered(&self) -> bool {
        *self.triggered.lock()
    }

    /// Sleeps for `timeout` or until triggered. Returns true if triggered.
    ///
    /// A timeout past the representable range waits for the trigger alone.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut triggered = self.triggered.lock();
        while !*triggered {
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut triggered, deadline).timed_out() {
                        break;
                    }
                }
                None => self.cond.wait(&mut triggered),
            }
        }
        *triggered
    }
}
