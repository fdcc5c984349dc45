//! Generation-counted wake signal for idle workers.
//!
//! Workers read the generation *before* checking shared state, then wait
//! for it to move. Any mutation that could make progress possible (new task,
//! finished task, flag change) bumps the generation, so a change made between
//! the check and the wait is never missed.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct WakeSignal {
    generation: Mutex<u64>,
    cv: Condvar,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        *self.lock()
    }

    /// Bump the generation and wake every waiter.
    pub fn notify(&self) {
        let mut generation = self.lock();
        *generation = generation.wrapping_add(1);
        drop(generation);
        self.cv.notify_all();
    }

    /// Block until the generation differs from `seen` or `timeout` elapses.
    /// Returns `true` if the generation moved.
    pub fn wait_past(&self, seen: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut generation = self.lock();
        while *generation == seen {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (guard, _) = self
                .cv
                .wait_timeout(generation, remaining)
                .unwrap_or_else(|p| p.into_inner());
            generation = guard;
        }
        true
    }
}
