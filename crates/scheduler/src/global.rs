//! Optional process-wide scheduler.
//!
//! Prefer constructing a [`Scheduler`] and passing it around. For hosts that
//! want one shared instance, [`instance`] builds it lazily under a lock and
//! builds a fresh one once the current instance has been stopped.
//!
//! Callers still holding an `Arc` to a stopped instance keep talking to that
//! old, detached scheduler. Nothing redirects them to the replacement.

use std::sync::{Arc, Mutex};

use taskman_core::{Result, SchedulerConfig};
use tracing::{info, warn};

use crate::runner::Scheduler;

static INSTANCE: Mutex<Option<Arc<Scheduler>>> = Mutex::new(None);

/// The shared scheduler, created from [`SchedulerConfig::from_env`] on first use
/// or after the previous one was stopped.
///
/// An invalid environment config falls back to the defaults with a warning.
pub fn instance() -> Result<Arc<Scheduler>> {
    let mut slot = INSTANCE.lock().unwrap_or_else(|p| p.into_inner());
    if let Some(existing) = slot.as_ref() {
        if !existing.is_stopped() {
            return Ok(Arc::clone(existing));
        }
        info!("shared scheduler was stopped, building a new one");
    }

    let config = SchedulerConfig::from_env().unwrap_or_else(|e| {
        warn!(error = %e, "invalid scheduler config in environment, using defaults");
        SchedulerConfig::default()
    });
    let scheduler = Arc::new(Scheduler::new(config)?);
    *slot = Some(Arc::clone(&scheduler));
    Ok(scheduler)
}

/// Stop the shared scheduler (if any) and forget it. Returns the old instance
/// so the caller can `join` it.
pub fn reset_instance() -> Option<Arc<Scheduler>> {
    let old = INSTANCE.lock().unwrap_or_else(|p| p.into_inner()).take();
    if let Some(scheduler) = &old {
        scheduler.stop();
    }
    old
}
