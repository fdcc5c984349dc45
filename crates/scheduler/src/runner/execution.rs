use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use taskman_core::{Result, SchedulerError, Setting, Task};
use tracing::{debug, error, info};

use crate::observer::WorkerId;

use super::core::Shared;
use super::scheduling::Pull;
use super::Scheduler;

impl Scheduler {
    /// Block until every worker has left its loop.
    ///
    /// Workers leave when the scheduler is stopped, or, with `KILL_ON_EMPTY`,
    /// when they find the queue empty. Without either this blocks forever.
    /// Later calls return `Ok(())` at once.
    pub fn join(&self) -> Result<()> {
        let handle = self
            .coordinator
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        let Some(handle) = handle else {
            return Ok(());
        };

        match handle.join() {
            Ok(panicked) if panicked.is_empty() => {
                info!("Scheduler joined");
                Ok(())
            }
            Ok(panicked) => Err(SchedulerError::Panicked(format!(
                "workers {panicked:?}"
            ))),
            Err(_) => Err(SchedulerError::Panicked("coordinator".into())),
        }
    }
}

impl Shared {
    /// Coordinator body: spawn the workers, then join them all.
    /// Returns the ids of workers that panicked.
    pub(super) fn coordinate(self: Arc<Self>, worker_count: usize) -> Vec<WorkerId> {
        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let shared = Arc::clone(&self);
            let spawned = thread::Builder::new()
                .name(format!("taskman-worker-{id}"))
                .spawn(move || shared.run_worker(id));
            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(e) => error!(worker = id, error = %e, "failed to spawn worker"),
            }
        }
        debug!(workers = handles.len(), "coordinator spawned workers");

        let mut panicked = Vec::new();
        for (id, handle) in handles {
            if handle.join().is_err() {
                error!(worker = id, "worker panicked");
                panicked.push(id);
            }
        }
        panicked
    }

    /// Worker loop. Never spins: every idle path waits on the wake signal,
    /// bounded by `idle_backoff`.
    fn run_worker(&self, id: WorkerId) {
        debug!(worker = id, "Started");
        self.observer().on_worker_start(id);

        // Consecutive dependency misses. Once a whole queue's worth of tasks
        // is blocked, wait instead of rotating again.
        let mut misses = 0usize;
        // Generation at the start of the current rotation. A completion at any
        // point during the rotation moves past it and cuts the wait short.
        let mut rotation_seen = 0u64;

        loop {
            // Read before inspecting state so a concurrent change wakes the wait below.
            let seen = self.signal.generation();
            if misses == 0 {
                rotation_seen = seen;
            }

            if self.stopped.load(Ordering::Acquire) {
                break;
            }
            if self.paused.load(Ordering::Acquire) {
                self.signal.wait_past(seen, self.idle_backoff);
                continue;
            }

            match self.pull() {
                Pull::Runnable(task) => {
                    misses = 0;
                    self.execute(task, id);
                }
                Pull::Blocked { queued } => {
                    misses += 1;
                    if misses >= queued {
                        misses = 0;
                        self.signal.wait_past(rotation_seen, self.idle_backoff);
                    }
                }
                Pull::Empty => {
                    misses = 0;
                    if self.setting(Setting::KillOnEmpty) {
                        break;
                    }
                    self.signal.wait_past(seen, self.idle_backoff);
                }
            }
        }

        self.observer().on_worker_stop(id);
        debug!(worker = id, "Stopped");
    }

    /// Run one task and publish its result. No lock is held while the
    /// executable or any hook runs.
    fn execute(&self, mut task: Task, id: WorkerId) {
        let observer = self.observer();
        observer.on_task_start(&task, id);

        let outcome = task.run();
        if outcome.is_failure() {
            observer.on_task_fail(&task, id, outcome.status);
        }

        self.store
            .record(task.pool(), task.sequence_id(), outcome.value);
        self.done.push(task.name());
        self.signal.notify();

        observer.on_task_stop(&task, id);
    }
}
