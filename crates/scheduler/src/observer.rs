//! Lifecycle observers.
//!
//! Every hook runs synchronously on the worker thread that triggered it, and
//! up to `worker_count` workers may call the same observer at once. Keep hooks
//! short; anything slow stalls the worker that called it.

use std::fmt;
use std::sync::Arc;

use taskman_core::Task;
use tracing::{debug, info, warn};

/// Index of a worker thread, in `0..worker_count`.
pub type WorkerId = usize;

/// Receives scheduler lifecycle events. Every method defaults to a no-op.
pub trait SchedulerObserver: Send + Sync {
    /// A task passed its dependency check and is about to run.
    fn on_task_start(&self, _task: &Task, _worker: WorkerId) {}

    /// A task finished and its name is in the done-list.
    fn on_task_stop(&self, _task: &Task, _worker: WorkerId) {}

    /// A task returned a negative status. Fires before `on_task_stop`.
    fn on_task_fail(&self, _task: &Task, _worker: WorkerId, _status: i32) {}

    /// A worker thread is up, before its first poll.
    fn on_worker_start(&self, _worker: WorkerId) {}

    /// A worker left its loop (stopped, or empty queue with `KILL_ON_EMPTY`).
    fn on_worker_stop(&self, _worker: WorkerId) {}
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SchedulerObserver for NoopObserver {}

/// Emits a `tracing` event per lifecycle hook.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl SchedulerObserver for LoggingObserver {
    fn on_task_start(&self, task: &Task, worker: WorkerId) {
        info!(worker, task = %task.name(), pool = %task.pool(), "task running");
    }

    fn on_task_stop(&self, task: &Task, worker: WorkerId) {
        info!(worker, task = %task.name(), "task finished");
    }

    fn on_task_fail(&self, task: &Task, worker: WorkerId, status: i32) {
        warn!(worker, task = %task.name(), status, "task failed");
    }

    fn on_worker_start(&self, worker: WorkerId) {
        debug!(worker, "worker started");
    }

    fn on_worker_stop(&self, worker: WorkerId) {
        debug!(worker, "worker stopped");
    }
}

type TaskHook = Box<dyn Fn(&Task, WorkerId) + Send + Sync>;
type FailHook = Box<dyn Fn(&Task, WorkerId, i32) + Send + Sync>;
type WorkerHook = Box<dyn Fn(WorkerId) + Send + Sync>;

/// Observer assembled from closures; unset hooks do nothing.
///
/// ```ignore
/// let observer = CallbackObserver::new()
///     .on_task_start(|t, w| println!("[{w}]: Task '{}' -> Running", t.name()))
///     .on_task_stop(|t, w| println!("[{w}]: Task '{}' -> Finished", t.name()));
/// scheduler.set_observer(Arc::new(observer));
/// ```
#[derive(Default)]
pub struct CallbackObserver {
    task_start: Option<TaskHook>,
    task_stop: Option<TaskHook>,
    task_fail: Option<FailHook>,
    worker_start: Option<WorkerHook>,
    worker_stop: Option<WorkerHook>,
}

impl CallbackObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_task_start(mut self, f: impl Fn(&Task, WorkerId) + Send + Sync + 'static) -> Self {
        self.task_start = Some(Box::new(f));
        self
    }

    pub fn on_task_stop(mut self, f: impl Fn(&Task, WorkerId) + Send + Sync + 'static) -> Self {
        self.task_stop = Some(Box::new(f));
        self
    }

    pub fn on_task_fail(
        mut self,
        f: impl Fn(&Task, WorkerId, i32) + Send + Sync + 'static,
    ) -> Self {
        self.task_fail = Some(Box::new(f));
        self
    }

    pub fn on_worker_start(mut self, f: impl Fn(WorkerId) + Send + Sync + 'static) -> Self {
        self.worker_start = Some(Box::new(f));
        self
    }

    pub fn on_worker_stop(mut self, f: impl Fn(WorkerId) + Send + Sync + 'static) -> Self {
        self.worker_stop = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for CallbackObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackObserver")
            .field("task_start", &self.task_start.is_some())
            .field("task_stop", &self.task_stop.is_some())
            .field("task_fail", &self.task_fail.is_some())
            .field("worker_start", &self.worker_start.is_some())
            .field("worker_stop", &self.worker_stop.is_some())
            .finish()
    }
}

impl SchedulerObserver for CallbackObserver {
    fn on_task_start(&self, task: &Task, worker: WorkerId) {
        if let Some(f) = &self.task_start {
            f(task, worker);
        }
    }

    fn on_task_stop(&self, task: &Task, worker: WorkerId) {
        if let Some(f) = &self.task_stop {
            f(task, worker);
        }
    }

    fn on_task_fail(&self, task: &Task, worker: WorkerId, status: i32) {
        if let Some(f) = &self.task_fail {
            f(task, worker, status);
        }
    }

    fn on_worker_start(&self, worker: WorkerId) {
        if let Some(f) = &self.worker_start {
            f(worker);
        }
    }

    fn on_worker_stop(&self, worker: WorkerId) {
        if let Some(f) = &self.worker_stop {
            f(worker);
        }
    }
}

/// Forwards every event to each member, in insertion order.
#[derive(Default, Clone)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn SchedulerObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn SchedulerObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn push(&mut self, observer: Arc<dyn SchedulerObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverSet")
            .field("len", &self.observers.len())
            .finish()
    }
}

impl SchedulerObserver for ObserverSet {
    fn on_task_start(&self, task: &Task, worker: WorkerId) {
        for o in &self.observers {
            o.on_task_start(task, worker);
        }
    }

    fn on_task_stop(&self, task: &Task, worker: WorkerId) {
        for o in &self.observers {
            o.on_task_stop(task, worker);
        }
    }

    fn on_task_fail(&self, task: &Task, worker: WorkerId, status: i32) {
        for o in &self.observers {
            o.on_task_fail(task, worker, status);
        }
    }

    fn on_worker_start(&self, worker: WorkerId) {
        for o in &self.observers {
            o.on_worker_start(worker);
        }
    }

    fn on_worker_stop(&self, worker: WorkerId) {
        for o in &self.observers {
            o.on_worker_stop(worker);
        }
    }
}
