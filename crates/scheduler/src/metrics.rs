use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use taskman_core::{Task, TaskId};

use crate::observer::{SchedulerObserver, WorkerId};

/// Scheduler operational metrics, keyed by task name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Total tasks executed by name.
    pub tasks_executed: HashMap<String, u64>,
    /// Tasks that returned a negative status, by name.
    pub tasks_failed: HashMap<String, u64>,
    /// Average task duration by task name.
    pub avg_task_duration: HashMap<String, Duration>,
    /// Last completion time by task name.
    pub last_run: HashMap<String, DateTime<Utc>>,
    /// Workers currently inside their loop.
    pub active_workers: usize,
    /// Workers that have exited their loop.
    pub stopped_workers: usize,
}

impl SchedulerMetrics {
    /// Record a task execution.
    pub fn record_execution(&mut self, task_name: &str, duration: Duration) {
        *self.tasks_executed.entry(task_name.to_string()).or_default() += 1;
        self.last_run.insert(task_name.to_string(), Utc::now());

        // Update rolling average duration
        let count = self.tasks_executed[task_name];
        let prev_avg = self
            .avg_task_duration
            .get(task_name)
            .copied()
            .unwrap_or_default();

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        let new_avg = if count == 1 {
            duration
        } else {
            let prev_nanos = prev_avg.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / count as f64;
            Duration::from_nanos(avg_nanos as u64)
        };

        self.avg_task_duration.insert(task_name.to_string(), new_avg);
    }

    pub fn record_failure(&mut self, task_name: &str) {
        *self.tasks_failed.entry(task_name.to_string()).or_default() += 1;
    }

    /// Total executions across every task name.
    pub fn total_executed(&self) -> u64 {
        self.tasks_executed.values().sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.tasks_failed.values().sum()
    }
}

/// Observer that aggregates [`SchedulerMetrics`].
///
/// Run time is measured from `on_task_start` to `on_task_stop`, matched by
/// task instance id so same-named tasks on different workers don't collide.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    metrics: Arc<RwLock<SchedulerMetrics>>,
    started: Mutex<HashMap<TaskId, Instant>>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of the current metrics.
    pub fn snapshot(&self) -> SchedulerMetrics {
        self.metrics.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Get an Arc to the metrics (for external reads without cloning).
    pub fn handle(&self) -> Arc<RwLock<SchedulerMetrics>> {
        Arc::clone(&self.metrics)
    }

    fn update(&self, f: impl FnOnce(&mut SchedulerMetrics)) {
        let mut metrics = self.metrics.write().unwrap_or_else(|p| p.into_inner());
        f(&mut metrics);
    }
}

impl SchedulerObserver for MetricsObserver {
    fn on_task_start(&self, task: &Task, _worker: WorkerId) {
        self.started
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(task.id(), Instant::now());
    }

    fn on_task_stop(&self, task: &Task, _worker: WorkerId) {
        let started = self
            .started
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&task.id());
        let duration = started.map(|s| s.elapsed()).unwrap_or_default();
        self.update(|m| m.record_execution(task.name(), duration));
    }

    fn on_task_fail(&self, task: &Task, _worker: WorkerId, _status: i32) {
        self.update(|m| m.record_failure(task.name()));
    }

    fn on_worker_start(&self, _worker: WorkerId) {
        self.update(|m| m.active_workers += 1);
    }

    fn on_worker_stop(&self, _worker: WorkerId) {
        self.update(|m| {
            m.active_workers = m.active_workers.saturating_sub(1);
            m.stopped_workers += 1;
        });
    }
}
