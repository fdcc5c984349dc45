use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use taskman_core::Task;

/// FIFO of pending tasks behind a single lock.
///
/// The lock is held only for the duration of each call; a task popped by a
/// worker lives outside the queue until it is executed or requeued.
#[derive(Debug, Default)]
pub struct TaskQueue {
    inner: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Task>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Append at the tail.
    pub fn enqueue(&self, task: Task) {
        self.lock().push_back(task);
    }

    /// Remove the head, never blocking.
    pub fn dequeue(&self) -> Option<Task> {
        self.lock().pop_front()
    }

    /// Put a task that was already popped back at the tail.
    /// Returns the queue length including the requeued task.
    pub fn requeue(&self, task: Task) -> usize {
        let mut queue = self.lock();
        queue.push_back(task);
        queue.len()
    }

    /// Names of the queued tasks, head first.
    pub fn snapshot_names(&self) -> Vec<String> {
        self.lock().iter().map(|t| t.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Discard everything queued, returning how many tasks were dropped.
    pub fn drain(&self) -> usize {
        let mut queue = self.lock();
        let dropped = queue.len();
        queue.clear();
        dropped
    }
}
