use taskman_core::Task;
use tracing::trace;

use super::core::Shared;

/// Result of one attempt to take work off the queue.
pub(super) enum Pull {
    /// Head task whose dependency (if any) is done.
    Runnable(Task),
    /// Head task was waiting on an unfinished dependency and went back to the
    /// tail. `queued` is the queue length after the requeue.
    Blocked { queued: usize },
    Empty,
}

impl Shared {
    /// Pop the head task and gate it on its dependency.
    ///
    /// A blocked task is put back at the tail, so it loses its place every
    /// time it is polled. A dependency that never finishes keeps its task
    /// circulating forever.
    pub(super) fn pull(&self) -> Pull {
        let Some(task) = self.queue.dequeue() else {
            return Pull::Empty;
        };

        if self.dependency_met(&task) {
            return Pull::Runnable(task);
        }

        trace!(
            task = %task.name(),
            after = task.dependency().unwrap_or_default(),
            "dependency not done, requeueing"
        );
        let queued = self.queue.requeue(task);
        Pull::Blocked { queued }
    }

    /// Matches on name: any finished task with that name satisfies it.
    fn dependency_met(&self, task: &Task) -> bool {
        match task.dependency() {
            None => true,
            Some(after) => self.done.contains(after),
        }
    }
}
