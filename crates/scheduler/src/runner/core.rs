use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use taskman_core::{Result, SchedulerConfig, SchedulerError, Setting, Settings, Task};
use tracing::{debug, info};

use crate::done::DoneList;
use crate::observer::{NoopObserver, SchedulerObserver, WorkerId};
use crate::queue::TaskQueue;
use crate::signal::WakeSignal;
use crate::store::{AllPools, PoolResults, PoolSequences, ResultStore};

/// State shared between the scheduler handle and its worker threads.
pub(super) struct Shared {
    pub(super) queue: TaskQueue,
    pub(super) done: DoneList,
    pub(super) store: ResultStore,
    pub(super) sequences: PoolSequences,
    pub(super) paused: AtomicBool,
    pub(super) stopped: AtomicBool,
    pub(super) settings: RwLock<Settings>,
    /// Bumped on every change that could unblock an idle worker.
    pub(super) signal: WakeSignal,
    pub(super) observer: RwLock<Arc<dyn SchedulerObserver>>,
    pub(super) idle_backoff: Duration,
}

impl Shared {
    pub(super) fn observer(&self) -> Arc<dyn SchedulerObserver> {
        Arc::clone(&self.observer.read().unwrap_or_else(|p| p.into_inner()))
    }

    pub(super) fn setting(&self, setting: Setting) -> bool {
        self.settings
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(setting)
    }
}

/// Fixed-size worker pool executing named tasks from a shared queue.
///
/// Construction spawns a coordinator thread, which spawns `worker_count`
/// workers and joins them. Workers idle until [`Scheduler::start`] unless the
/// config says otherwise.
pub struct Scheduler {
    pub(super) shared: Arc<Shared>,
    pub(super) worker_count: usize,
    /// Coordinator handle; its result lists workers that panicked.
    pub(super) coordinator: Mutex<Option<JoinHandle<Vec<WorkerId>>>>,
}

impl Scheduler {
    /// Create a scheduler and spawn its workers.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        Self::with_observer(config, Arc::new(NoopObserver))
    }

    /// Create a scheduler whose observer is in place before any worker starts,
    /// so `on_worker_start` is seen for every worker.
    pub fn with_observer(
        config: SchedulerConfig,
        observer: Arc<dyn SchedulerObserver>,
    ) -> Result<Self> {
        config.validate()?;
        let worker_count = config.resolved_worker_threads();

        let shared = Arc::new(Shared {
            queue: TaskQueue::new(),
            done: DoneList::new(),
            store: ResultStore::new(),
            sequences: PoolSequences::new(),
            paused: AtomicBool::new(config.start_paused),
            stopped: AtomicBool::new(false),
            settings: RwLock::new(config.settings()),
            signal: WakeSignal::new(),
            observer: RwLock::new(observer),
            idle_backoff: config.idle_backoff(),
        });

        let coordinator_shared = Arc::clone(&shared);
        let coordinator = thread::Builder::new()
            .name("taskman-coordinator".into())
            .spawn(move || coordinator_shared.coordinate(worker_count))
            .map_err(|e| SchedulerError::Spawn(format!("coordinator: {e}")))?;

        info!(
            workers = worker_count,
            paused = config.start_paused,
            "Scheduler created"
        );

        Ok(Self {
            shared,
            worker_count,
            coordinator: Mutex::new(Some(coordinator)),
        })
    }

    /// Queue a task, returning the sequence id it was given within its pool.
    pub fn add(&self, mut task: Task) -> u64 {
        let sequence_id = self.shared.sequences.next_id(task.pool());
        task.set_sequence_id(sequence_id);
        debug!(
            task = %task.name(),
            pool = %task.pool(),
            sequence_id,
            "task queued"
        );
        self.shared.queue.enqueue(task);
        self.shared.signal.notify();
        sequence_id
    }

    /// Let workers pull tasks.
    pub fn start(&self) {
        let settings = self.settings();
        info!(
            kill_on_empty = settings.kill_on_empty,
            in_order = settings.in_order,
            queued = self.shared.queue.len(),
            "Scheduler started"
        );
        self.shared.paused.store(false, Ordering::Release);
        self.shared.signal.notify();
    }

    /// Stop pulling new tasks. Running tasks finish; nothing is drained.
    pub fn pause(&self) {
        debug!("Scheduler paused");
        self.shared.paused.store(true, Ordering::Release);
        self.shared.signal.notify();
    }

    /// Tell every worker to leave its loop after its current task.
    pub fn stop(&self) {
        info!("Scheduler stop requested");
        self.shared.stopped.store(true, Ordering::Release);
        self.shared.signal.notify();
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::Acquire)
    }

    /// Whether the queue is empty right now. A worker may still be running a task.
    pub fn is_done(&self) -> bool {
        self.shared.queue.is_empty()
    }

    /// Names of queued tasks, head first.
    pub fn tasks(&self) -> Vec<String> {
        self.shared.queue.snapshot_names()
    }

    /// Names of finished tasks in completion order.
    pub fn done(&self) -> Vec<String> {
        self.shared.done.snapshot()
    }

    pub fn pools(&self) -> AllPools {
        self.shared.store.get_all()
    }

    pub fn pool(&self, name: &str) -> PoolResults {
        self.shared.store.get(name)
    }

    /// Drop a pool's results. Returns whether the pool existed.
    pub fn clear_pool(&self, name: &str) -> bool {
        self.shared.store.clear(name)
    }

    pub fn set(&self, setting: Setting, value: bool) {
        self.shared
            .settings
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .set(setting, value);
        self.shared.signal.notify();
    }

    pub fn get(&self, setting: Setting) -> bool {
        self.shared.setting(setting)
    }

    pub fn settings(&self) -> Settings {
        *self.shared.settings.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Replace the observer. Takes effect from the next event on each worker.
    pub fn set_observer(&self, observer: Arc<dyn SchedulerObserver>) {
        *self.shared.observer.write().unwrap_or_else(|p| p.into_inner()) = observer;
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shared.paused.store(true, Ordering::Release);
        let dropped = self.shared.queue.drain();
        if dropped > 0 {
            debug!(dropped, "discarded queued tasks on drop");
        }
        self.shared.stopped.store(true, Ordering::Release);
        self.shared.signal.notify();
    }
}
