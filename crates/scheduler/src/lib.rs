//! Fixed-size worker pool with name-based task dependencies and result pools.
//!
//! Tasks are queued with [`Scheduler::add`], pulled FIFO by a fixed set of
//! worker threads, and gated on their dependency: a task built with
//! `.after("x")` is put back at the tail of the queue until some task named
//! `x` has finished. Each task's captured value lands in its pool under the
//! sequence id it got when it was added.

pub mod done;
pub mod global;
pub mod metrics;
pub mod observer;
pub mod queue;
pub mod runner;
pub mod signal;
pub mod store;

pub use metrics::{MetricsObserver, SchedulerMetrics};
pub use observer::{
    CallbackObserver, LoggingObserver, NoopObserver, ObserverSet, SchedulerObserver, WorkerId,
};
pub use runner::Scheduler;
pub use store::{AllPools, PoolResults};
pub use taskman_core::{
    SchedulerConfig, SchedulerError, Setting, Settings, Task, TaskOutcome, DEFAULT_POOL,
};
