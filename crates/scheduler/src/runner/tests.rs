#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    use taskman_core::{SchedulerConfig, SchedulerError, Setting, Task, TaskOutcome};

    use crate::metrics::MetricsObserver;
    use crate::observer::CallbackObserver;
    use crate::runner::Scheduler;

    /// Config for tests: short backoff, workers exit once the queue drains.
    fn config(workers: usize) -> SchedulerConfig {
        let mut config = SchedulerConfig::default()
            .with_workers(workers)
            .with_kill_on_empty(true);
        config.idle_backoff_ms = 5;
        config
    }

    /// Task that appends its name to `log` when it runs.
    fn recording(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Task {
        let log = Arc::clone(log);
        let owned = name.to_string();
        Task::new(name, move || {
            log.lock().unwrap().push(owned.clone());
            TaskOutcome::ok(format!("{owned} done"))
        })
    }

    fn wait_until(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if pred() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        pred()
    }

    #[test]
    fn scheduler_creation() {
        let scheduler = Scheduler::new(config(3)).unwrap();
        assert_eq!(scheduler.worker_count(), 3);
        assert!(scheduler.is_paused());
        assert!(!scheduler.is_stopped());
        assert!(scheduler.is_done());
        assert!(scheduler.tasks().is_empty());
        assert!(scheduler.done().is_empty());

        scheduler.stop();
        scheduler.join().unwrap();
    }

    #[test]
    fn invalid_config_rejected() {
        let mut bad = config(1);
        bad.idle_backoff_ms = 0;
        let err = Scheduler::new(bad).err().unwrap();
        assert!(matches!(err, SchedulerError::InvalidConfig(_)));
    }

    #[test]
    fn add_assigns_sequence_ids_per_pool() {
        let scheduler = Scheduler::new(config(1)).unwrap();
        assert_eq!(scheduler.add(Task::new("a", || "a").in_pool("p")), 0);
        assert_eq!(scheduler.add(Task::new("b", || "b").in_pool("p")), 1);
        assert_eq!(scheduler.add(Task::new("c", || "c").in_pool("q")), 0);
        assert_eq!(scheduler.add(Task::new("d", || "d")), 0);
        assert_eq!(scheduler.tasks(), vec!["a", "b", "c", "d"]);
        assert!(!scheduler.is_done());
    }

    #[test]
    fn concurrent_add_gives_unique_increasing_ids() {
        let scheduler = Arc::new(Scheduler::new(config(2)).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let scheduler = Arc::clone(&scheduler);
                thread::spawn(move || {
                    (0..50)
                        .map(|i| scheduler.add(Task::new(format!("t{t}-{i}"), || "x").in_pool("p")))
                        .collect::<Vec<u64>>()
                })
            })
            .collect();

        let mut all = Vec::new();
        for h in handles {
            let ids = h.join().unwrap();
            assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids increase per caller");
            all.extend(ids);
        }
        let unique: BTreeSet<u64> = all.iter().copied().collect();
        assert_eq!(unique.len(), 400);
        assert_eq!(unique, (0..400).collect::<BTreeSet<u64>>());
        assert_eq!(scheduler.tasks().len(), 400);
    }

    #[test]
    fn fifo_without_dependencies() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scheduler = Scheduler::new(config(1)).unwrap();
        let names: Vec<String> = (0..10).map(|i| format!("task{i}")).collect();
        for name in &names {
            scheduler.add(recording(name, &log));
        }

        scheduler.start();
        scheduler.join().unwrap();

        assert_eq!(*log.lock().unwrap(), names);
        assert_eq!(scheduler.done(), names);
        assert!(scheduler.is_done());
    }

    #[test]
    fn dependency_in_enqueue_order() {
        let scheduler = Scheduler::new(config(1)).unwrap();
        scheduler.add(Task::new("A", || "a"));
        scheduler.add(Task::new("B", || "b").after("A"));

        scheduler.start();
        scheduler.join().unwrap();

        assert_eq!(scheduler.done(), vec!["A", "B"]);
        assert!(scheduler.is_done());
    }

    #[test]
    fn dependency_enqueued_before_its_prerequisite() {
        let scheduler = Scheduler::new(config(1)).unwrap();
        scheduler.add(Task::new("B", || "b").after("A"));
        scheduler.add(Task::new("A", || "a"));

        scheduler.start();
        scheduler.join().unwrap();

        assert_eq!(scheduler.done(), vec!["A", "B"]);
    }

    #[test]
    fn chain_runs_in_dependency_order_across_workers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let scheduler = Scheduler::new(config(4)).unwrap();

        // Added in reverse so every task but the last is blocked at first.
        for i in (0..10).rev() {
            let task = recording(&format!("step{i}"), &log);
            let task = if i == 0 {
                task
            } else {
                task.after(format!("step{}", i - 1))
            };
            scheduler.add(task);
        }

        scheduler.start();
        scheduler.join().unwrap();

        let expected: Vec<String> = (0..10).map(|i| format!("step{i}")).collect();
        assert_eq!(*log.lock().unwrap(), expected);
        assert_eq!(scheduler.done(), expected);
    }

    #[test]
    fn dependency_matches_any_task_with_that_name() {
        let scheduler = Scheduler::new(config(1)).unwrap();
        scheduler.add(Task::new("load", || "first"));
        scheduler.add(Task::new("use", || "used").after("load"));
        scheduler.add(Task::new("load", || "second"));

        scheduler.start();
        scheduler.join().unwrap();

        assert_eq!(scheduler.done(), vec!["load", "use", "load"]);
    }

    #[test]
    fn failing_task_is_done_once_and_reported_once() {
        let fails = Arc::new(Mutex::new(Vec::new()));
        let stops = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fails);
        let s = Arc::clone(&stops);
        let observer = CallbackObserver::new()
            .on_task_fail(move |t, _w, status| f.lock().unwrap().push((t.name().to_string(), status)))
            .on_task_stop(move |_t, _w| {
                s.fetch_add(1, Ordering::Relaxed);
            });

        let scheduler = Scheduler::with_observer(config(2), Arc::new(observer)).unwrap();
        scheduler.add(Task::new("bad", || TaskOutcome::failed("boom", -3)).in_pool("r"));
        scheduler.add(Task::new("good", || "fine").in_pool("r"));
        scheduler.add(Task::new("after-bad", || "ran").after("bad").in_pool("r"));

        scheduler.start();
        scheduler.join().unwrap();

        assert_eq!(*fails.lock().unwrap(), vec![("bad".to_string(), -3)]);
        assert_eq!(stops.load(Ordering::Relaxed), 3);

        let done = scheduler.done();
        assert_eq!(done.iter().filter(|n| *n == "bad").count(), 1);
        assert!(done.contains(&"after-bad".to_string()));

        let pool = scheduler.pool("r");
        assert_eq!(pool[&0], "boom");
        assert_eq!(pool[&1], "fine");
        assert_eq!(pool[&2], "ran");
    }

    #[test]
    fn pool_results_keyed_by_sequence_id() {
        let scheduler = Scheduler::new(config(4)).unwrap();
        for i in 0..3 {
            scheduler.add(Task::new(format!("t{i}"), move || format!("value {i}")).in_pool("p"));
        }

        scheduler.start();
        scheduler.join().unwrap();

        let pool = scheduler.pool("p");
        assert_eq!(pool.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        for i in 0..3u64 {
            assert_eq!(pool[&i], format!("value {i}"));
        }
        assert_eq!(scheduler.pools().len(), 1);
    }

    #[test]
    fn clear_pool_removes_results() {
        let scheduler = Scheduler::new(config(1)).unwrap();
        scheduler.add(Task::new("a", || "x").in_pool("p"));
        scheduler.add(Task::new("b", || "y").in_pool("q"));
        scheduler.start();
        scheduler.join().unwrap();

        assert!(scheduler.clear_pool("p"));
        assert!(!scheduler.clear_pool("p"));
        assert!(scheduler.pool("p").is_empty());
        assert_eq!(scheduler.pool("q").len(), 1);
    }

    #[test]
    fn pause_and_start_are_idempotent() {
        let scheduler = Scheduler::new(config(1).with_kill_on_empty(false)).unwrap();
        scheduler.pause();
        scheduler.pause();
        assert!(scheduler.is_paused());

        scheduler.start();
        scheduler.start();
        assert!(!scheduler.is_paused());

        scheduler.stop();
        scheduler.join().unwrap();
    }

    #[test]
    fn paused_scheduler_runs_nothing() {
        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        let scheduler = Scheduler::new(config(2)).unwrap();
        scheduler.add(Task::new("held", move || {
            r.fetch_add(1, Ordering::Relaxed);
            "ran"
        }));

        thread::sleep(Duration::from_millis(50));
        assert_eq!(ran.load(Ordering::Relaxed), 0);
        assert_eq!(scheduler.tasks(), vec!["held"]);

        scheduler.start();
        scheduler.join().unwrap();
        assert_eq!(ran.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn missing_dependency_circulates_forever() {
        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        let scheduler = Scheduler::new(config(1).with_kill_on_empty(false)).unwrap();
        scheduler.add(
            Task::new("X", move || {
                r.fetch_add(1, Ordering::Relaxed);
                "never"
            })
            .after("Y"),
        );
        scheduler.start();

        // Bounded by our own timeout: X keeps going around the queue.
        let mut seen_queued = 0;
        let deadline = Instant::now() + Duration::from_millis(200);
        while Instant::now() < deadline {
            if scheduler.tasks() == vec!["X"] {
                seen_queued += 1;
            }
            thread::sleep(Duration::from_millis(5));
        }

        assert!(seen_queued > 0, "X should stay in the queue");
        assert_eq!(ran.load(Ordering::Relaxed), 0);
        assert!(scheduler.done().is_empty());

        scheduler.stop();
        scheduler.join().unwrap();
    }

    #[test]
    fn worker_hooks_fire_once_per_worker() {
        let metrics = Arc::new(MetricsObserver::new());
        let scheduler = Scheduler::with_observer(config(3), metrics.clone()).unwrap();
        scheduler.add(Task::new("only", || "x"));

        scheduler.start();
        scheduler.join().unwrap();

        let m = metrics.snapshot();
        assert_eq!(m.stopped_workers, 3);
        assert_eq!(m.active_workers, 0);
        assert_eq!(m.tasks_executed["only"], 1);
    }

    #[test]
    fn set_observer_applies_to_later_events() {
        let started = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&started);
        let scheduler = Scheduler::new(config(1)).unwrap();
        scheduler.set_observer(Arc::new(
            CallbackObserver::new().on_task_start(move |t, w| s.lock().unwrap().push((t.name().to_string(), w))),
        ));
        scheduler.add(Task::new("a", || "x"));

        scheduler.start();
        scheduler.join().unwrap();

        assert_eq!(*started.lock().unwrap(), vec![("a".to_string(), 0)]);
    }

    #[test]
    fn stop_lets_running_task_finish() {
        let (tx, rx) = mpsc::channel();
        let scheduler = Scheduler::new(config(1).with_kill_on_empty(false)).unwrap();
        scheduler.add(Task::new("slow", move || {
            tx.send(()).ok();
            thread::sleep(Duration::from_millis(50));
            "finished"
        }));
        scheduler.add(Task::new("never", || "x"));

        scheduler.start();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        scheduler.stop();
        scheduler.join().unwrap();

        assert_eq!(scheduler.done(), vec!["slow"]);
        assert_eq!(scheduler.tasks(), vec!["never"]);
        assert_eq!(scheduler.pool(taskman_core::DEFAULT_POOL)[&0], "finished");
    }

    #[test]
    fn enabling_kill_on_empty_releases_idle_workers() {
        let scheduler = Scheduler::new(config(2).with_kill_on_empty(false)).unwrap();
        scheduler.start();
        thread::sleep(Duration::from_millis(20));

        scheduler.set(Setting::KillOnEmpty, true);
        assert!(scheduler.get(Setting::KillOnEmpty));
        scheduler.join().unwrap();
    }

    #[test]
    fn settings_round_trip() {
        let scheduler = Scheduler::new(config(1)).unwrap();
        assert!(scheduler.get(Setting::KillOnEmpty));
        assert!(scheduler.get(Setting::InOrder));

        scheduler.set(Setting::InOrder, false);
        assert!(!scheduler.get(Setting::InOrder));
        assert!(scheduler.get(Setting::KillOnEmpty));
        assert_eq!(scheduler.settings().bits(), Setting::KILL_ON_EMPTY);
    }

    #[test]
    fn join_twice_is_ok() {
        let scheduler = Scheduler::new(config(1)).unwrap();
        scheduler.start();
        scheduler.join().unwrap();
        scheduler.join().unwrap();
    }

    #[test]
    fn drop_stops_workers() {
        let stopped = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&stopped);
        let observer = CallbackObserver::new().on_worker_stop(move |_| {
            s.fetch_add(1, Ordering::Relaxed);
        });
        let scheduler =
            Scheduler::with_observer(config(2).with_kill_on_empty(false), Arc::new(observer)).unwrap();
        drop(scheduler);

        assert!(wait_until(Duration::from_secs(5), || stopped.load(Ordering::Relaxed) == 2));
    }

    #[test]
    fn drop_discards_queued_tasks() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let discarded = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&stopped);
        let observer = CallbackObserver::new().on_worker_stop(move |_| {
            s.fetch_add(1, Ordering::Relaxed);
        });
        let scheduler =
            Scheduler::with_observer(config(1).with_kill_on_empty(false), Arc::new(observer)).unwrap();

        scheduler.add(Task::new("blocker", move || {
            started_tx.send(()).ok();
            release_rx.recv_timeout(Duration::from_secs(5)).ok();
            "released"
        }));
        let d = Arc::clone(&discarded);
        scheduler.add(Task::new("queued", move || {
            d.fetch_add(1, Ordering::Relaxed);
            "ran"
        }));

        scheduler.start();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(scheduler.tasks(), vec!["queued"]);

        // The only worker is busy, so "queued" can only run if drop leaves it behind.
        drop(scheduler);
        release_tx.send(()).unwrap();

        assert!(wait_until(Duration::from_secs(5), || stopped.load(Ordering::Relaxed) == 1));
        assert_eq!(discarded.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn blocked_worker_wakes_on_completion_despite_long_backoff() {
        let mut slow_backoff = config(2);
        slow_backoff.idle_backoff_ms = 10_000;
        let scheduler = Scheduler::new(slow_backoff).unwrap();

        // Several blocked tasks make the idle worker rotate over more than one
        // pass before waiting, while "fetch" finishes on the other worker.
        for name in ["a", "b", "c", "d"] {
            scheduler.add(Task::new(name, || "x").after("fetch"));
        }
        scheduler.add(Task::new("fetch", || {
            thread::sleep(Duration::from_millis(30));
            "fetched"
        }));

        let started = Instant::now();
        scheduler.start();
        scheduler.join().unwrap();

        assert!(
            started.elapsed() < Duration::from_secs(5),
            "took {:?}",
            started.elapsed()
        );
        assert_eq!(scheduler.done().len(), 5);
        assert_eq!(scheduler.done()[0], "fetch");
    }
}
