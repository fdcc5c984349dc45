//! taskman-demo: run a batch of sleeping tasks through the worker pool.
//!
//! Builds `--tasks` tasks that each sleep for `--sleep-ms`, optionally chains
//! them so each runs after the previous one, starts the scheduler with
//! `KILL_ON_EMPTY`, waits for the workers to drain the queue, then prints the
//! captured pool and the run metrics as JSON.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use taskman_scheduler::{
    LoggingObserver, MetricsObserver, ObserverSet, Scheduler, SchedulerConfig, Setting, Task,
    TaskOutcome,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Fixed-size worker pool demo.
#[derive(Parser, Debug)]
#[command(name = "taskman-demo", version, about)]
struct Cli {
    /// Optional TOML scheduler config.
    #[arg(long, env = "TASKMAN_CONFIG")]
    config: Option<String>,

    /// Worker thread count (overrides the config).
    #[arg(long)]
    workers: Option<usize>,

    /// Number of tasks to enqueue.
    #[arg(long, default_value_t = 10)]
    tasks: usize,

    /// How long each task sleeps, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    sleep_ms: u64,

    /// Make every task depend on the one before it.
    #[arg(long)]
    chain: bool,

    /// Make every Nth task fail with status -1 (0 = never).
    #[arg(long, default_value_t = 0)]
    fail_every: usize,

    /// Pool the results are captured into.
    #[arg(long, default_value = "demo")]
    pool: String,
}

fn load_config(cli: &Cli) -> SchedulerConfig {
    let config = match &cli.config {
        Some(path) => match SchedulerConfig::from_file(path) {
            Ok(cfg) => {
                info!(path = %path, "loaded scheduler config");
                cfg
            }
            Err(e) => {
                warn!(error = %e, path = %path, "failed to load config, using defaults");
                SchedulerConfig::default()
            }
        },
        None => SchedulerConfig::from_env().unwrap_or_else(|e| {
            warn!(error = %e, "invalid scheduler env config, using defaults");
            SchedulerConfig::default()
        }),
    };
    match cli.workers {
        Some(n) => config.with_workers(n),
        None => config,
    }
}

fn build_task(index: usize, cli: &Cli) -> Task {
    let sleep = Duration::from_millis(cli.sleep_ms);
    let fails = cli.fail_every > 0 && (index + 1) % cli.fail_every == 0;
    let task = Task::new(format!("task{index}"), move || {
        thread::sleep(sleep);
        if fails {
            TaskOutcome::failed(format!("task{index} failed"), -1)
        } else {
            TaskOutcome::ok(format!("task{index} slept {}ms", sleep.as_millis()))
        }
    })
    .in_pool(cli.pool.as_str());

    if cli.chain && index > 0 {
        task.after(format!("task{}", index - 1))
    } else {
        task
    }
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli);

    let metrics = Arc::new(MetricsObserver::new());
    let observers = ObserverSet::new()
        .with(Arc::new(LoggingObserver))
        .with(metrics.clone());

    let scheduler = Scheduler::with_observer(config, Arc::new(observers))?;
    scheduler.pause();
    scheduler.set(Setting::KillOnEmpty, true);

    for index in 0..cli.tasks {
        scheduler.add(build_task(index, &cli));
    }
    info!(queued = scheduler.tasks().len(), workers = scheduler.worker_count(), "tasks queued");

    scheduler.start();
    scheduler.join()?;

    let report = serde_json::json!({
        "done": scheduler.done(),
        "pool": scheduler.pool(&cli.pool),
        "metrics": metrics.snapshot(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!("taskman-demo exited cleanly");
    Ok(())
}
