use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SchedulerError};
use crate::settings::Settings;

/// Upper bound on the resolved worker count.
pub const MAX_WORKERS: usize = 1024;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str) -> Option<T> {
    let raw = profiled_env_opt(profile, key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable env override");
            None
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn profiled_env_bool(profile: &str, key: &str) -> Option<bool> {
    let raw = profiled_env_opt(profile, key)?;
    let parsed = parse_bool(&raw);
    if parsed.is_none() {
        warn!(key, value = %raw, "ignoring non-boolean env override");
    }
    parsed
}

/// Scheduler configuration, parsed from TOML and/or the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker threads. 0 = available parallelism.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Initial value of `KILL_ON_EMPTY`.
    #[serde(default)]
    pub kill_on_empty: bool,
    /// Initial value of `IN_ORDER`.
    #[serde(default = "default_in_order")]
    pub in_order: bool,
    /// Whether workers start out paused.
    #[serde(default = "default_start_paused")]
    pub start_paused: bool,
    /// Longest a worker waits before re-checking idle state, in milliseconds.
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
}

fn default_worker_threads() -> usize { 4 }
fn default_in_order() -> bool { true }
fn default_start_paused() -> bool { true }
fn default_idle_backoff_ms() -> u64 { 50 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            kill_on_empty: false,
            in_order: default_in_order(),
            start_paused: default_start_paused(),
            idle_backoff_ms: default_idle_backoff_ms(),
        }
    }
}

impl SchedulerConfig {
    /// Build config from environment variables, loading `.env` first.
    ///
    /// Profile is read from `TASKMAN_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        Self::for_profile(&active_profile())
    }

    /// Defaults overridden by the env keys of a named profile (empty = default).
    pub fn for_profile(profile: &str) -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides(&profile.to_uppercase());
        config.validate()?;
        Ok(config)
    }

    /// Parse config from a TOML string. Env overrides win over file values.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides(&active_profile());
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Apply environment variable overrides.
    ///
    /// - `TASKMAN_WORKER_THREADS` → `worker_threads`
    /// - `TASKMAN_KILL_ON_EMPTY` → `kill_on_empty`
    /// - `TASKMAN_IN_ORDER` → `in_order`
    /// - `TASKMAN_START_PAUSED` → `start_paused`
    /// - `TASKMAN_IDLE_BACKOFF_MS` → `idle_backoff_ms`
    ///
    /// Unparseable values are logged and ignored.
    fn apply_env_overrides(&mut self, profile: &str) {
        if let Some(v) = profiled_env_parse(profile, "TASKMAN_WORKER_THREADS") {
            self.worker_threads = v;
        }
        if let Some(v) = profiled_env_bool(profile, "TASKMAN_KILL_ON_EMPTY") {
            self.kill_on_empty = v;
        }
        if let Some(v) = profiled_env_bool(profile, "TASKMAN_IN_ORDER") {
            self.in_order = v;
        }
        if let Some(v) = profiled_env_bool(profile, "TASKMAN_START_PAUSED") {
            self.start_paused = v;
        }
        if let Some(v) = profiled_env_parse(profile, "TASKMAN_IDLE_BACKOFF_MS") {
            self.idle_backoff_ms = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.idle_backoff_ms == 0 {
            return Err(SchedulerError::InvalidConfig(
                "idle_backoff_ms must be greater than zero".into(),
            ));
        }
        let workers = self.resolved_worker_threads();
        if workers > MAX_WORKERS {
            return Err(SchedulerError::InvalidConfig(format!(
                "worker_threads {workers} exceeds the maximum of {MAX_WORKERS}"
            )));
        }
        Ok(())
    }

    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.worker_threads
        }
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    /// Initial settings flags.
    pub fn settings(&self) -> Settings {
        Settings {
            kill_on_empty: self.kill_on_empty,
            in_order: self.in_order,
        }
    }

    /// Builder-style worker count, handy in tests and embedders.
    pub fn with_workers(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    pub fn with_kill_on_empty(mut self, kill_on_empty: bool) -> Self {
        self.kill_on_empty = kill_on_empty;
        self
    }
}

fn active_profile() -> String {
    env_opt("TASKMAN_PROFILE").unwrap_or_default().to_uppercase()
}
