use std::fmt;

use uuid::Uuid;

/// Pool that results land in when a task does not name one.
pub const DEFAULT_POOL: &str = "default";

/// Identity of a physical task instance.
pub type TaskId = Uuid;

/// What an executable hands back: a captured value and a status code.
/// Negative status means the task failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub value: String,
    pub status: i32,
}

impl TaskOutcome {
    /// Successful outcome (status 0).
    pub fn ok(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            status: 0,
        }
    }

    /// Outcome carrying an explicit status. Callers normally pass a negative code.
    pub fn failed(value: impl Into<String>, status: i32) -> Self {
        Self {
            value: value.into(),
            status,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status < 0
    }
}

impl From<(String, i32)> for TaskOutcome {
    fn from((value, status): (String, i32)) -> Self {
        Self { value, status }
    }
}

impl From<String> for TaskOutcome {
    fn from(value: String) -> Self {
        Self::ok(value)
    }
}

impl From<&str> for TaskOutcome {
    fn from(value: &str) -> Self {
        Self::ok(value)
    }
}

/// Boxed unit of work. May capture state from the caller.
pub type Executable = Box<dyn FnMut() -> TaskOutcome + Send + 'static>;

/// A named unit of work with an optional dependency and result pool.
///
/// Dependencies are matched by *name*: a task built with `.after("load")`
/// may run once any task called `load` has finished, successfully or not.
pub struct Task {
    id: TaskId,
    name: String,
    executable: Executable,
    dependency: Option<String>,
    pool: String,
    sequence_id: u64,
}

impl Task {
    pub fn new<F, O>(name: impl Into<String>, mut executable: F) -> Self
    where
        F: FnMut() -> O + Send + 'static,
        O: Into<TaskOutcome>,
    {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            executable: Box::new(move || executable().into()),
            dependency: None,
            pool: DEFAULT_POOL.to_string(),
            sequence_id: 0,
        }
    }

    /// Only run once a task named `dependency` is done. An empty name clears it.
    pub fn after(mut self, dependency: impl Into<String>) -> Self {
        let dependency = dependency.into();
        self.dependency = if dependency.is_empty() {
            None
        } else {
            Some(dependency)
        };
        self
    }

    /// Capture the result into `pool`. An empty name selects [`DEFAULT_POOL`].
    pub fn in_pool(mut self, pool: impl Into<String>) -> Self {
        let pool = pool.into();
        self.pool = if pool.is_empty() {
            DEFAULT_POOL.to_string()
        } else {
            pool
        };
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependency(&self) -> Option<&str> {
        self.dependency.as_deref()
    }

    pub fn pool(&self) -> &str {
        &self.pool
    }

    /// Per-pool sequence id. Zero until the scheduler assigns one on `add`.
    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    pub fn set_sequence_id(&mut self, sequence_id: u64) {
        self.sequence_id = sequence_id;
    }

    /// Invoke the executable.
    pub fn run(&mut self) -> TaskOutcome {
        (self.executable)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("dependency", &self.dependency)
            .field("pool", &self.pool)
            .field("sequence_id", &self.sequence_id)
            .finish_non_exhaustive()
    }
}
