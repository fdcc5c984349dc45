pub mod config;
pub mod error;
pub mod settings;
pub mod task;

pub use config::SchedulerConfig;
pub use error::*;
pub use settings::{Setting, Settings};
pub use task::{Task, TaskId, TaskOutcome, DEFAULT_POOL};
