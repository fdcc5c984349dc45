use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("invalid scheduler config: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to spawn thread: {0}")]
    Spawn(String),

    #[error("thread panicked: {0}")]
    Panicked(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
