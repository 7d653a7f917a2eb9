use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    #[error("no tokio runtime is available to run the poll scheduler")]
    NoRuntime,
}

/// Result type alias using SchedulerError.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
