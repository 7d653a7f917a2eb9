use bridge_config_and_utils::CoreError;
use command_store::StoreError;
use poll_scheduler::SchedulerError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the bridge binary.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Config(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Bridge is already running (pid {0})")]
    AlreadyRunning(u32),

    #[error("PID file error: {0}")]
    PidFile(String),

    #[error("Invalid host state in {}: {source}", .path.display())]
    HostState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
