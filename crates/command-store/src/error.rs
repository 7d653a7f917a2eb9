//! Command store error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Filesystem failures of the command store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to list {}: {source}", .path.display())]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Relocate {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid command file name: {0:?}")]
    InvalidName(String),

    #[error("command file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("a command named {0:?} is already waiting in the inbox")]
    AlreadyQueued(String),
}

/// Result type alias using StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
