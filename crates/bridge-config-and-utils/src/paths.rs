//! File system paths for the bridge.

use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// Base directory name under the user's home.
const BASE_DIR_NAME: &str = ".moddata-bridge";
/// Inbox directory name, where producers drop command files.
const INBOX_DIR_NAME: &str = "commands";
const PROCESSED_DIR_NAME: &str = "processed";
const FAILED_DIR_NAME: &str = "failed";

/// Manages file system paths for the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Uses `~/.moddata-bridge` as the base directory.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;
        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `<base>/config.json`
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// `<base>/commands`
    pub fn inbox_dir(&self) -> PathBuf {
        self.base_dir.join(INBOX_DIR_NAME)
    }

    /// `<base>/processed`
    pub fn processed_dir(&self) -> PathBuf {
        self.base_dir.join(PROCESSED_DIR_NAME)
    }

    /// `<base>/failed`
    pub fn failed_dir(&self) -> PathBuf {
        self.base_dir.join(FAILED_DIR_NAME)
    }

    /// `<base>/events.jsonl`
    pub fn journal_file(&self) -> PathBuf {
        self.base_dir.join("events.jsonl")
    }

    /// `<base>/host-state.json`
    pub fn host_state_file(&self) -> PathBuf {
        self.base_dir.join("host-state.json")
    }

    /// `<base>/bridge.pid`
    pub fn pid_file(&self) -> PathBuf {
        self.base_dir.join("bridge.pid")
    }

    /// `<base>/logs`
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// `<base>/logs/bridge.jsonl`
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("bridge.jsonl")
    }

    /// Ensure the base and log directories exist. The command directories
    /// are owned by the command store.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
