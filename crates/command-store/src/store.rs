//! Inbox enumeration and archive relocation.

use crate::{StoreError, StoreResult};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Extension (without the dot) of files the store treats as commands.
pub const DEFAULT_EXTENSION: &str = "json";

const INBOX_DIR_NAME: &str = "commands";
const PROCESSED_DIR_NAME: &str = "processed";
const FAILED_DIR_NAME: &str = "failed";

/// Terminal result of one processing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "processed",
            Outcome::Failure => "failed",
        }
    }
}

/// A command file waiting in the inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    name: String,
    path: PathBuf,
}

impl PendingEntry {
    /// File name; the ordering key and the correlation token in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Number of command files per directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub pending: usize,
    pub processed: usize,
    pub failed: usize,
}

/// The inbox / processed / failed directory triple.
#[derive(Debug, Clone)]
pub struct CommandStore {
    inbox: PathBuf,
    processed: PathBuf,
    failed: PathBuf,
    suffix: String,
}

impl CommandStore {
    pub fn new(inbox: PathBuf, processed: PathBuf, failed: PathBuf) -> Self {
        Self {
            inbox,
            processed,
            failed,
            suffix: format!(".{}", DEFAULT_EXTENSION),
        }
    }

    /// Store rooted at `root`, using `commands/`, `processed/` and `failed/`.
    pub fn from_root(root: &Path) -> Self {
        Self::new(
            root.join(INBOX_DIR_NAME),
            root.join(PROCESSED_DIR_NAME),
            root.join(FAILED_DIR_NAME),
        )
    }

    /// Recognize `extension` (with or without a leading dot) instead of `json`.
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.suffix = format!(".{}", extension.trim_start_matches('.'));
        self
    }

    pub fn inbox_dir(&self) -> &Path {
        &self.inbox
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed
    }

    pub fn failed_dir(&self) -> &Path {
        &self.failed
    }

    fn archive_dir(&self, outcome: Outcome) -> &Path {
        match outcome {
            Outcome::Success => &self.processed,
            Outcome::Failure => &self.failed,
        }
    }

    /// Create the three directories if absent. Idempotent.
    pub fn ensure_layout(&self) -> StoreResult<()> {
        for dir in [&self.inbox, &self.processed, &self.failed] {
            fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn is_command_name(&self, name: &str) -> bool {
        name.ends_with(&self.suffix)
    }

    /// Inbox entries carrying the payload extension, sorted ascending by name.
    pub fn list_pending(&self) -> StoreResult<Vec<PendingEntry>> {
        let mut entries = self
            .list_names(&self.inbox)?
            .into_iter()
            .map(|name| PendingEntry {
                path: self.inbox.join(&name),
                name,
            })
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn list_names(&self, dir: &Path) -> StoreResult<Vec<String>> {
        let list_err = |source| StoreError::List {
            path: dir.to_path_buf(),
            source,
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            match entry.file_name().into_string() {
                Ok(name) if self.is_command_name(&name) => names.push(name),
                Ok(_) => {}
                Err(raw) => {
                    warn!(dir = %dir.display(), name = ?raw, "Skipping non UTF-8 file name");
                }
            }
        }
        Ok(names)
    }

    /// Read the raw payload of a pending entry.
    pub fn read(&self, entry: &PendingEntry) -> StoreResult<Vec<u8>> {
        fs::read(&entry.path).map_err(|source| StoreError::Read {
            path: entry.path.clone(),
            source,
        })
    }

    /// Move `entry` into the archive selected by `outcome`, keeping its name.
    ///
    /// A same-named file already in the archive is replaced. On error the
    /// entry is still in the inbox.
    pub fn archive(&self, entry: &PendingEntry, outcome: Outcome) -> StoreResult<PathBuf> {
        let destination = self.archive_dir(outcome).join(&entry.name);
        fs::rename(&entry.path, &destination).map_err(|source| StoreError::Relocate {
            from: entry.path.clone(),
            to: destination.clone(),
            source,
        })?;
        debug!(
            file = %entry.name,
            outcome = outcome.as_str(),
            "Archived command file"
        );
        Ok(destination)
    }

    /// Move a file from `failed` back into the inbox for another attempt.
    pub fn requeue(&self, file_name: &str) -> StoreResult<PendingEntry> {
        validate_file_name(file_name)?;

        let source = self.failed.join(file_name);
        if !source.is_file() {
            return Err(StoreError::NotFound(source));
        }
        let destination = self.inbox.join(file_name);
        if destination.exists() {
            return Err(StoreError::AlreadyQueued(file_name.to_string()));
        }

        fs::rename(&source, &destination).map_err(|err| StoreError::Relocate {
            from: source.clone(),
            to: destination.clone(),
            source: err,
        })?;
        debug!(file = %file_name, "Requeued failed command");

        Ok(PendingEntry {
            name: file_name.to_string(),
            path: destination,
        })
    }

    /// Count command files in each directory. Missing directories count as empty.
    pub fn counts(&self) -> StoreResult<StoreCounts> {
        Ok(StoreCounts {
            pending: self.count_in(&self.inbox)?,
            processed: self.count_in(&self.processed)?,
            failed: self.count_in(&self.failed)?,
        })
    }

    fn count_in(&self, dir: &Path) -> StoreResult<usize> {
        match self.list_names(dir) {
            Ok(names) => Ok(names.len()),
            Err(StoreError::List { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(0)
            }
            Err(err) => Err(err),
        }
    }
}

fn validate_file_name(name: &str) -> StoreResult<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name && !name.contains('\\') => Ok(()),
        _ => Err(StoreError::InvalidName(name.to_string())),
    }
}
