//! Poll cycle results.

use crate::EntryError;
use chrono::{DateTime, Utc};
use command_store::{Outcome, StoreError};
use std::time::Duration;

/// Where a command file ended up after its attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Handler succeeded; file is in `processed/`.
    Processed,
    /// Read, decode, resolve or execute failed; file is in `failed/`.
    Failed,
    /// Archiving to the `intended` directory failed; file is still in the
    /// inbox and will be attempted again next cycle.
    Stranded { intended: Outcome },
}

/// One command file's attempt.
#[derive(Debug)]
pub struct EntryReport {
    pub file_name: String,
    /// Decoded action, when decoding got that far.
    pub action: Option<String>,
    pub disposition: Disposition,
    /// Why the command failed, if it did.
    pub error: Option<EntryError>,
    /// Why archiving failed, for [`Disposition::Stranded`].
    pub relocation_error: Option<StoreError>,
}

impl EntryReport {
    /// The command itself succeeded, whether or not archiving did.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug)]
pub enum CycleStatus {
    /// Every listed entry was attempted.
    Completed,
    /// Another cycle was already running on this dispatcher.
    Skipped,
    /// Layout or listing failed; nothing was attempted.
    Aborted(StoreError),
}

/// Aggregate of one poll cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub status: CycleStatus,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub entries: Vec<EntryReport>,
}

impl CycleReport {
    pub(crate) fn new(status: CycleStatus, started_at: DateTime<Utc>) -> Self {
        Self {
            status,
            started_at,
            elapsed: Duration::ZERO,
            entries: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, CycleStatus::Completed)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, CycleStatus::Skipped)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, CycleStatus::Aborted(_))
    }

    fn count(&self, disposition: Disposition) -> usize {
        self.entries
            .iter()
            .filter(|e| e.disposition == disposition)
            .count()
    }

    pub fn processed(&self) -> usize {
        self.count(Disposition::Processed)
    }

    pub fn failed(&self) -> usize {
        self.count(Disposition::Failed)
    }

    pub fn stranded(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.disposition, Disposition::Stranded { .. }))
            .count()
    }

    /// Look up the report for `file_name`.
    pub fn entry(&self, file_name: &str) -> Option<&EntryReport> {
        self.entries.iter().find(|e| e.file_name == file_name)
    }
}
