//! Append-only event journal.
//!
//! One JSON object per line, one line per attempted command (plus one when a
//! timed-out handler finally returns):
//!
//! ```json
//! {"id":"…","kind":"CommandProcessed","timestamp":"2026-10-16T09:00:00Z","file_name":"001.json","action":"noop"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Bytes read per step when scanning the journal backwards.
const TAIL_CHUNK: u64 = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandEventKind {
    CommandProcessed,
    CommandFailed,
    /// Archiving failed; the file stays in the inbox.
    CommandStranded,
    /// A handler that timed out has returned. `error` is unset if it
    /// succeeded, meaning its effect landed after the command was failed.
    HandlerFinishedLate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEvent {
    /// Unique per event; lets consumers deduplicate replays.
    pub id: Uuid,
    pub kind: CommandEventKind,
    pub timestamp: DateTime<Utc>,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandEvent {
    pub fn new(kind: CommandEventKind, file_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            file_name: file_name.to_string(),
            action: None,
            error: None,
        }
    }
}

/// JSONL file of [`CommandEvent`]s.
#[derive(Debug, Clone)]
pub struct EventJournal {
    path: PathBuf,
}

impl EventJournal {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event, creating the file (and its parent) if needed.
    pub fn record(&self, event: &CommandEvent) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)
    }

    /// The last `limit` events, oldest first. Unparseable lines are skipped;
    /// a missing journal reads as empty.
    ///
    /// Reads backwards from the end of the file, only as far as needed.
    pub fn recent(&self, limit: usize) -> io::Result<Vec<CommandEvent>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut pos = file.metadata()?.len();
        let mut tail = Vec::new();
        loop {
            let mut events = parse_lines(&tail, pos == 0);
            if events.len() >= limit || pos == 0 {
                let skip = events.len().saturating_sub(limit);
                return Ok(events.split_off(skip));
            }

            let step = TAIL_CHUNK.min(pos);
            pos -= step;
            file.seek(SeekFrom::Start(pos))?;
            let mut chunk = vec![0; step as usize];
            file.read_exact(&mut chunk)?;
            chunk.extend_from_slice(&tail);
            tail = chunk;
        }
    }
}

/// Events on the complete lines of `bytes`. Unless `bytes` starts at the
/// beginning of the file, its first line may be cut and is dropped.
fn parse_lines(bytes: &[u8], from_start: bool) -> Vec<CommandEvent> {
    let complete: &[u8] = if from_start {
        bytes
    } else {
        match bytes.iter().position(|&b| b == b'\n') {
            Some(newline) => &bytes[newline + 1..],
            None => &[],
        }
    };
    complete
        .split(|&b| b == b'\n')
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_slice(line).ok())
        .collect()
}
