//! Host backed by `host-state.json`.

use crate::error::{BridgeError, BridgeResult};
use handler_registry::{HostError, HostPort, HostState, InMemoryHost};
use parking_lot::Mutex;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{info, warn};

/// [`HostPort`] that keeps its state in memory and saves it after every
/// effect. Save failures are logged; the in-memory state stays authoritative.
pub struct FileHost {
    path: PathBuf,
    inner: InMemoryHost,
    save_lock: Mutex<()>,
}

impl FileHost {
    /// Load the state at `path`, creating it from [`HostState::starter`] if
    /// the file does not exist.
    pub fn open(path: PathBuf) -> BridgeResult<Self> {
        let state = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| {
                BridgeError::HostState {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No host state found, starting fresh");
                let state = HostState::starter();
                write_state(&path, &state)?;
                state
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            inner: InMemoryHost::new(state),
            save_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> HostState {
        self.inner.snapshot()
    }

    fn after_effect(&self, result: Result<(), HostError>) -> Result<(), HostError> {
        if result.is_ok() {
            let _guard = self.save_lock.lock();
            if let Err(err) = write_state(&self.path, &self.inner.snapshot()) {
                warn!(path = %self.path.display(), error = %err, "Failed to save host state");
            }
        }
        result
    }
}

impl HostPort for FileHost {
    fn add_funds(&self, amount: i64) -> Result<(), HostError> {
        self.after_effect(self.inner.add_funds(amount))
    }

    fn add_buff(&self, sim_id: Option<u64>, buff: &str) -> Result<(), HostError> {
        self.after_effect(self.inner.add_buff(sim_id, buff))
    }

    fn notify(&self, title: &str, text: &str) -> Result<(), HostError> {
        self.after_effect(self.inner.notify(title, text))
    }
}

/// Write via a temp file and rename so readers never see a partial file.
fn write_state(path: &Path, state: &HostState) -> io::Result<()> {
    let dir = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "host state path has no parent")
    })?;
    fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("host-state.json");
    let tmp_path = dir.join(format!(
        ".{}.tmp.{}",
        file_name,
        std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ));

    let content = serde_json::to_vec_pretty(state)?;
    let result = (|| -> io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(&content)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_starts_from_starter_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("host-state.json");

        let host = FileHost::open(path.clone()).unwrap();

        assert_eq!(host.snapshot(), HostState::starter());
        assert!(path.exists());
    }

    #[test]
    fn effects_are_persisted_and_reloaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("host-state.json");

        let host = FileHost::open(path.clone()).unwrap();
        host.add_funds(250).unwrap();
        host.add_buff(None, "Buff_Happy").unwrap();
        host.notify("Hi", "there").unwrap();
        drop(host);

        let reloaded = FileHost::open(path).unwrap().snapshot();
        assert_eq!(reloaded.household_funds, Some(250));
        assert!(reloaded.sims[&1].contains("Buff_Happy"));
        assert_eq!(reloaded.notifications.len(), 1);
    }

    #[test]
    fn failed_effect_is_not_saved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("host-state.json");
        let host = FileHost::open(path.clone()).unwrap();

        assert_eq!(host.add_buff(Some(9), "Buff_Happy"), Err(HostError::SimNotFound(9)));

        let on_disk: HostState =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, HostState::starter());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("host-state.json");
        fs::write(&path, "{ nope").unwrap();

        let err = FileHost::open(path).err().unwrap();
        assert!(matches!(err, BridgeError::HostState { .. }));
    }

    #[test]
    fn no_temp_files_are_left_behind() {
        let dir = tempdir().unwrap();
        let host = FileHost::open(dir.path().join("host-state.json")).unwrap();
        host.add_funds(1).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("host-state.json")]);
    }
}
