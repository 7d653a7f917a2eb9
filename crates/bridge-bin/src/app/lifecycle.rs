//! PID file handling for the foreground bridge process.

use crate::error::{BridgeError, BridgeResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Create `pid_path` holding `pid`. Returns false if the file already
/// exists. The content is staged and hard-linked into place, so the file is
/// never observed empty.
fn claim_pid_file(pid_path: &Path, pid: u32) -> BridgeResult<bool> {
    let staging = pid_path.with_extension(format!("pid.{}", pid));
    fs::write(&staging, pid.to_string())?;
    let linked = fs::hard_link(&staging, pid_path);
    let _ = fs::remove_file(&staging);
    match linked {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Read a PID from the given file.
pub fn read_pid_file(pid_path: &Path) -> BridgeResult<Option<u32>> {
    if !pid_path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(pid_path)?;
    let pid = content
        .trim()
        .parse::<u32>()
        .map_err(|e| BridgeError::PidFile(format!("Invalid PID: {}", e)))?;
    Ok(Some(pid))
}

/// Clean up PID file if it exists.
pub fn cleanup_pid_file(pid_path: &Path) -> BridgeResult<()> {
    match fs::remove_file(pid_path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Whether a process with `pid` exists.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // Signal 0 performs the permission and existence checks only.
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    false
}

/// Owns the PID file while the bridge runs; removes it on drop.
#[derive(Debug)]
pub struct PidGuard {
    path: PathBuf,
    pid: u32,
}

impl PidGuard {
    /// Claim `pid_path` for this process.
    ///
    /// Fails with [`BridgeError::AlreadyRunning`] if the file names another
    /// live process. Stale or unreadable PID files are replaced. Of two
    /// processes acquiring at once, only one wins.
    pub fn acquire(pid_path: &Path) -> BridgeResult<Self> {
        let pid = std::process::id();
        if claim_pid_file(pid_path, pid)? {
            return Ok(Self::owning(pid_path, pid));
        }

        match read_pid_file(pid_path) {
            Ok(Some(owner)) if owner == pid => return Ok(Self::owning(pid_path, pid)),
            Ok(Some(owner)) if is_process_alive(owner) => {
                return Err(BridgeError::AlreadyRunning(owner));
            }
            Ok(Some(owner)) => debug!(pid = owner, "Replacing stale PID file"),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "Replacing unreadable PID file"),
        }
        cleanup_pid_file(pid_path)?;

        if claim_pid_file(pid_path, pid)? {
            return Ok(Self::owning(pid_path, pid));
        }
        // Another process claimed it after the stale file was removed.
        match read_pid_file(pid_path)? {
            Some(owner) => Err(BridgeError::AlreadyRunning(owner)),
            None => Err(BridgeError::PidFile(
                "PID file disappeared while acquiring".into(),
            )),
        }
    }

    fn owning(pid_path: &Path, pid: u32) -> Self {
        Self {
            path: pid_path.to_path_buf(),
            pid,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for PidGuard {
    fn drop(&mut self) {
        // Leave the file alone if another process has since claimed it.
        if matches!(read_pid_file(&self.path), Ok(Some(pid)) if pid == self.pid) {
            if let Err(err) = cleanup_pid_file(&self.path) {
                warn!(error = %err, "Failed to remove PID file");
            }
        }
    }
}
