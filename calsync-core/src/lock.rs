//! Single-instance lock for a synchronization pass.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CalSyncError, CalSyncResult};

/// A lock guard that removes the lock file when dropped.
///
/// The file records the PID and start time of its holder. A stale lock
/// left behind by a crashed run is never broken automatically; the error
/// shows who created it so it can be removed by hand.
#[derive(Debug)]
pub struct SyncLock {
    path: PathBuf,
}

impl SyncLock {
    /// Create the lock file, failing if it already exists.
    pub fn acquire(path: &Path) -> CalSyncResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(CalSyncError::Locked {
                    path: path.to_path_buf(),
                    holder: describe_holder(path),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let lock = SyncLock {
            path: path.to_path_buf(),
        };

        // Contents are informational only; the lock is held either way.
        let _ = writeln!(
            file,
            "pid {} since {}",
            std::process::id(),
            chrono::Local::now().to_rfc3339()
        );

        debug!("Acquired lock {}", path.display());
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Released lock {}", self.path.display()),
            Err(e) => warn!("Failed to remove lock file {}: {}", self.path.display(), e),
        }
    }
}

fn describe_holder(path: &Path) -> String {
    std::fs::read_to_string(path)
        .ok()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .map(|c| format!(" (held by {})", c))
        .unwrap_or_default()
}
