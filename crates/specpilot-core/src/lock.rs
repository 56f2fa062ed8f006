use crate::error::{Result, SpecpilotError};
use crate::paths::Layout;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// What a lock file records about its holder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub acquired_at: chrono::DateTime<chrono::Utc>,
}

/// Exclusive hold on an installation for the length of a mutating command.
///
/// Created with `create_new`, so a second process fails instead of racing.
/// Released (file removed) on drop. A lock left behind by a crashed process
/// has to be deleted by hand.
#[derive(Debug)]
pub struct InstallLock {
    path: PathBuf,
}

impl InstallLock {
    pub fn acquire(layout: &Layout) -> Result<Self> {
        let path = layout.lock_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(SpecpilotError::Locked(path));
            }
            Err(e) => return Err(e.into()),
        };
        let info = LockInfo {
            pid: std::process::id(),
            acquired_at: chrono::Utc::now(),
        };
        let lock = Self { path };
        file.write_all(serde_json::to_string(&info)?.as_bytes())?;
        tracing::debug!(path = %lock.path.display(), "lock acquired");
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), "failed to release lock: {e}");
        }
    }
}
