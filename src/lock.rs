// src/lock.rs

//! Exclusive lock on an environment for the duration of a run
//!
//! Runs assume they own the environment's site-packages and search-path
//! files. The lock lives at `<env>/.patchbay.lock`; a second run against
//! the same environment fails with a precondition error instead of
//! interleaving installs and patches.
//!
//! The lock is advisory (`flock(LOCK_EX)`), released when the handle is
//! dropped or the process exits.

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lock file name inside the environment root
pub const LOCK_FILE: &str = ".patchbay.lock";

/// Held run lock
pub struct RunLock {
    /// Kept open to maintain the lock
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the lock without blocking
    ///
    /// Fails with `PreconditionError` when another run holds it.
    pub fn try_acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                info!("Acquired run lock at {}", path.display());
                let lock = Self { file, path };
                lock.write_pid()?;
                Ok(lock)
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                let holder = Self::holder_pid(&path)
                    .map(|pid| format!(" (pid {})", pid))
                    .unwrap_or_default();
                Err(Error::PreconditionError(format!(
                    "another provisioning run holds {}{}",
                    path.display(),
                    holder
                )))
            }
            Err(e) => Err(Error::IoError(format!(
                "Failed to lock {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Check whether any process holds the lock
    pub fn is_held<P: AsRef<Path>>(path: P) -> bool {
        let Ok(file) = File::open(path.as_ref()) else {
            return false;
        };

        match file.try_lock_exclusive() {
            Ok(()) => {
                let _ = file.unlock();
                false
            }
            Err(_) => true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// PID recorded by the current holder, if any
    pub fn holder_pid<P: AsRef<Path>>(lock_path: P) -> Option<u32> {
        let pid_path = lock_path.as_ref().with_extension("pid");
        fs::read_to_string(pid_path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    fn write_pid(&self) -> Result<()> {
        fs::write(self.path.with_extension("pid"), std::process::id().to_string())?;
        Ok(())
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(self.path.with_extension("pid"));
        debug!("Released run lock at {}", self.path.display());
    }
}
