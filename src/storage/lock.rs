//! Directory Lock
//!
//! Advisory exclusive lock on a data directory, held for the lifetime of
//! an open engine. No crate in this pack's dependency set provides an
//! OS-level file lock (`flock`/`LockFileEx`), so this uses the simplest
//! portable primitive: `O_CREAT | O_EXCL` on a marker file. The lock file
//! is never removed by a crashed process, so a stale lock from an
//! unclean shutdown must be cleared manually — this trades automatic
//! recovery for not silently allowing two engines to open the same
//! directory.
//!
//! The previous iteration of this mechanism dropped the lock's file
//! handle right after acquiring it, which released the lock immediately
//! and let a second process open the same directory concurrently. The
//! handle here is kept alive inside the returned guard for as long as
//! the engine that acquired it is open.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{AtlasError, Result};

const LOCK_FILENAME: &str = "kvstore.lock";

/// Holds the directory lock for as long as it lives. Dropping it releases
/// the lock by removing the marker file.
pub struct DirectoryLock {
    path: PathBuf,
    _file: fs::File,
}

impl DirectoryLock {
    /// Acquire an exclusive lock on `dir`. Fails with
    /// [`AtlasError::Locked`] if another live engine already holds it.
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILENAME);
        let file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    AtlasError::Locked(format!(
                        "data directory {} is already locked by another engine (stale lock file \
                         at {} if no other engine is actually running)",
                        dir.display(),
                        path.display()
                    ))
                } else {
                    AtlasError::Io(e)
                }
            })?;

        Ok(Self { path, _file: file })
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
