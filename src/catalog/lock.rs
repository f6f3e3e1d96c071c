//! Cross-process guard for catalog writers.
//!
//! SQLite serializes individual transactions, but a scan or diff spans several
//! of them. Mutating operations hold an advisory lock on a sidecar file next to
//! the database so two processes never interleave their runs.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;
use tracing::debug;

/// Errors from lock operations.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Catalog {0} is in use by another process")]
    Locked(PathBuf),
    #[error("Failed to create lock file {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to acquire lock: {0}")]
    AcquireFailed(#[source] io::Error),
}

/// Holds an exclusive lock on a catalog until dropped.
pub struct CatalogLock {
    _file: File,
    lock_path: PathBuf,
}

impl CatalogLock {
    /// Take the lock without waiting; fails with [`LockError::Locked`] when held elsewhere.
    pub fn try_acquire(db_path: &Path) -> Result<Self, LockError> {
        let lock_path = lock_path_for(db_path);
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| LockError::CreateFailed {
                path: lock_path.clone(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|source| LockError::CreateFailed {
                path: lock_path.clone(),
                source,
            })?;
        // fs2's method, not the std inherent one with a different error type.
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                debug!(path = %lock_path.display(), "Acquired catalog lock");
                Ok(Self {
                    _file: file,
                    lock_path,
                })
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                Err(LockError::Locked(db_path.to_path_buf()))
            }
            Err(err) => Err(LockError::AcquireFailed(err)),
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for CatalogLock {
    fn drop(&mut self) {
        debug!(path = %self.lock_path.display(), "Released catalog lock");
    }
}

impl std::fmt::Debug for CatalogLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogLock")
            .field("lock_path", &self.lock_path)
            .finish()
    }
}

/// `/data/catalog.db` locks through `/data/catalog.db.lock`.
pub fn lock_path_for(db_path: &Path) -> PathBuf {
    let mut lock_path = db_path.to_path_buf();
    match lock_path.extension() {
        Some(ext) => {
            let ext = format!("{}.lock", ext.to_string_lossy());
            lock_path.set_extension(ext);
        }
        None => {
            lock_path.set_extension("lock");
        }
    }
    lock_path
}
