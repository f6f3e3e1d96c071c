use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tempfile::TempDir;
use vaultdiff::app_dirs::{APP_DIR_NAME, CONFIG_HOME_ENV};

/// Serializes every test that points the config home somewhere.
static CONFIG_HOME_LOCK: Mutex<()> = Mutex::new(());

/// A throwaway config home exported through `VAULTDIFF_CONFIG_HOME` for as
/// long as the value lives. The previous value comes back on drop.
pub struct TempConfigHome {
    base: TempDir,
    previous: Option<OsString>,
    _serial: MutexGuard<'static, ()>,
}

impl TempConfigHome {
    pub fn new() -> Self {
        let serial = CONFIG_HOME_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let base = tempfile::tempdir().expect("create temp config home");
        let previous = std::env::var_os(CONFIG_HOME_ENV);
        // SAFETY: CONFIG_HOME_LOCK is held, so no other test touches the variable.
        unsafe { std::env::set_var(CONFIG_HOME_ENV, base.path()) };
        Self {
            base,
            previous,
            _serial: serial,
        }
    }

    pub fn base(&self) -> &Path {
        self.base.path()
    }

    /// Where the crate should place its `.vaultdiff` directory.
    pub fn app_dir(&self) -> PathBuf {
        self.base.path().join(APP_DIR_NAME)
    }
}

impl Drop for TempConfigHome {
    fn drop(&mut self) {
        // SAFETY: the lock guard is still held while the fields drop.
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(CONFIG_HOME_ENV, value) },
            None => unsafe { std::env::remove_var(CONFIG_HOME_ENV) },
        }
    }
}
