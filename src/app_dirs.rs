//! Location of the `.vaultdiff` directory holding settings, the default
//! catalog and log files.
//!
//! The directory lives under the OS config directory unless
//! `VAULTDIFF_CONFIG_HOME` names another base.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory created under the base directory.
pub const APP_DIR_NAME: &str = ".vaultdiff";
/// Environment variable that relocates the base directory.
pub const CONFIG_HOME_ENV: &str = "VAULTDIFF_CONFIG_HOME";

const LOGS_DIR_NAME: &str = "logs";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No config directory available; set {CONFIG_HOME_ENV} to choose one")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Resolved application directory. Nothing is created until asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    root: PathBuf,
}

impl AppDirs {
    /// Resolve from `VAULTDIFF_CONFIG_HOME`, falling back to the OS config dir.
    pub fn discover() -> Result<Self, AppDirError> {
        let os_default = BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf());
        select_base(std::env::var_os(CONFIG_HOME_ENV), os_default)
            .map(Self::under)
            .ok_or(AppDirError::NoBaseDir)
    }

    /// The application directory inside `base`.
    pub fn under(base: impl AsRef<Path>) -> Self {
        Self {
            root: base.as_ref().join(APP_DIR_NAME),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the application directory if needed and return it.
    pub fn ensure_root(&self) -> Result<&Path, AppDirError> {
        create_dir(&self.root)?;
        Ok(&self.root)
    }

    /// Create the log directory if needed and return it.
    pub fn ensure_logs(&self) -> Result<PathBuf, AppDirError> {
        let path = self.root.join(LOGS_DIR_NAME);
        create_dir(&path)?;
        Ok(path)
    }
}

/// An explicit base wins unless it is blank.
fn select_base(explicit: Option<OsString>, os_default: Option<PathBuf>) -> Option<PathBuf> {
    explicit
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or(os_default)
}

fn create_dir(path: &Path) -> Result<(), AppDirError> {
    std::fs::create_dir_all(path).map_err(|source| AppDirError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
