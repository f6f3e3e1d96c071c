use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::db::DB_FILE_NAME;

/// Source name used when neither the command line nor the config names one.
pub const DEFAULT_SOURCE_NAME: &str = "icloud";

/// Settings stored in `config.toml`.
///
/// Config keys (TOML): `database_path`, `source_name`, `local_root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Catalog location; `None` means `catalog.db` in the app directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_source_name")]
    pub source_name: String,
    /// Archive root scanned when no root is given explicitly.
    #[serde(default)]
    pub local_root: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            source_name: default_source_name(),
            local_root: None,
        }
    }
}

impl AppSettings {
    /// Blank strings in the file count as unset.
    pub(super) fn normalized(mut self) -> Self {
        if self.source_name.trim().is_empty() {
            self.source_name = default_source_name();
        }
        if self
            .local_root
            .as_ref()
            .is_some_and(|root| root.as_os_str().is_empty())
        {
            self.local_root = None;
        }
        if self
            .database_path
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            self.database_path = None;
        }
        self
    }

    /// Catalog path, falling back to `catalog.db` inside `app_dir`.
    pub fn resolved_database_path(&self, app_dir: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| app_dir.join(DB_FILE_NAME))
    }
}

fn default_source_name() -> String {
    DEFAULT_SOURCE_NAME.to_string()
}

/// Errors that may occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    /// No usable config directory found.
    #[error("No suitable config directory found")]
    NoConfigDir,
}
