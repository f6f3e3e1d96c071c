//! Persisted application settings.

mod io;
mod types;

pub use io::{CONFIG_FILE_NAME, config_path, load_from_path, load_or_default, save, save_to_path};
pub use types::{AppSettings, ConfigError, DEFAULT_SOURCE_NAME};
