//! Tracing setup for command-line runs.
//!
//! Each run logs to its own file under `<app dir>/logs`, named after the
//! start time and the subcommand, and only warnings reach stderr so command
//! output on stdout stays clean. `VAULTDIFF_LOG` overrides both filters.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs::{AppDirError, AppDirs};

/// Environment variable holding a filter directive for both outputs.
pub const LOG_FILTER_ENV: &str = "VAULTDIFF_LOG";

const LOG_FILE_PREFIX: &str = "vaultdiff_";
const LOG_FILE_SUFFIX: &str = ".log";
const KEEP_LOG_FILES: usize = 20;
const STDERR_DEFAULT_FILTER: &str = "warn";
const FILE_DEFAULT_FILTER: &str = "info,vaultdiff=debug";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error(transparent)]
    AppDir(#[from] AppDirError),
    #[error("Failed to read log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log file name: {0}")]
    FormatTime(#[from] time::error::Format),
    #[error("Failed to create log file in {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: tracing_appender::rolling::InitError,
    },
    #[error("Failed to install tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install the global subscriber for a run of `command` and return the
/// path of its log file. A second call returns `Ok(None)`.
pub fn init(dirs: &AppDirs, command: &str) -> Result<Option<PathBuf>, LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(None);
    }
    let log_dir = dirs.ensure_logs()?;
    let file_name = log_file_name(now_local_or_utc(), command)?;
    let appender = rolling::Builder::new()
        .filename_prefix(&file_name)
        .build(&log_dir)
        .map_err(|source| LoggingError::CreateLogFile {
            path: log_dir.clone(),
            source,
        })?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let override_directive = std::env::var(LOG_FILTER_ENV).ok();
    let stderr_layer = fmt::layer()
        .compact()
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter_or_default(override_directive.as_deref(), STDERR_DEFAULT_FILTER));
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(local_timer())
        .with_writer(file_writer)
        .with_filter(filter_or_default(override_directive.as_deref(), FILE_DEFAULT_FILTER));
    tracing::subscriber::set_global_default(Registry::default().with(stderr_layer).with(file_layer))?;
    let _ = LOG_GUARD.set(guard);

    let pruned = prune_old_logs(&log_dir, KEEP_LOG_FILES)?;
    let log_path = log_dir.join(file_name);
    tracing::debug!(path = %log_path.display(), pruned, "Logging initialized");
    Ok(Some(log_path))
}

/// `vaultdiff_<local time>_<command>.log`; names sort in start order.
fn log_file_name(started: OffsetDateTime, command: &str) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = started.format(NAME_FORMAT)?;
    let command: String = command
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    Ok(format!("{LOG_FILE_PREFIX}{stamp}_{command}{LOG_FILE_SUFFIX}"))
}

fn is_run_log(name: &str) -> bool {
    name.starts_with(LOG_FILE_PREFIX) && name.ends_with(LOG_FILE_SUFFIX)
}

/// Delete the oldest run logs beyond `keep`. Other files in `dir` are left alone.
fn prune_old_logs(dir: &Path, keep: usize) -> Result<usize, LoggingError> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_run_log(name))
        .collect();
    if names.len() <= keep {
        return Ok(0);
    }
    names.sort();
    let excess = names.len() - keep;
    for name in &names[..excess] {
        let path = dir.join(name);
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(excess)
}

fn filter_or_default(directive: Option<&str>, default: &str) -> EnvFilter {
    directive
        .filter(|text| !text.trim().is_empty())
        .and_then(|text| EnvFilter::try_new(text).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

fn local_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}
