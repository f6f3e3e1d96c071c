use std::path::Path;

use time::OffsetDateTime;
use tracing::warn;
use time::format_description::well_known::Rfc3339;

use super::CatalogError;

/// Translate rusqlite errors into friendlier CatalogError variants.
pub(super) fn map_sql_error(err: rusqlite::Error) -> CatalogError {
    match err {
        rusqlite::Error::SqliteFailure(sql_err, _)
            if sql_err.extended_code == rusqlite::ffi::SQLITE_BUSY =>
        {
            CatalogError::Busy
        }
        rusqlite::Error::InvalidQuery
        | rusqlite::Error::InvalidParameterName(_)
        | rusqlite::Error::MultipleStatement => CatalogError::Unexpected,
        other => CatalogError::Sql(other),
    }
}

pub(super) fn create_parent_if_needed(path: &Path) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|source| CatalogError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Paths are stored as TEXT. A path that is not valid UTF-8 is stored with
/// replacement characters and no longer names the file on disk.
pub(super) fn path_to_text(path: &Path) -> String {
    match path.to_str() {
        Some(text) => text.to_string(),
        None => {
            let lossy = path.to_string_lossy().into_owned();
            warn!(path = %lossy, "Path is not valid UTF-8; storing a lossy copy");
            lossy
        }
    }
}

pub(super) fn format_timestamp(value: OffsetDateTime) -> Result<String, CatalogError> {
    value.format(&Rfc3339).map_err(|err| CatalogError::InvalidRow {
        table: "timestamp",
        key: value.unix_timestamp().to_string(),
        detail: err.to_string(),
    })
}

pub(super) fn parse_timestamp(
    table: &'static str,
    key: &str,
    text: &str,
) -> Result<OffsetDateTime, CatalogError> {
    OffsetDateTime::parse(text, &Rfc3339).map_err(|err| CatalogError::InvalidRow {
        table,
        key: key.to_string(),
        detail: format!("bad timestamp {text:?}: {err}"),
    })
}

/// SQLite stores INTEGER as i64; larger sizes are rejected rather than clamped.
pub(super) fn size_to_sql(table: &'static str, key: &str, size: u64) -> Result<i64, CatalogError> {
    i64::try_from(size).map_err(|_| CatalogError::InvalidRow {
        table,
        key: key.to_string(),
        detail: format!("size {size} exceeds the storable range"),
    })
}

pub(super) fn size_from_sql(table: &'static str, key: &str, size: i64) -> Result<u64, CatalogError> {
    u64::try_from(size).map_err(|_| CatalogError::InvalidRow {
        table,
        key: key.to_string(),
        detail: format!("negative size {size}"),
    })
}

pub(super) fn now_epoch_seconds() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
