use std::path::PathBuf;

use rusqlite::{Row, params};

use super::util::{map_sql_error, parse_timestamp, size_from_sql};
use super::{CatalogError, CatalogStore};
use crate::catalog::{DiffResult, DiffStatus, LocalFile, RemoteAsset};
use crate::projection::DiffSummary;

const DIFF_COLUMNS: &str = "source_name, source_asset_id, status, reason, matched_local_path";

impl CatalogStore {
    /// All remote assets for one source, in first-import order.
    pub fn load_remote_assets(&self, source_name: &str) -> Result<Vec<RemoteAsset>, CatalogError> {
        let mut stmt = self
            .connection()?
            .prepare(
                "SELECT source_name, source_asset_id, filename, size_bytes, created_utc, media_type
                 FROM remote_assets WHERE source_name = ?1 ORDER BY rowid ASC",
            )
            .map_err(map_sql_error)?;
        let raw = stmt
            .query_map(params![source_name], |row| {
                Ok(RawRemoteAsset {
                    source_name: row.get(0)?,
                    source_asset_id: row.get(1)?,
                    filename: row.get(2)?,
                    size_bytes: row.get(3)?,
                    created_utc: row.get(4)?,
                    media_type: row.get(5)?,
                })
            })
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        raw.into_iter().map(RawRemoteAsset::into_asset).collect()
    }

    /// Every local file from the latest scan, in scan enumeration order.
    pub fn load_local_files(&self) -> Result<Vec<LocalFile>, CatalogError> {
        let mut stmt = self
            .connection()?
            .prepare(
                "SELECT full_path, filename, size_bytes, last_write_utc
                 FROM local_files ORDER BY rowid ASC",
            )
            .map_err(map_sql_error)?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        raw.into_iter()
            .map(|(path, filename, size, last_write)| {
                Ok(LocalFile {
                    size_bytes: size_from_sql("local_files", &path, size)?,
                    last_write_utc: parse_timestamp("local_files", &path, &last_write)?,
                    full_path: PathBuf::from(path),
                    filename,
                })
            })
            .collect()
    }

    /// Number of rows in the local-file catalog.
    pub fn count_local_files(&self) -> Result<usize, CatalogError> {
        let count: i64 = self
            .connection()?
            .query_row("SELECT COUNT(*) FROM local_files", [], |row| row.get(0))
            .map_err(map_sql_error)?;
        Ok(count.max(0) as usize)
    }

    /// The current verdict for every asset of a source. Each key holds one row,
    /// so the current row is the latest.
    pub fn load_latest_diff_results(&self, source_name: &str) -> Result<Vec<DiffResult>, CatalogError> {
        let sql = format!(
            "SELECT {DIFF_COLUMNS} FROM diff_results WHERE source_name = ?1 ORDER BY rowid ASC"
        );
        self.query_diff_results(&sql, params![source_name])
    }

    /// Current verdicts of one status for a source.
    pub fn load_diff_results_with_status(
        &self,
        source_name: &str,
        status: DiffStatus,
    ) -> Result<Vec<DiffResult>, CatalogError> {
        let sql = format!(
            "SELECT {DIFF_COLUMNS} FROM diff_results
             WHERE source_name = ?1 AND status = ?2 ORDER BY rowid ASC"
        );
        self.query_diff_results(&sql, params![source_name, status.as_str()])
    }

    /// Per-status counts of the committed verdicts for a source.
    pub fn diff_summary(&self, source_name: &str) -> Result<DiffSummary, CatalogError> {
        let mut stmt = self
            .connection()?
            .prepare(
                "SELECT status, COUNT(*) FROM diff_results
                 WHERE source_name = ?1 GROUP BY status",
            )
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map(params![source_name], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        let mut summary = DiffSummary::default();
        for (status, count) in rows {
            let status = DiffStatus::parse(&status).ok_or_else(|| CatalogError::InvalidRow {
                table: "diff_results",
                key: source_name.to_string(),
                detail: format!("unknown status {status:?}"),
            })?;
            summary.record(status, count.max(0) as usize);
        }
        Ok(summary)
    }

    /// Distinct source names with imported assets, sorted.
    pub fn list_sources(&self) -> Result<Vec<String>, CatalogError> {
        let mut stmt = self
            .connection()?
            .prepare("SELECT DISTINCT source_name FROM remote_assets ORDER BY source_name ASC")
            .map_err(map_sql_error)?;
        stmt.query_map([], |row| row.get::<_, String>(0))
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)
    }

    fn query_diff_results(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<DiffResult>, CatalogError> {
        let mut stmt = self.connection()?.prepare(sql).map_err(map_sql_error)?;
        let raw = stmt
            .query_map(params, raw_diff_row)
            .map_err(map_sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sql_error)?;
        raw.into_iter().map(RawDiffResult::into_result).collect()
    }
}

struct RawRemoteAsset {
    source_name: String,
    source_asset_id: String,
    filename: String,
    size_bytes: i64,
    created_utc: Option<String>,
    media_type: Option<String>,
}

impl RawRemoteAsset {
    fn into_asset(self) -> Result<RemoteAsset, CatalogError> {
        let key = format!("{}/{}", self.source_name, self.source_asset_id);
        let created_utc = self
            .created_utc
            .as_deref()
            .map(|text| parse_timestamp("remote_assets", &key, text))
            .transpose()?;
        Ok(RemoteAsset {
            size_bytes: size_from_sql("remote_assets", &key, self.size_bytes)?,
            created_utc,
            source_name: self.source_name,
            source_asset_id: self.source_asset_id,
            filename: self.filename,
            media_type: self.media_type,
        })
    }
}

struct RawDiffResult {
    source_name: String,
    source_asset_id: String,
    status: String,
    reason: String,
    matched_local_path: Option<String>,
}

fn raw_diff_row(row: &Row<'_>) -> rusqlite::Result<RawDiffResult> {
    Ok(RawDiffResult {
        source_name: row.get(0)?,
        source_asset_id: row.get(1)?,
        status: row.get(2)?,
        reason: row.get(3)?,
        matched_local_path: row.get(4)?,
    })
}

impl RawDiffResult {
    fn into_result(self) -> Result<DiffResult, CatalogError> {
        let key = format!("{}/{}", self.source_name, self.source_asset_id);
        let status = DiffStatus::parse(&self.status).ok_or_else(|| CatalogError::InvalidRow {
            table: "diff_results",
            key: key.clone(),
            detail: format!("unknown status {:?}", self.status),
        })?;
        let result = DiffResult {
            source_name: self.source_name,
            source_asset_id: self.source_asset_id,
            status,
            reason: self.reason,
            matched_local_path: self.matched_local_path.map(PathBuf::from),
        };
        if !result.is_consistent() {
            return Err(CatalogError::InvalidRow {
                table: "diff_results",
                key,
                detail: "matched path must be set exactly when status is Present".into(),
            });
        }
        Ok(result)
    }
}
