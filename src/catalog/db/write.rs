use rusqlite::params;

use super::util::{format_timestamp, map_sql_error, now_epoch_seconds, path_to_text, size_to_sql};
use super::{CatalogError, CatalogStore, CatalogWriteBatch};
use crate::catalog::{DiffResult, LocalFile, RemoteAsset};

impl CatalogStore {
    /// Replace the whole local-file catalog with `files` in one transaction.
    ///
    /// Rows from earlier scans that are absent from `files` do not survive.
    pub fn replace_local_files(&self, files: &[LocalFile]) -> Result<usize, CatalogError> {
        let mut batch = self.write_batch()?;
        let removed = batch.clear_local_files()?;
        for file in files {
            batch.insert_local_file(file)?;
        }
        batch.commit()?;
        tracing::debug!(removed, inserted = files.len(), "Replaced local file catalog");
        Ok(files.len())
    }

    /// Insert or overwrite remote assets by `(source_name, source_asset_id)`.
    pub fn upsert_remote_assets(&self, assets: &[RemoteAsset]) -> Result<usize, CatalogError> {
        let mut batch = self.write_batch()?;
        for asset in assets {
            batch.upsert_remote_asset(asset)?;
        }
        batch.commit()?;
        Ok(assets.len())
    }

    /// Insert or overwrite diff verdicts by key, refreshing their timestamp.
    pub fn save_diff_results(&self, results: &[DiffResult]) -> Result<usize, CatalogError> {
        let mut batch = self.write_batch()?;
        let now = now_epoch_seconds();
        for result in results {
            batch.upsert_diff_result(result, now)?;
        }
        batch.commit()?;
        Ok(results.len())
    }
}

impl<'conn> CatalogWriteBatch<'conn> {
    /// Delete every local-file row. Returns the number removed.
    pub fn clear_local_files(&mut self) -> Result<usize, CatalogError> {
        self.tx
            .execute("DELETE FROM local_files", [])
            .map_err(map_sql_error)
    }

    /// Insert one local-file row; a duplicate path within the batch overwrites.
    pub fn insert_local_file(&mut self, file: &LocalFile) -> Result<(), CatalogError> {
        let last_write = format_timestamp(file.last_write_utc)?;
        let path = path_to_text(&file.full_path);
        let size = size_to_sql("local_files", &path, file.size_bytes)?;
        self.tx
            .prepare_cached(
                "INSERT INTO local_files (full_path, filename, size_bytes, last_write_utc)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(full_path) DO UPDATE SET filename = excluded.filename,
                                                     size_bytes = excluded.size_bytes,
                                                     last_write_utc = excluded.last_write_utc",
            )
            .map_err(map_sql_error)?
            .execute(params![
                path,
                file.filename,
                size,
                last_write
            ])
            .map_err(map_sql_error)?;
        Ok(())
    }

    /// Insert or replace every non-key field of a remote asset.
    pub fn upsert_remote_asset(&mut self, asset: &RemoteAsset) -> Result<(), CatalogError> {
        let created = asset.created_utc.map(format_timestamp).transpose()?;
        let size = size_to_sql(
            "remote_assets",
            &format!("{}/{}", asset.source_name, asset.source_asset_id),
            asset.size_bytes,
        )?;
        self.tx
            .prepare_cached(
                "INSERT INTO remote_assets
                    (source_name, source_asset_id, filename, size_bytes, created_utc, media_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(source_name, source_asset_id) DO UPDATE SET
                    filename = excluded.filename,
                    size_bytes = excluded.size_bytes,
                    created_utc = excluded.created_utc,
                    media_type = excluded.media_type",
            )
            .map_err(map_sql_error)?
            .execute(params![
                asset.source_name,
                asset.source_asset_id,
                asset.filename,
                size,
                created,
                asset.media_type
            ])
            .map_err(map_sql_error)?;
        Ok(())
    }

    /// Insert or replace a verdict, stamping `created_at` with `now`.
    pub fn upsert_diff_result(&mut self, result: &DiffResult, now: i64) -> Result<(), CatalogError> {
        if !result.is_consistent() {
            return Err(CatalogError::InvalidRow {
                table: "diff_results",
                key: format!("{}/{}", result.source_name, result.source_asset_id),
                detail: format!(
                    "status {} does not agree with matched path {:?}",
                    result.status, result.matched_local_path
                ),
            });
        }
        let matched = result.matched_local_path.as_deref().map(path_to_text);
        self.tx
            .prepare_cached(
                "INSERT INTO diff_results
                    (source_name, source_asset_id, status, reason, matched_local_path, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(source_name, source_asset_id) DO UPDATE SET
                    status = excluded.status,
                    reason = excluded.reason,
                    matched_local_path = excluded.matched_local_path,
                    created_at = excluded.created_at",
            )
            .map_err(map_sql_error)?
            .execute(params![
                result.source_name,
                result.source_asset_id,
                result.status.as_str(),
                result.reason,
                matched,
                now
            ])
            .map_err(map_sql_error)?;
        Ok(())
    }

    /// Commit all batched operations atomically.
    pub fn commit(self) -> Result<(), CatalogError> {
        self.tx.commit().map_err(map_sql_error)
    }
}
