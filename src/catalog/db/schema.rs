use rusqlite::Connection;

use super::CatalogError;
use super::util::map_sql_error;

pub(super) fn apply_schema(connection: &Connection) -> Result<(), CatalogError> {
    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS remote_assets (
                source_name TEXT NOT NULL,
                source_asset_id TEXT NOT NULL,
                filename TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                created_utc TEXT,
                media_type TEXT,
                PRIMARY KEY (source_name, source_asset_id)
             );
             CREATE TABLE IF NOT EXISTS local_files (
                full_path TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                last_write_utc TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS diff_results (
                source_name TEXT NOT NULL,
                source_asset_id TEXT NOT NULL,
                status TEXT NOT NULL
                    CHECK (status IN ('Present', 'Missing', 'Uncertain')),
                reason TEXT NOT NULL,
                matched_local_path TEXT,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (source_name, source_asset_id)
             );
             CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_type TEXT NOT NULL,
                source_name TEXT,
                started_at INTEGER NOT NULL,
                completed_at INTEGER,
                status TEXT NOT NULL,
                detail TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_local_files_filename_size
                ON local_files (filename, size_bytes);
             CREATE INDEX IF NOT EXISTS idx_remote_assets_source
                ON remote_assets (source_name);
             CREATE INDEX IF NOT EXISTS idx_diff_results_source_status
                ON diff_results (source_name, status);",
        )
        .map_err(map_sql_error)
}
