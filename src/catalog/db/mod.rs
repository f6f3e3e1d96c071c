use std::path::{Path, PathBuf};

use rusqlite::{Connection, Transaction};
use thiserror::Error;

/// Read-only snapshot queries.
pub mod read;
/// SQLite schema management for the catalog.
pub mod schema;
/// Write batches and the bulk replace/upsert operations built on them.
pub mod write;
/// Operation history kept alongside the catalog.
pub mod jobs;

mod util;

pub use jobs::{JobId, JobKind, JobRecord, JobStatus};

/// Default filename for a catalog inside the app directory.
pub const DB_FILE_NAME: &str = "catalog.db";

/// Errors returned when reading or writing the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A data operation ran before `initialize`.
    #[error("Catalog not initialized; call initialize() first")]
    NotInitialized,
    /// SQLite query or transaction failed.
    #[error("Catalog storage failure: {0}")]
    Sql(#[from] rusqlite::Error),
    /// Failed to create the directory holding the database file.
    #[error("Could not create catalog directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// A stored row could not be turned back into a record.
    #[error("Invalid {table} row {key}: {detail}")]
    InvalidRow {
        table: &'static str,
        key: String,
        detail: String,
    },
    /// Database is locked or busy.
    #[error("Catalog database is busy, please retry")]
    Busy,
    /// SQLite returned an unexpected result.
    #[error("SQLite returned an unexpected result")]
    Unexpected,
}

impl CatalogError {
    /// True for failures of the storage engine itself rather than caller misuse.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            CatalogError::Sql(_) | CatalogError::Busy | CatalogError::CreateDir { .. } | CatalogError::Unexpected
        )
    }
}

/// Durable store for remote assets, local files and diff results.
pub struct CatalogStore {
    path: PathBuf,
    connection: Option<Connection>,
}

/// Groups catalog mutations into one transaction; dropping it uncommitted rolls back.
pub struct CatalogWriteBatch<'conn> {
    tx: Transaction<'conn>,
}

impl CatalogStore {
    /// Describe a catalog at `path` without touching the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            connection: None,
        }
    }

    /// Open (or create) the catalog and ensure its schema.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let mut store = Self::new(path);
        store.initialize()?;
        Ok(store)
    }

    /// Open the database file and apply the schema. Safe to call on every run.
    pub fn initialize(&mut self) -> Result<(), CatalogError> {
        if self.connection.is_none() {
            util::create_parent_if_needed(&self.path)?;
            let connection = Connection::open(&self.path).map_err(util::map_sql_error)?;
            apply_pragmas(&connection)?;
            self.connection = Some(connection);
        }
        schema::apply_schema(self.connection()?)?;
        tracing::debug!(path = %self.path.display(), "Catalog initialized");
        Ok(())
    }

    /// Location of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_initialized(&self) -> bool {
        self.connection.is_some()
    }

    /// Start a write batch that wraps related mutations in a single transaction.
    pub fn write_batch(&self) -> Result<CatalogWriteBatch<'_>, CatalogError> {
        let tx = self
            .connection()?
            .unchecked_transaction()
            .map_err(util::map_sql_error)?;
        Ok(CatalogWriteBatch { tx })
    }

    fn connection(&self) -> Result<&Connection, CatalogError> {
        self.connection.as_ref().ok_or(CatalogError::NotInitialized)
    }
}

fn apply_pragmas(connection: &Connection) -> Result<(), CatalogError> {
    connection
        .execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;
             PRAGMA temp_store=MEMORY;",
        )
        .map_err(util::map_sql_error)
}
