//! Catalog operations behind the command line: scan, import, diff and report.
//!
//! Every mutating operation claims the in-process [`OperationTracker`], then the
//! cross-process [`CatalogLock`], and records a row in the job log before doing
//! its work inside a single catalog transaction.

mod tracker;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{
    CatalogError, CatalogLock, CatalogStore, DiffStatus, JobKind, JobRecord, JobStatus, LockError,
};
use crate::inventory::{self, InventoryError};
use crate::projection::DiffSummary;
use crate::reconcile;
use crate::scanner::{self, ScanError};

pub use tracker::{OperationTicket, OperationTracker};

#[derive(Debug, Error)]
pub enum OpsError {
    /// A required input was neither passed nor configured.
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),
    #[error("Another {0} operation is already running")]
    Busy(JobKind),
    #[error(transparent)]
    Locked(#[from] LockError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub files: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub source_name: String,
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub source_name: String,
    pub remote_assets: usize,
    pub local_files: usize,
    pub summary: DiffSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub written: usize,
}

/// Entry point for running catalog operations against one store.
pub struct Operations {
    store: CatalogStore,
    tracker: OperationTracker,
}

impl Operations {
    /// Open (creating if needed) the catalog at `db_path`.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, OpsError> {
        Ok(Self::new(CatalogStore::open(db_path)?))
    }

    pub fn new(store: CatalogStore) -> Self {
        Self::with_tracker(store, OperationTracker::default())
    }

    /// Share `tracker` with other handles writing to the same catalog.
    pub fn with_tracker(store: CatalogStore, tracker: OperationTracker) -> Self {
        Self { store, tracker }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn tracker(&self) -> &OperationTracker {
        &self.tracker
    }

    /// Walk `root` and replace the local-file catalog with what was found.
    pub fn scan_local(&self, root: Option<&Path>) -> Result<ScanReport, OpsError> {
        let root = root
            .filter(|root| !root.as_os_str().is_empty())
            .ok_or(OpsError::MissingSetting("local root"))?;
        self.run_job(
            JobKind::Scan,
            None,
            |store| {
                let outcome = scanner::scan_local(root)?;
                store.replace_local_files(&outcome.files)?;
                Ok(ScanReport {
                    root: root.to_path_buf(),
                    files: outcome.files.len(),
                    skipped: outcome.skipped,
                })
            },
            |report| format!("{} files, {} skipped", report.files, report.skipped),
        )
    }

    /// Upsert every asset in a line-delimited inventory file.
    pub fn import_remote(&self, source_name: &str, inventory_path: &Path) -> Result<ImportReport, OpsError> {
        let source_name = require_source(source_name)?;
        self.run_job(
            JobKind::Import,
            Some(source_name),
            |store| {
                let file = File::open(inventory_path).map_err(|source| OpsError::Io {
                    path: inventory_path.to_path_buf(),
                    source,
                })?;
                let outcome = inventory::read_remote_assets(BufReader::new(file), source_name)?;
                store.upsert_remote_assets(&outcome.assets)?;
                Ok(ImportReport {
                    source_name: source_name.to_string(),
                    imported: outcome.assets.len(),
                    skipped: outcome.skipped,
                })
            },
            |report| format!("{} imported, {} skipped", report.imported, report.skipped),
        )
    }

    /// Reconcile a source against the current local catalog and store the verdicts.
    pub fn run_diff(&self, source_name: &str) -> Result<DiffReport, OpsError> {
        let source_name = require_source(source_name)?;
        self.run_job(
            JobKind::Diff,
            Some(source_name),
            |store| {
                let assets = store.load_remote_assets(source_name)?;
                if assets.is_empty() {
                    warn!(source = source_name, "No remote assets imported for source");
                }
                let local_files = store.load_local_files()?;
                let results = reconcile::compute_diff(&assets, &local_files);
                store.save_diff_results(&results)?;
                Ok(DiffReport {
                    source_name: source_name.to_string(),
                    remote_assets: assets.len(),
                    local_files: local_files.len(),
                    summary: DiffSummary::from_results(&results),
                })
            },
            |report| {
                let summary = &report.summary;
                format!(
                    "{} present, {} missing, {} uncertain",
                    summary.present, summary.missing, summary.uncertain
                )
            },
        )
    }

    /// Write the stored verdicts for a source to `out` as line-delimited JSON.
    pub fn export_report(
        &self,
        source_name: &str,
        out: &Path,
        status: Option<DiffStatus>,
    ) -> Result<ExportReport, OpsError> {
        let source_name = require_source(source_name)?;
        self.run_job(
            JobKind::Report,
            Some(source_name),
            |store| {
                let results = match status {
                    Some(status) => store.load_diff_results_with_status(source_name, status)?,
                    None => store.load_latest_diff_results(source_name)?,
                };
                let io_err = |source| OpsError::Io {
                    path: out.to_path_buf(),
                    source,
                };
                if let Some(parent) = out.parent()
                    && !parent.as_os_str().is_empty()
                {
                    std::fs::create_dir_all(parent).map_err(io_err)?;
                }
                let file = File::create(out).map_err(io_err)?;
                let written = inventory::write_diff_results(BufWriter::new(file), &results)?;
                Ok(ExportReport {
                    path: out.to_path_buf(),
                    written,
                })
            },
            |report| format!("{} results written", report.written),
        )
    }

    /// Counts of the stored verdicts for a source.
    pub fn summary(&self, source_name: &str) -> Result<DiffSummary, OpsError> {
        Ok(self.store.diff_summary(require_source(source_name)?)?)
    }

    pub fn recent_jobs(&self, limit: usize) -> Result<Vec<JobRecord>, OpsError> {
        Ok(self.store.recent_jobs(limit)?)
    }

    fn run_job<T>(
        &self,
        kind: JobKind,
        source_name: Option<&str>,
        work: impl FnOnce(&CatalogStore) -> Result<T, OpsError>,
        describe: impl FnOnce(&T) -> String,
    ) -> Result<T, OpsError> {
        let _ticket = self.tracker.try_begin(kind).ok_or_else(|| {
            OpsError::Busy(self.tracker.active().unwrap_or(kind))
        })?;
        let _lock = CatalogLock::try_acquire(self.store.path())?;
        let job = self.store.start_job(kind, source_name)?;
        match work(&self.store) {
            Ok(outcome) => {
                let detail = describe(&outcome);
                info!(job = %kind, source = source_name.unwrap_or("-"), "{detail}");
                self.store.finish_job(job, JobStatus::Completed, Some(&detail))?;
                Ok(outcome)
            }
            Err(err) => {
                let detail = err.to_string();
                if let Err(finish_err) = self.store.finish_job(job, JobStatus::Failed, Some(&detail)) {
                    warn!(job = %kind, error = %finish_err, "Failed to record job failure");
                }
                Err(err)
            }
        }
    }
}

fn require_source(source_name: &str) -> Result<&str, OpsError> {
    let trimmed = source_name.trim();
    if trimmed.is_empty() {
        return Err(OpsError::MissingSetting("source name"));
    }
    Ok(trimmed)
}
