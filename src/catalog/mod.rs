use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub mod db;
pub mod lock;

pub use db::{CatalogError, CatalogStore, CatalogWriteBatch, JobId, JobKind, JobRecord, JobStatus};
pub use lock::{CatalogLock, LockError};

/// One item held by a remote source, keyed by `(source_name, source_asset_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAsset {
    /// May be blank in an inventory file; the importer fills it in.
    #[serde(default)]
    pub source_name: String,
    pub source_asset_id: String,
    pub filename: String,
    pub size_bytes: u64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_utc: Option<OffsetDateTime>,
    #[serde(default)]
    pub media_type: Option<String>,
}

impl RemoteAsset {
    /// Build an asset with only the fields matching depends on.
    pub fn new(
        source_name: impl Into<String>,
        source_asset_id: impl Into<String>,
        filename: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            source_asset_id: source_asset_id.into(),
            filename: filename.into(),
            size_bytes,
            created_utc: None,
            media_type: None,
        }
    }
}

/// One file found on local storage, keyed by its absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalFile {
    pub full_path: PathBuf,
    pub filename: String,
    pub size_bytes: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_write_utc: OffsetDateTime,
}

impl LocalFile {
    /// Build a record whose filename is the final component of `full_path`.
    pub fn new(full_path: impl Into<PathBuf>, size_bytes: u64, last_write_utc: OffsetDateTime) -> Self {
        let full_path = full_path.into();
        let filename = file_name_of(&full_path);
        Self {
            full_path,
            filename,
            size_bytes,
            last_write_utc,
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Reconciliation verdict for a remote asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiffStatus {
    /// Confidently backed up locally.
    Present,
    /// Not found locally.
    Missing,
    /// More than one local file could be the copy.
    Uncertain,
}

impl DiffStatus {
    pub const ALL: [DiffStatus; 3] = [DiffStatus::Present, DiffStatus::Missing, DiffStatus::Uncertain];

    /// Stored and exported representation.
    pub fn as_str(self) -> &'static str {
        match self {
            DiffStatus::Present => "Present",
            DiffStatus::Missing => "Missing",
            DiffStatus::Uncertain => "Uncertain",
        }
    }

    /// Parse a stored status column. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Present" => Some(DiffStatus::Present),
            "Missing" => Some(DiffStatus::Missing),
            "Uncertain" => Some(DiffStatus::Uncertain),
            _ => None,
        }
    }
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verdict for one remote asset, keyed by `(source_name, source_asset_id)`.
///
/// `matched_local_path` is set exactly when `status` is [`DiffStatus::Present`];
/// the constructors are the only way the engine builds results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub source_name: String,
    pub source_asset_id: String,
    pub status: DiffStatus,
    pub reason: String,
    pub matched_local_path: Option<PathBuf>,
}

impl DiffResult {
    pub fn present(asset: &RemoteAsset, matched: &Path, reason: impl Into<String>) -> Self {
        Self {
            source_name: asset.source_name.clone(),
            source_asset_id: asset.source_asset_id.clone(),
            status: DiffStatus::Present,
            reason: reason.into(),
            matched_local_path: Some(matched.to_path_buf()),
        }
    }

    pub fn uncertain(asset: &RemoteAsset, reason: impl Into<String>) -> Self {
        Self::unmatched(asset, DiffStatus::Uncertain, reason)
    }

    pub fn missing(asset: &RemoteAsset, reason: impl Into<String>) -> Self {
        Self::unmatched(asset, DiffStatus::Missing, reason)
    }

    fn unmatched(asset: &RemoteAsset, status: DiffStatus, reason: impl Into<String>) -> Self {
        Self {
            source_name: asset.source_name.clone(),
            source_asset_id: asset.source_asset_id.clone(),
            status,
            reason: reason.into(),
            matched_local_path: None,
        }
    }

    /// True when the path/status pairing holds.
    pub fn is_consistent(&self) -> bool {
        (self.status == DiffStatus::Present) == self.matched_local_path.is_some()
    }
}
