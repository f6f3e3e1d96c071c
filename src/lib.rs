//! Reconcile a remote asset inventory against a local archive.
//!
//! Remote assets and local files are persisted in a SQLite catalog; the
//! reconciliation engine classifies each remote asset as present, missing
//! or uncertain and stores the verdicts for reporting.

/// Application directory resolution.
pub mod app_dirs;
/// Records, persistent catalog and the catalog lock.
pub mod catalog;
/// Settings stored in `config.toml`.
pub mod config;
/// JSONL inventory import and report export.
pub mod inventory;
/// Global tracing setup.
pub mod logging;
/// Scan, import, diff and report operations.
pub mod ops;
/// Aggregate counts over diff verdicts.
pub mod projection;
/// The matching rules.
pub mod reconcile;
/// Local directory enumeration.
pub mod scanner;
