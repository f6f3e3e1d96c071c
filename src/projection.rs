//! Aggregate views over diff verdicts.

use serde::Serialize;

use crate::catalog::{DiffResult, DiffStatus};

/// Count of verdicts per status for one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub present: usize,
    pub missing: usize,
    pub uncertain: usize,
}

impl DiffSummary {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a DiffResult>) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.record(result.status, 1);
        }
        summary
    }

    /// Add `count` verdicts of `status`.
    pub fn record(&mut self, status: DiffStatus, count: usize) {
        match status {
            DiffStatus::Present => self.present += count,
            DiffStatus::Missing => self.missing += count,
            DiffStatus::Uncertain => self.uncertain += count,
        }
    }

    pub fn count(&self, status: DiffStatus) -> usize {
        match status {
            DiffStatus::Present => self.present,
            DiffStatus::Missing => self.missing,
            DiffStatus::Uncertain => self.uncertain,
        }
    }

    pub fn total(&self) -> usize {
        self.present + self.missing + self.uncertain
    }

    /// True when every asset is confidently backed up.
    pub fn is_fully_backed_up(&self) -> bool {
        self.missing == 0 && self.uncertain == 0
    }
}

impl std::fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Present: {}\nMissing: {}\nUncertain: {}",
            self.present, self.missing, self.uncertain
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::tempdir;

    use super::*;
    use crate::catalog::db::DB_FILE_NAME;
    use crate::catalog::{CatalogStore, RemoteAsset};

    fn results() -> Vec<DiffResult> {
        let a = RemoteAsset::new("icloud", "A", "a.jpg", 1);
        let b = RemoteAsset::new("icloud", "B", "b.jpg", 1);
        let c = RemoteAsset::new("icloud", "C", "c.jpg", 1);
        vec![
            DiffResult::present(&a, Path::new("/x/a.jpg"), "r"),
            DiffResult::missing(&b, "r"),
            DiffResult::missing(&c, "r"),
        ]
    }

    #[test]
    fn counts_results_in_memory() {
        let summary = DiffSummary::from_results(&results());
        assert_eq!(summary, DiffSummary { present: 1, missing: 2, uncertain: 0 });
        assert_eq!(summary.total(), 3);
        assert!(!summary.is_fully_backed_up());
    }

    #[test]
    fn stored_summary_matches_committed_rows() {
        let dir = tempdir().unwrap();
        let store = CatalogStore::open(dir.path().join(DB_FILE_NAME)).unwrap();
        assert_eq!(store.diff_summary("icloud").unwrap(), DiffSummary::default());

        store.save_diff_results(&results()).unwrap();
        let summary = store.diff_summary("icloud").unwrap();
        assert_eq!(summary, DiffSummary::from_results(&results()));
        assert_eq!(summary.count(DiffStatus::Missing), 2);
        assert_eq!(store.diff_summary("other").unwrap().total(), 0);
    }

    #[test]
    fn display_lists_each_status() {
        let text = DiffSummary { present: 3, missing: 1, uncertain: 2 }.to_string();
        assert_eq!(text, "Present: 3\nMissing: 1\nUncertain: 2");
    }
}
