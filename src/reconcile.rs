//! Matching of remote assets against the local-file catalog.
//!
//! Rules run in precedence order per asset and the first that fires decides:
//! an asset-id prefix on any local filename, then a unique filename+size
//! candidate (several candidates make the verdict uncertain), then missing.
//! Filename comparisons fold case; sizes must match exactly.

use std::collections::HashMap;

use crate::catalog::{DiffResult, LocalFile, RemoteAsset};

pub const REASON_ASSET_ID_PREFIX: &str = "exact match by asset ID prefix";
pub const REASON_FILENAME_AND_SIZE: &str = "matched by filename and size";
pub const REASON_NO_MATCH: &str = "no matching local file found";

/// Reason recorded when `count` local files tie on filename and size.
pub fn ambiguous_reason(count: usize) -> String {
    format!("ambiguous candidates ({count} files match)")
}

/// Reconcile every remote asset against `local_files`.
///
/// Returns one result per asset in input order.
pub fn compute_diff(remote_assets: &[RemoteAsset], local_files: &[LocalFile]) -> Vec<DiffResult> {
    let index = LocalIndex::build(local_files);
    remote_assets
        .iter()
        .map(|asset| index.match_asset(asset))
        .collect()
}

/// Case-folded view of a local-file snapshot, built once per diff run.
pub struct LocalIndex<'a> {
    files: &'a [LocalFile],
    folded_names: Vec<String>,
    by_name: HashMap<String, Vec<usize>>,
}

impl<'a> LocalIndex<'a> {
    pub fn build(files: &'a [LocalFile]) -> Self {
        let folded_names: Vec<String> = files.iter().map(|file| fold(&file.filename)).collect();
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::with_capacity(files.len());
        for (idx, name) in folded_names.iter().enumerate() {
            by_name.entry(name.clone()).or_default().push(idx);
        }
        Self {
            files,
            folded_names,
            by_name,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Apply the matching rules to a single asset.
    pub fn match_asset(&self, asset: &RemoteAsset) -> DiffResult {
        if let Some(file) = self.find_by_asset_id(&asset.source_asset_id) {
            return DiffResult::present(asset, &file.full_path, REASON_ASSET_ID_PREFIX);
        }
        let candidates = self.candidates_by_name_and_size(&asset.filename, asset.size_bytes);
        match candidates.as_slice() {
            [] => DiffResult::missing(asset, REASON_NO_MATCH),
            [only] => DiffResult::present(asset, &only.full_path, REASON_FILENAME_AND_SIZE),
            many => DiffResult::uncertain(asset, ambiguous_reason(many.len())),
        }
    }

    /// First file, in snapshot order, whose name starts with `<asset_id>_`.
    fn find_by_asset_id(&self, asset_id: &str) -> Option<&'a LocalFile> {
        // An empty id would turn the prefix into a bare "_".
        if asset_id.is_empty() {
            return None;
        }
        let prefix = format!("{}_", fold(asset_id));
        self.folded_names
            .iter()
            .position(|name| name.starts_with(&prefix))
            .map(|idx| &self.files[idx])
    }

    fn candidates_by_name_and_size(&self, filename: &str, size_bytes: u64) -> Vec<&'a LocalFile> {
        let files = self.files;
        self.by_name
            .get(&fold(filename))
            .map(|indices| {
                indices
                    .iter()
                    .map(|&idx| &files[idx])
                    .filter(|file| file.size_bytes == size_bytes)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use time::OffsetDateTime;

    use super::*;
    use crate::catalog::DiffStatus;

    fn asset(id: &str, filename: &str, size: u64) -> RemoteAsset {
        RemoteAsset::new("icloud", id, filename, size)
    }

    fn local(path: &str, size: u64) -> LocalFile {
        LocalFile::new(path, size, OffsetDateTime::UNIX_EPOCH)
    }

    #[test]
    fn asset_id_prefix_wins_end_to_end() {
        let results = compute_diff(
            &[asset("ABC123", "photo.jpg", 1000)],
            &[local("/b/ABC123_photo.jpg", 1000)],
        );
        assert_eq!(results[0].status, DiffStatus::Present);
        assert_eq!(results[0].reason, REASON_ASSET_ID_PREFIX);
        assert_eq!(results[0].matched_local_path.as_deref(), Some(Path::new("/b/ABC123_photo.jpg")));
    }

    #[test]
    fn asset_id_prefix_beats_filename_and_size_and_ignores_size() {
        let files = [
            local("/a/photo.jpg", 1000),
            local("/b/abc123_renamed.png", 7),
        ];
        let results = compute_diff(&[asset("ABC123", "photo.jpg", 1000)], &files);
        assert_eq!(results[0].reason, REASON_ASSET_ID_PREFIX);
        assert_eq!(results[0].matched_local_path, Some(PathBuf::from("/b/abc123_renamed.png")));
    }

    #[test]
    fn asset_id_prefix_picks_first_in_enumeration_order() {
        let files = [local("/z/ID_one.jpg", 1), local("/a/id_two.jpg", 2)];
        let results = compute_diff(&[asset("id", "x.jpg", 5)], &files);
        assert_eq!(results[0].matched_local_path, Some(PathBuf::from("/z/ID_one.jpg")));
    }

    #[test]
    fn asset_id_without_separator_does_not_count_as_prefix() {
        let results = compute_diff(&[asset("ABC", "x.jpg", 1)], &[local("/a/ABCDEF.jpg", 1)]);
        assert_eq!(results[0].status, DiffStatus::Missing);
    }

    #[test]
    fn empty_asset_id_never_matches_by_prefix() {
        let results = compute_diff(&[asset("", "x.jpg", 1)], &[local("/a/_x.jpg", 9)]);
        assert_eq!(results[0].status, DiffStatus::Missing);
    }

    #[test]
    fn filename_match_ignores_case() {
        let results = compute_diff(&[asset("G1", "Photo.JPG", 42)], &[local("/a/photo.jpg", 42)]);
        assert_eq!(results[0].status, DiffStatus::Present);
        assert_eq!(results[0].reason, REASON_FILENAME_AND_SIZE);
        assert_eq!(results[0].matched_local_path, Some(PathBuf::from("/a/photo.jpg")));
    }

    #[test]
    fn size_must_match_exactly() {
        let results = compute_diff(&[asset("G1", "a.jpg", 42)], &[local("/a/a.jpg", 43)]);
        assert_eq!(results[0].status, DiffStatus::Missing);
        assert_eq!(results[0].reason, REASON_NO_MATCH);
        assert!(results[0].matched_local_path.is_none());
    }

    #[test]
    fn tied_candidates_are_uncertain_with_count() {
        let files = [
            local("/one/v.mp4", 10_000),
            local("/two/v.mp4", 10_000),
            local("/three/v.mp4", 9_999),
        ];
        let results = compute_diff(&[asset("X", "v.mp4", 10_000)], &files);
        assert_eq!(results[0].status, DiffStatus::Uncertain);
        assert!(results[0].reason.contains("2 files match"));
        assert_eq!(results[0].reason, "ambiguous candidates (2 files match)");
        assert!(results[0].matched_local_path.is_none());
    }

    #[test]
    fn missing_when_catalog_has_no_match() {
        let results = compute_diff(&[asset("G", "missing.txt", 500)], &[local("/a/other.txt", 500)]);
        assert_eq!(results[0].status, DiffStatus::Missing);
        assert_eq!(results[0].reason, "no matching local file found");
    }

    #[test]
    fn output_preserves_input_order_and_length() {
        let assets = [
            asset("3", "c.jpg", 3),
            asset("1", "a.jpg", 1),
            asset("2", "b.jpg", 2),
            asset("1", "a.jpg", 1),
        ];
        let results = compute_diff(&assets, &[local("/x/a.jpg", 1)]);
        let ids: Vec<&str> = results.iter().map(|r| r.source_asset_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2", "1"]);
        assert!(results.iter().all(DiffResult::is_consistent));
    }

    #[test]
    fn empty_inputs_produce_expected_shapes() {
        assert!(compute_diff(&[], &[local("/a/a.jpg", 1)]).is_empty());
        let results = compute_diff(&[asset("A", "a.jpg", 1)], &[]);
        assert_eq!(results[0].status, DiffStatus::Missing);
    }

    #[test]
    fn index_groups_folded_names() {
        let files = [local("/a/A.jpg", 1), local("/b/a.JPG", 1)];
        let index = LocalIndex::build(&files);
        assert_eq!(index.len(), 2);
        assert_eq!(index.candidates_by_name_and_size("a.jpg", 1).len(), 2);
        assert!(index.candidates_by_name_and_size("a.jpg", 2).is_empty());
    }
}
