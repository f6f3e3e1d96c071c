//! Local archive enumeration.

mod walk;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::catalog::LocalFile;

pub use walk::is_junk_file;

/// Files gathered from one walk of a local root.
#[derive(Debug, Default, Clone)]
pub struct ScanOutcome {
    /// Regular files in enumeration order.
    pub files: Vec<LocalFile>,
    /// Entries that could not be read and were left out.
    pub skipped: usize,
}

/// Errors that abort a scan. Unreadable entries below the root are skipped instead.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scan root does not exist: {0}")]
    NotFound(PathBuf),
    #[error("Scan root is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Walk `root` recursively and describe every regular, non-junk file under it.
///
/// Within a directory, files come first sorted by name, then each subdirectory
/// is walked in name order. Links to files are followed; links to directories are not.
pub fn scan_local(root: &Path) -> Result<ScanOutcome, ScanError> {
    let root = resolve_root(root)?;
    let outcome = walk::collect_files(&root)?;
    info!(
        root = %root.display(),
        files = outcome.files.len(),
        skipped = outcome.skipped,
        "Scanned local files"
    );
    Ok(outcome)
}

fn resolve_root(root: &Path) -> Result<PathBuf, ScanError> {
    let canonical = root.canonicalize().map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => ScanError::NotFound(root.to_path_buf()),
        _ => ScanError::Io {
            path: root.to_path_buf(),
            source,
        },
    })?;
    if !canonical.is_dir() {
        return Err(ScanError::NotADirectory(canonical));
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn names(outcome: &ScanOutcome, root: &Path) -> Vec<String> {
        outcome
            .files
            .iter()
            .map(|file| {
                file.full_path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn lists_files_before_subdirectories_in_name_order() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("b/inner")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::write(root.join("z.jpg"), b"zz").unwrap();
        fs::write(root.join("m.jpg"), b"m").unwrap();
        fs::write(root.join("a/one.jpg"), b"1").unwrap();
        fs::write(root.join("b/two.jpg"), b"22").unwrap();
        fs::write(root.join("b/inner/three.jpg"), b"333").unwrap();

        let outcome = scan_local(&root).unwrap();
        assert_eq!(
            names(&outcome, &root),
            vec!["m.jpg", "z.jpg", "a/one.jpg", "b/two.jpg", "b/inner/three.jpg"]
        );
        assert_eq!(outcome.files[1].size_bytes, 2);
        assert_eq!(outcome.files[1].filename, "z.jpg");
        assert!(outcome.files.iter().all(|file| file.full_path.is_absolute()));
        assert_eq!(outcome.skipped, 0);
    }

    #[test]
    fn junk_files_are_left_out() {
        let dir = tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        for name in [".DS_Store", "Thumbs.db", "desktop.ini", "._IMG_1.jpg", "IMG_1.jpg"] {
            fs::write(root.join(name), b"x").unwrap();
        }
        let outcome = scan_local(&root).unwrap();
        assert_eq!(names(&outcome, &root), vec!["IMG_1.jpg"]);
    }

    #[test]
    fn missing_root_is_not_found() {
        let dir = tempdir().unwrap();
        let err = scan_local(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, ScanError::NotFound(_)));
    }

    #[test]
    fn file_root_is_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("f.txt");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(scan_local(&file), Err(ScanError::NotADirectory(_))));
    }

    #[test]
    fn empty_root_yields_no_files() {
        let dir = tempdir().unwrap();
        let outcome = scan_local(dir.path()).unwrap();
        assert!(outcome.files.is_empty());
    }
}
