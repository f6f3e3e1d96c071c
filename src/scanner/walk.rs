use std::fs;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use tracing::warn;

use super::{ScanError, ScanOutcome};
use crate::catalog::LocalFile;

/// OS metadata files that never represent user content.
const JUNK_FILE_NAMES: [&str; 3] = [".ds_store", "thumbs.db", "desktop.ini"];

/// True for OS metadata files and `._` AppleDouble companions.
pub fn is_junk_file(name: &str) -> bool {
    name.starts_with("._") || JUNK_FILE_NAMES.contains(&name.to_lowercase().as_str())
}

/// Depth-first walk from `root`; a failure to list `root` itself is fatal.
pub(super) fn collect_files(root: &Path) -> Result<ScanOutcome, ScanError> {
    let mut outcome = ScanOutcome::default();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(source) if dir != root => {
                warn!(
                    dir = %dir.display(),
                    error = %source,
                    "Failed to read directory during scan"
                );
                outcome.skipped += 1;
                continue;
            }
            Err(source) => {
                return Err(ScanError::Io {
                    path: dir.clone(),
                    source,
                });
            }
        };
        let mut files = Vec::new();
        let mut subdirs = Vec::new();
        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        dir = %dir.display(),
                        error = %err,
                        "Failed to read directory entry during scan"
                    );
                    outcome.skipped += 1;
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "Failed to read file type during scan"
                    );
                    outcome.skipped += 1;
                    continue;
                }
            };
            // Links to files count as content; links to directories are not
            // followed, so the walk cannot cycle.
            let is_file = if file_type.is_symlink() {
                match fs::metadata(&path) {
                    Ok(target) => target.is_file(),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "Skipping dangling symlink");
                        outcome.skipped += 1;
                        continue;
                    }
                }
            } else if file_type.is_dir() {
                subdirs.push(path);
                continue;
            } else {
                file_type.is_file()
            };
            if is_file && !is_junk_file(&entry.file_name().to_string_lossy()) {
                files.push(path);
            }
        }
        files.sort();
        for path in files {
            match read_local_file(&path) {
                Ok(file) => outcome.files.push(file),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping unreadable file");
                    outcome.skipped += 1;
                }
            }
        }
        // Reverse so the stack pops subdirectories in name order.
        subdirs.sort();
        stack.extend(subdirs.into_iter().rev());
    }
    Ok(outcome)
}

fn read_local_file(path: &Path) -> Result<LocalFile, ScanError> {
    let io_err = |source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    };
    let meta = path.metadata().map_err(io_err)?;
    let modified = meta.modified().map_err(io_err)?;
    Ok(LocalFile::new(
        PathBuf::from(path),
        meta.len(),
        OffsetDateTime::from(modified),
    ))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn names(outcome: &ScanOutcome) -> Vec<String> {
        outcome.files.iter().map(|file| file.filename.clone()).collect()
    }

    #[test]
    fn junk_detection_is_case_insensitive() {
        assert!(is_junk_file(".DS_Store"));
        assert!(is_junk_file("THUMBS.DB"));
        assert!(is_junk_file("._photo.jpg"));
        assert!(!is_junk_file("photo.jpg"));
        assert!(!is_junk_file("_photo.jpg"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_is_skipped_and_counted() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("kept.jpg"), b"abc").unwrap();
        let locked = root.join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("hidden.jpg"), b"abc").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can still list the directory; nothing to check then.
        let still_readable = fs::read_dir(&locked).is_ok();
        let result = collect_files(root);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if still_readable {
            return;
        }

        let outcome = result.unwrap();
        assert_eq!(names(&outcome), vec!["kept.jpg"]);
        assert_eq!(outcome.skipped, 1);
    }

    #[cfg(unix)]
    #[test]
    fn file_symlinks_are_followed_and_directory_symlinks_are_not() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        let elsewhere = dir.path().join("elsewhere");
        fs::create_dir(&elsewhere).unwrap();
        fs::write(elsewhere.join("target.jpg"), b"12345").unwrap();
        fs::write(elsewhere.join("inside.jpg"), b"1").unwrap();

        let root = dir.path().join("archive");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("real.jpg"), b"abc").unwrap();
        symlink(elsewhere.join("target.jpg"), root.join("linked.jpg")).unwrap();
        symlink(&elsewhere, root.join("linked-dir")).unwrap();
        symlink(root.join("gone.jpg"), root.join("dangling.jpg")).unwrap();
        symlink(&root, root.join("loop")).unwrap();

        let outcome = collect_files(&root).unwrap();
        assert_eq!(names(&outcome), vec!["linked.jpg", "real.jpg"]);
        let linked = &outcome.files[0];
        assert_eq!(linked.size_bytes, 5);
        assert_eq!(linked.full_path, root.join("linked.jpg"));
        assert_eq!(outcome.skipped, 1);
    }
}
