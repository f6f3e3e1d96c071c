use std::fs;
use std::path::Path;

/// Write a file of exactly `size` bytes, creating parent directories.
pub fn write_sized(path: &Path, size: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, vec![0u8; size]).unwrap();
}

/// Write an inventory with one JSON object per `(id, filename, size)`.
pub fn write_inventory(path: &Path, assets: &[(&str, &str, u64)]) {
    let lines: Vec<String> = assets
        .iter()
        .map(|(id, filename, size)| {
            serde_json::json!({
                "sourceAssetId": id,
                "filename": filename,
                "sizeBytes": size,
            })
            .to_string()
        })
        .collect();
    fs::write(path, lines.join("\n") + "\n").unwrap();
}
