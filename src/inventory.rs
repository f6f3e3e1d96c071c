//! Line-delimited JSON import of remote inventories and export of verdicts.

use std::io::{BufRead, Write};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::catalog::{DiffResult, RemoteAsset};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Inventory I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Assets parsed from an inventory plus the number of rejected lines.
#[derive(Debug, Default, Clone)]
pub struct ImportOutcome {
    pub assets: Vec<RemoteAsset>,
    pub skipped: usize,
}

/// Parse one asset per line. Blank lines are ignored; malformed lines,
/// including ones that are not valid UTF-8, are logged and skipped. Field
/// names match without regard to case or underscores. Assets without a
/// source take `default_source`.
pub fn read_remote_assets(
    mut reader: impl BufRead,
    default_source: &str,
) -> Result<ImportOutcome, InventoryError> {
    let mut outcome = ImportOutcome::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let mut line = buf.as_slice();
        if line_no == 1 {
            line = line.strip_prefix(UTF8_BOM).unwrap_or(line);
        }
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }
        let mut asset = match parse_asset(line) {
            Ok(asset) => asset,
            Err(err) => {
                warn!(line = line_no, error = %err, "Skipping malformed inventory line");
                outcome.skipped += 1;
                continue;
            }
        };
        if asset.source_asset_id.trim().is_empty() || asset.filename.trim().is_empty() {
            warn!(line = line_no, "Skipping inventory line without asset id or filename");
            outcome.skipped += 1;
            continue;
        }
        if asset.source_name.trim().is_empty() {
            asset.source_name = default_source.to_string();
        }
        outcome.assets.push(asset);
    }
    Ok(outcome)
}

/// Decode one line, renaming each recognised field to its canonical form
/// first. Unknown fields are dropped.
fn parse_asset(line: &[u8]) -> Result<RemoteAsset, serde_json::Error> {
    let fields: Map<String, Value> = serde_json::from_slice(line)?;
    let canonical: Map<String, Value> = fields
        .into_iter()
        .filter_map(|(key, value)| canonical_field(&key).map(|name| (name.to_string(), value)))
        .collect();
    serde_json::from_value(Value::Object(canonical))
}

fn canonical_field(key: &str) -> Option<&'static str> {
    let folded: String = key
        .chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect();
    match folded.as_str() {
        "sourcename" => Some("sourceName"),
        "sourceassetid" => Some("sourceAssetId"),
        "filename" => Some("filename"),
        "sizebytes" => Some("sizeBytes"),
        "createdutc" => Some("createdUtc"),
        "mediatype" => Some("mediaType"),
        _ => None,
    }
}

/// Write one compact JSON object per result.
pub fn write_diff_results(mut writer: impl Write, results: &[DiffResult]) -> Result<usize, InventoryError> {
    for result in results {
        serde_json::to_writer(&mut writer, result)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(results.len())
}
