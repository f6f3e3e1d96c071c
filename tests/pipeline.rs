mod support;

use std::fs;
use std::path::PathBuf;

use support::fixtures::{write_inventory, write_sized};
use support::vaultdiff_env::TempConfigHome;
use tempfile::tempdir;
use vaultdiff::app_dirs::AppDirs;
use vaultdiff::catalog::{DiffStatus, JobKind, JobStatus};
use vaultdiff::config::{self, AppSettings};
use vaultdiff::ops::Operations;
use vaultdiff::projection::DiffSummary;

#[test]
fn reconciles_all_three_rules_end_to_end() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("archive");
    write_sized(&root.join("b/ABC123_photo.jpg"), 1000);
    write_sized(&root.join("one/v.mp4"), 10_000);
    write_sized(&root.join("two/v.mp4"), 10_000);
    write_sized(&root.join("2023/Holiday.JPG"), 77);
    write_sized(&root.join(".DS_Store"), 5);
    let inventory = dir.path().join("icloud.jsonl");
    write_inventory(
        &inventory,
        &[
            ("ABC123", "photo.jpg", 1000),
            ("X", "v.mp4", 10_000),
            ("G", "missing.txt", 500),
            ("H", "holiday.jpg", 77),
        ],
    );

    let ops = Operations::open(dir.path().join("catalog.db")).unwrap();
    assert_eq!(ops.scan_local(Some(root.as_path())).unwrap().files, 4);
    ops.import_remote("icloud", &inventory).unwrap();
    let report = ops.run_diff("icloud").unwrap();
    assert_eq!(report.remote_assets, 4);
    assert_eq!(report.summary, DiffSummary { present: 2, missing: 1, uncertain: 1 });

    let results = ops.store().load_latest_diff_results("icloud").unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.source_asset_id.as_str()).collect();
    assert_eq!(ids, vec!["ABC123", "X", "G", "H"]);

    assert_eq!(results[0].status, DiffStatus::Present);
    assert_eq!(results[0].reason, "exact match by asset ID prefix");
    assert!(results[0].matched_local_path.as_ref().unwrap().ends_with("b/ABC123_photo.jpg"));

    assert_eq!(results[1].status, DiffStatus::Uncertain);
    assert!(results[1].reason.contains("2 files match"));
    assert!(results[1].matched_local_path.is_none());

    assert_eq!(results[2].status, DiffStatus::Missing);
    assert_eq!(results[2].reason, "no matching local file found");

    assert_eq!(results[3].reason, "matched by filename and size");
    assert!(results.iter().all(|result| result.is_consistent()));
}

#[test]
fn rescan_and_rediff_overwrite_previous_state() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("archive");
    write_sized(&root.join("a.jpg"), 10);
    let inventory = dir.path().join("icloud.jsonl");
    write_inventory(&inventory, &[("A", "a.jpg", 10)]);

    let ops = Operations::open(dir.path().join("catalog.db")).unwrap();
    ops.scan_local(Some(root.as_path())).unwrap();
    ops.import_remote("icloud", &inventory).unwrap();
    ops.import_remote("icloud", &inventory).unwrap();
    assert_eq!(ops.run_diff("icloud").unwrap().summary.present, 1);

    fs::remove_file(root.join("a.jpg")).unwrap();
    assert_eq!(ops.scan_local(Some(root.as_path())).unwrap().files, 0);
    assert!(ops.store().load_local_files().unwrap().is_empty());

    let summary = ops.run_diff("icloud").unwrap().summary;
    assert_eq!(summary, DiffSummary { present: 0, missing: 1, uncertain: 0 });
    assert_eq!(ops.store().load_remote_assets("icloud").unwrap().len(), 1);
    assert_eq!(ops.store().load_latest_diff_results("icloud").unwrap().len(), 1);
    assert_eq!(ops.summary("icloud").unwrap(), summary);
}

#[test]
fn report_exports_filtered_jsonl() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("archive");
    write_sized(&root.join("a.jpg"), 10);
    let inventory = dir.path().join("icloud.jsonl");
    write_inventory(&inventory, &[("A", "a.jpg", 10), ("B", "b.jpg", 20)]);

    let ops = Operations::open(dir.path().join("catalog.db")).unwrap();
    ops.scan_local(Some(root.as_path())).unwrap();
    ops.import_remote("icloud", &inventory).unwrap();
    ops.run_diff("icloud").unwrap();

    let out = dir.path().join("reports").join("missing.jsonl");
    let export = ops
        .export_report("icloud", &out, Some(DiffStatus::Missing))
        .unwrap();
    assert_eq!(export.written, 1);
    let text = fs::read_to_string(&out).unwrap();
    let line: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
    assert_eq!(line["sourceAssetId"], "B");
    assert_eq!(line["status"], "Missing");
    assert!(line["matchedLocalPath"].is_null());

    let jobs = ops.recent_jobs(10).unwrap();
    assert_eq!(jobs[0].kind, JobKind::Report);
    assert!(jobs.iter().all(|job| job.status == JobStatus::Completed));
}

#[test]
fn settings_persist_under_config_home() {
    let home = TempConfigHome::new();
    assert_eq!(config::load_or_default().unwrap(), AppSettings::default());

    let settings = AppSettings {
        database_path: None,
        source_name: "gphotos".into(),
        local_root: Some(PathBuf::from("/archive")),
    };
    config::save(&settings).unwrap();
    assert!(home.app_dir().join("config.toml").is_file());
    assert_eq!(config::load_or_default().unwrap(), settings);

    let dirs = AppDirs::discover().unwrap();
    assert_eq!(dirs.root(), home.app_dir());
    assert_eq!(
        settings.resolved_database_path(dirs.root()),
        home.base().join(".vaultdiff").join("catalog.db")
    );
}

#[test]
fn exported_inventory_with_bom_and_pascal_case_keys_imports() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("archive");
    write_sized(&root.join("IMG_0001.HEIC"), 42);
    let inventory = dir.path().join("export.jsonl");
    let mut bytes = b"\xEF\xBB\xBF".to_vec();
    bytes.extend_from_slice(br#"{"SourceAssetId":"Q1","FileName":"img_0001.heic","SizeBytes":42}"#);
    bytes.extend_from_slice(b"\r\n{\"SourceAssetId\":\"Q2\",\"FileName\":\"\xC3\x28.jpg\",\"SizeBytes\":1}\r\n");
    fs::write(&inventory, bytes).unwrap();

    let ops = Operations::open(dir.path().join("catalog.db")).unwrap();
    ops.scan_local(Some(root.as_path())).unwrap();
    let import = ops.import_remote("icloud", &inventory).unwrap();
    assert_eq!((import.imported, import.skipped), (1, 1));
    let report = ops.run_diff("icloud").unwrap();
    assert_eq!(report.summary, DiffSummary { present: 1, missing: 0, uncertain: 0 });
}
