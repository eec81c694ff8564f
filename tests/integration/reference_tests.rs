use super::common::{pattern, scan, write_file};
use dupelink::actions::{DupeAction, EngineOptions};
use dupelink::cli::Cli;
use dupelink::duplicates::FinderConfig;
use dupelink::error::ExitCode;
use dupelink::platform::OsFileSystem;
use dupelink::progress::ReportLog;
use std::sync::Arc;
use tempfile::tempdir;

fn delete_config() -> FinderConfig {
    FinderConfig::default()
        .with_engine(EngineOptions {
            action: DupeAction::Delete,
            ..EngineOptions::default()
        })
        .with_progress_callback(Arc::new(ReportLog::new()))
}

#[test]
fn test_reference_files_are_originals_never_victims() {
    let reference = tempdir().unwrap();
    let work = tempdir().unwrap();
    let kept = write_file(reference.path(), "x", b"archived copy");
    let y1 = write_file(reference.path(), "y1", b"reference twin");
    let y2 = write_file(reference.path(), "y2", b"reference twin");
    let copy = write_file(work.path(), "x", b"archived copy");
    let fresh = write_file(work.path(), "new", b"not archived");

    let outcome = scan(
        OsFileSystem,
        delete_config(),
        &[(pattern(reference.path()).as_str(), true), (pattern(work.path()).as_str(), false)],
    );

    assert!(kept.exists() && y1.exists() && y2.exists());
    assert!(!copy.exists());
    assert!(fresh.exists());
    assert_eq!(outcome.stats.duplicate_files, 1);
    assert_eq!(outcome.stats.total_files, 5);
}

#[test]
fn test_reference_scanned_last_only_chains() {
    let reference = tempdir().unwrap();
    let work = tempdir().unwrap();
    let kept = write_file(reference.path(), "x", b"same");
    let copy = write_file(work.path(), "x", b"same");

    let outcome = scan(
        OsFileSystem,
        delete_config(),
        &[(pattern(work.path()).as_str(), false), (pattern(reference.path()).as_str(), true)],
    );

    assert!(kept.exists() && copy.exists());
    assert_eq!(outcome.stats.duplicate_files, 0);
    assert_eq!(outcome.index.len(), 2);
}

#[test]
fn test_run_app_honours_interleaved_ref_order() {
    let reference = tempdir().unwrap();
    let work = tempdir().unwrap();
    let kept = write_file(reference.path(), "doc", b"the one true copy");
    let copy = write_file(work.path(), "doc", b"the one true copy");

    let cli = Cli::try_parse_ordered_from([
        "dupelink",
        "--del",
        "-p",
        "--ref",
        pattern(reference.path()).as_str(),
        pattern(work.path()).as_str(),
    ])
    .unwrap();

    assert_eq!(dupelink::run_app(cli).unwrap(), ExitCode::Success);
    assert!(kept.exists());
    assert!(!copy.exists());
}
