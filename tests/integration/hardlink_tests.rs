use super::common::{pattern, same_file, scan, write_file, InstrumentedFs};
use dupelink::actions::{DupeAction, EngineOptions, MAX_HARDLINKS};
use dupelink::duplicates::{hardlink_groups, report_hardlink_groups, FinderConfig};
use dupelink::platform::{FileSystem, OsFileSystem};
use dupelink::progress::ReportLog;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

fn hardlink_config(log: &Arc<ReportLog>) -> FinderConfig {
    FinderConfig::default()
        .with_engine(EngineOptions {
            action: DupeAction::HardLink,
            touch_readonly: false,
            print_duplicates: true,
        })
        .with_progress_callback(log.clone())
}

#[test]
fn test_hardlink_replaces_duplicates() {
    let dir = tempdir().unwrap();
    let a = write_file(dir.path(), "a", b"payload");
    let b = write_file(dir.path(), "b", b"payload");
    let c = write_file(dir.path(), "c", b"payload");
    let log = Arc::new(ReportLog::new());

    let outcome = scan(
        OsFileSystem,
        hardlink_config(&log),
        &[(pattern(dir.path()).as_str(), false)],
    );

    assert!(same_file(&a, &b));
    assert!(same_file(&a, &c));
    assert_eq!(fs::read(&c).unwrap(), b"payload");
    assert_eq!(outcome.stats.duplicate_files, 2);
    assert_eq!(outcome.index.len(), 1);
    let (_, original) = outcome.index.in_order().next().unwrap();
    assert_eq!(original.link_count, 3);
    assert_eq!(
        log.lines()
            .iter()
            .filter(|l| l.as_str() == "    Created hardlink")
            .count(),
        2
    );
}

#[test]
fn test_rescan_of_linked_files_is_a_no_op_without_comparing() {
    let dir = tempdir().unwrap();
    let a = write_file(dir.path(), "a", b"linked content");
    let b = write_file(dir.path(), "b", b"linked content");
    let log = Arc::new(ReportLog::new());
    scan(OsFileSystem, hardlink_config(&log), &[(pattern(dir.path()).as_str(), false)]);
    assert!(same_file(&a, &b));

    let fs = InstrumentedFs::default();
    let log = Arc::new(ReportLog::new());
    let outcome = scan(fs.clone(), hardlink_config(&log), &[(pattern(dir.path()).as_str(), false)]);

    // One open per signature, none for a byte comparison.
    assert_eq!(fs.opens(), 2);
    assert_eq!(outcome.stats.duplicate_files, 0);
    assert!(log
        .lines()
        .contains(&"    (hardlinked instances of same file)".to_string()));
    assert!(!log.lines().contains(&"    Created hardlink".to_string()));
    assert!(same_file(&a, &b));
}

#[test]
fn test_listlink_reports_one_group_of_n() {
    let dir = tempdir().unwrap();
    let original = write_file(dir.path(), "n0", b"shared");
    for i in 1..4 {
        fs::hard_link(&original, dir.path().join(format!("n{i}"))).unwrap();
    }
    write_file(dir.path(), "lonely", b"shared");

    let config = FinderConfig::default().with_list_links(true);
    let outcome = scan(OsFileSystem, config, &[(pattern(dir.path()).as_str(), false)]);

    let groups = hardlink_groups(&outcome.index);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].link_count, 4);
    assert_eq!(groups[0].paths.len(), 4);
    assert!(!groups[0].paths.contains(&dir.path().join("lonely")));

    let log = ReportLog::new();
    let mut stats = outcome.stats;
    report_hardlink_groups(&outcome.index, &mut stats, &log);
    assert_eq!(stats.hardlink_groups, 1);
    let lines = log.lines();
    let header = "Hardlink group, 4 of 4 hardlinked instances found in search tree:";
    assert!(lines.contains(&header.to_string()));
    assert_eq!(lines.last().unwrap(), "Number of hardlink groups found: 1");
}

#[test]
fn test_listlink_partial_group_inside_search_tree() {
    let dir = tempdir().unwrap();
    let outside = tempdir().unwrap();
    let inside = write_file(dir.path(), "inside", b"x");
    fs::hard_link(&inside, outside.path().join("elsewhere")).unwrap();

    let config = FinderConfig::default().with_list_links(true);
    let outcome = scan(OsFileSystem, config, &[(pattern(dir.path()).as_str(), false)]);

    let groups = hardlink_groups(&outcome.index);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].link_count, 2);
    assert_eq!(groups[0].paths, vec![inside]);
}

#[test]
fn test_link_limit_reached_on_1024th_link() {
    let dir = tempdir().unwrap();
    let original = write_file(dir.path(), "keep/orig", b"popular");
    fs::create_dir(dir.path().join("pool")).unwrap();
    for i in 1..MAX_HARDLINKS {
        fs::hard_link(&original, dir.path().join(format!("pool/{i}"))).unwrap();
    }
    assert_eq!(
        OsFileSystem.identity(&original).unwrap().link_count,
        MAX_HARDLINKS
    );
    let dup = write_file(dir.path(), "keep/zdup", b"popular");

    let log = Arc::new(ReportLog::new());
    let outcome = scan(
        OsFileSystem,
        hardlink_config(&log),
        &[(pattern(&original).as_str(), false), (pattern(&dup).as_str(), false)],
    );

    assert_eq!(outcome.stats.link_limit_reached, 1);
    assert_eq!(outcome.stats.duplicate_files, 1);
    assert!(dup.exists());
    assert!(!same_file(&original, &dup));
    assert_eq!(outcome.index.len(), 1);
}
