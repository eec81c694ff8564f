use super::common::{pattern, scan, sub_pattern, write_file, InstrumentedFs};
use dupelink::actions::{ActionEngine, DupeAction, EngineOptions, Resolution};
use dupelink::duplicates::{
    Candidate, Collision, DuplicateIndex, FinderConfig, Inserted, Statistics,
};
use dupelink::platform::{FileSystem, OsFileSystem};
use dupelink::progress::ReportLog;
use dupelink::scanner::Signature;
use std::path::Path;
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
fn test_first_inserted_is_the_original_in_either_order() {
    for (first, second) in [("a", "b"), ("b", "a")] {
        let dir = tempdir().unwrap();
        let a = write_file(dir.path(), "a", b"same bytes in both files");
        let b = write_file(dir.path(), "b", b"same bytes in both files");
        let (first_path, second_path) = if first == "a" { (&a, &b) } else { (&b, &a) };

        let outcome = scan(
            OsFileSystem,
            delete_config(),
            &[(pattern(first_path).as_str(), false), (pattern(second_path).as_str(), false)],
        );

        assert_eq!(outcome.stats.duplicate_files, 1);
        assert!(first_path.exists());
        assert!(!second_path.exists());
        assert_eq!(outcome.index.len(), 1);
        assert_eq!(
            outcome.index.in_order().next().unwrap().1.path,
            *first_path
        );
    }
}

#[test]
fn test_equal_size_different_content_kept_apart() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "x", b"0123456789");
    write_file(dir.path(), "y", b"9876543210");

    let outcome = scan(OsFileSystem, delete_config(), &[(pattern(dir.path()).as_str(), false)]);

    assert_eq!(outcome.stats.total_files, 2);
    assert_eq!(outcome.stats.duplicate_files, 0);
    assert_eq!(outcome.index.len(), 2);
    assert!(dir.path().join("x").exists() && dir.path().join("y").exists());
}

fn candidate<'a>(path: &'a Path, key: Signature) -> Candidate<'a> {
    let identity = OsFileSystem.identity(path).unwrap();
    Candidate {
        key,
        identity: identity.id,
        link_count: identity.link_count,
        size: std::fs::metadata(path).unwrap().len(),
        path,
    }
}

#[test]
fn test_crafted_signature_collision_is_not_a_duplicate() {
    let dir = tempdir().unwrap();
    let first = write_file(dir.path(), "first", b"aaaa");
    let second = write_file(dir.path(), "second", b"bbbb");
    let third = write_file(dir.path(), "third", b"bbbb");
    let forced = Signature::new(0xdead_beef, 0x1234_5678);

    let options = EngineOptions {
        action: DupeAction::Delete,
        ..EngineOptions::default()
    };
    let mut engine = ActionEngine::new(OsFileSystem, options, Arc::new(ReportLog::new()));
    let mut index = DuplicateIndex::new();
    let mut stats = Statistics::new();

    let a = index
        .insert(candidate(&first, forced), Collision::Resolve(&mut engine), &mut stats)
        .unwrap();
    let b = index
        .insert(candidate(&second, forced), Collision::Resolve(&mut engine), &mut stats)
        .unwrap();
    let (Inserted::Stored(a), Inserted::Stored(b)) = (a, b) else {
        panic!("both records must be stored: {a:?} {b:?}");
    };
    let chain: Vec<_> = index.same_chain(a).map(|(id, _)| id).collect();
    assert_eq!(chain, vec![a, b]);
    assert_eq!(stats.duplicate_files, 0);

    // The real duplicate of `second` sits further down the chain.
    let c = index
        .insert(candidate(&third, forced), Collision::Resolve(&mut engine), &mut stats)
        .unwrap();
    assert_eq!(c, Inserted::Resolved(Resolution::Deleted));
    assert!(!third.exists());
    assert!(first.exists() && second.exists());
    assert_eq!(stats.duplicate_files, 1);
}

#[test]
fn test_zero_length_excluded_and_never_opened() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "e1", b"");
    write_file(dir.path(), "e2", b"");
    let fs = InstrumentedFs::default();

    let outcome = scan(fs.clone(), delete_config(), &[(pattern(dir.path()).as_str(), false)]);

    assert_eq!(fs.opens(), 0);
    assert_eq!(outcome.stats.files_matched, 2);
    assert_eq!(outcome.stats.zero_length_files, 2);
    assert_eq!(outcome.stats.total_files, 0);
    assert_eq!(outcome.stats.duplicate_files, 0);
    assert!(outcome.index.is_empty());
    assert!(dir.path().join("e2").exists());
}

#[test]
fn test_zero_length_included_on_request() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "e1", b"");
    write_file(dir.path(), "e2", b"");

    let outcome = scan(
        OsFileSystem,
        delete_config().with_zero_length(true),
        &[(pattern(dir.path()).as_str(), false)],
    );

    assert_eq!(outcome.stats.total_files, 2);
    assert_eq!(outcome.stats.duplicate_files, 1);
    assert!(!dir.path().join("e2").exists());
}

#[test]
fn test_overlapping_patterns_never_delete_the_only_copy() {
    let dir = tempdir().unwrap();
    let only = write_file(dir.path(), "only.txt", b"the single copy");
    let wildcard = sub_pattern(dir.path(), "*.txt");

    let outcome = scan(
        OsFileSystem,
        delete_config(),
        &[(pattern(dir.path()).as_str(), false), (wildcard.as_str(), false)],
    );

    assert!(only.exists());
    assert_eq!(std::fs::read(&only).unwrap(), b"the single copy");
    assert_eq!(outcome.stats.duplicate_files, 0);
    assert_eq!(outcome.stats.files_matched, 2);
    assert_eq!(outcome.index.len(), 1);
    assert!(outcome.unmatched.is_empty());
}

#[test]
fn test_reference_then_normal_pattern_over_same_tree_keeps_files() {
    let dir = tempdir().unwrap();
    let a = write_file(dir.path(), "a", b"kept");
    let b = write_file(dir.path(), "b", b"kept");

    let outcome = scan(
        OsFileSystem,
        delete_config(),
        &[(pattern(dir.path()).as_str(), true), (pattern(dir.path()).as_str(), false)],
    );

    assert!(a.exists());
    assert!(b.exists());
    assert_eq!(outcome.stats.duplicate_files, 0);
}
