use super::common::{pattern, sub_pattern, write_file, InstrumentedFs};
use dupelink::actions::{ActionError, DupeAction, EngineOptions};
use dupelink::cli::Cli;
use dupelink::duplicates::{check_same_volume, DupeFinder, FinderConfig, FinderError, IndexError};
use dupelink::error::ExitCode;
use dupelink::platform::{DirEntryInfo, FileId, FileIdentity, FileStat, FileSystem};
use dupelink::progress::ReportLog;
use filetime::FileTime;
use std::fs::{File, Permissions};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn test_delete_failure_aborts_the_run() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "a", b"twin");
    let b = write_file(dir.path(), "b", b"twin");
    write_file(dir.path(), "c", b"twin");

    let config = FinderConfig::default()
        .with_engine(EngineOptions {
            action: DupeAction::Delete,
            ..EngineOptions::default()
        })
        .with_progress_callback(Arc::new(ReportLog::new()));
    let mut finder = DupeFinder::new(InstrumentedFs::failing_remove(), config);

    let err = finder.scan_pattern(pattern(dir.path()).as_str(), false).unwrap_err();
    match &err {
        FinderError::Index(IndexError::Action(ActionError::Delete { path, .. })) => {
            assert_eq!(path, &b);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains(&*b.to_string_lossy()));
    // The run stopped at `b`; `c` was never looked at.
    assert_eq!(finder.stats().files_matched, 2);
}

fn engine_config(action: DupeAction, touch_readonly: bool) -> FinderConfig {
    FinderConfig::default()
        .with_engine(EngineOptions {
            action,
            touch_readonly,
            ..EngineOptions::default()
        })
        .with_progress_callback(Arc::new(ReportLog::new()))
}

#[test]
fn test_link_failure_aborts_the_run() {
    let dir = tempdir().unwrap();
    let a = write_file(dir.path(), "a", b"triplet");
    let b = write_file(dir.path(), "b", b"triplet");
    let c = write_file(dir.path(), "c", b"triplet");

    let config = engine_config(DupeAction::HardLink, false);
    let mut finder = DupeFinder::new(InstrumentedFs::failing_link(), config);

    let err = finder.scan_pattern(pattern(dir.path()).as_str(), false).unwrap_err();
    match &err {
        FinderError::Index(IndexError::Action(ActionError::Link { original, link, .. })) => {
            assert_eq!(original, &a);
            assert_eq!(link, &b);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains(&*a.to_string_lossy()));
    assert!(message.contains(&*b.to_string_lossy()));
    assert_eq!(finder.stats().files_matched, 2);
    // `b` was removed before the link attempt; `c` was never touched.
    assert!(!b.exists());
    assert!(a.exists());
    assert!(c.exists());
}

#[test]
fn test_make_writable_failure_aborts_the_run() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "a", b"locked twin");
    let b = write_file(dir.path(), "b", b"locked twin");
    let mut permissions = std::fs::metadata(&b).unwrap().permissions();
    permissions.set_readonly(true);
    std::fs::set_permissions(&b, permissions).unwrap();

    let config = engine_config(DupeAction::Delete, true);
    let mut finder = DupeFinder::new(InstrumentedFs::failing_permissions(), config);

    let err = finder.scan_pattern(pattern(dir.path()).as_str(), false).unwrap_err();
    match &err {
        FinderError::Index(IndexError::Action(ActionError::MakeWritable { path, .. })) => {
            assert_eq!(path, &b);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(b.exists());
}

#[test]
fn test_listlink_rejects_mutating_options() {
    for flag in ["--hardlink", "--del", "--rdonly"] {
        let err = Cli::try_parse_ordered_from(["dupelink", "--listlink", flag, "dir"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict, "{flag}");
    }
}

#[test]
fn test_exit_code_when_a_pattern_matches_nothing() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "file", b"content");
    let cli = Cli::try_parse_ordered_from([
        "dupelink".to_string(),
        "-p".to_string(),
        pattern(dir.path()),
        sub_pattern(dir.path(), "*.missing"),
    ])
    .unwrap();
    assert_eq!(dupelink::run_app(cli).unwrap(), ExitCode::NoFilesMatched);
}

#[test]
fn test_exit_code_when_nothing_to_process() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "empty", b"");
    let args = ["dupelink".to_string(), "-p".to_string(), pattern(dir.path())];
    let cli = Cli::try_parse_ordered_from(args).unwrap();
    assert_eq!(dupelink::run_app(cli).unwrap(), ExitCode::NothingToProcess);
}

#[test]
fn test_unopenable_script_is_an_error() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("no/such/dir/fix.sh");
    let result = DupeFinder::with_script_file(
        InstrumentedFs::default(),
        FinderConfig::default(),
        &script,
        dupelink::output::ScriptType::Posix,
    );
    assert!(matches!(result, Err(FinderError::ScriptOpen { .. })));
}

/// Reports the first path component as the volume; nothing else works.
struct VolumeFs;

impl FileSystem for VolumeFs {
    type Reader = File;

    fn metadata(&self, _path: &Path) -> io::Result<FileStat> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn identity(&self, path: &Path) -> io::Result<FileIdentity> {
        let volume = match path.to_string_lossy().split('/').next() {
            Some("c") => 1,
            Some("d") => 2,
            _ => return Err(io::ErrorKind::NotFound.into()),
        };
        Ok(FileIdentity {
            id: FileId::new(volume, 7),
            link_count: 1,
        })
    }

    fn is_reparse_point(&self, _path: &Path) -> bool {
        false
    }

    fn list_dir(&self, _dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn open(&self, _path: &Path) -> io::Result<File> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn hard_link(&self, _existing: &Path, _link: &Path) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn remove_file(&self, _path: &Path) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn set_permissions(&self, _path: &Path, _permissions: Permissions) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }

    fn set_times(&self, _path: &Path, _time: FileTime) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }
}

#[test]
#[cfg(unix)]
fn test_cross_volume_patterns_rejected() {
    check_same_volume(&VolumeFs, &["c/photos/*", "c/music"]).unwrap();
    check_same_volume(&VolumeFs, &["c/photos/*", "elsewhere/*"]).unwrap();

    let err = check_same_volume(&VolumeFs, &["c/photos/*", "d/**/*.jpg"]).unwrap_err();
    match err {
        FinderError::CrossVolume { first, second } => {
            assert_eq!(first, "c/photos/*");
            assert_eq!(second, "d/**/*.jpg");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
