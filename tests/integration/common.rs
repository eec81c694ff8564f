use dupelink::duplicates::{DupeFinder, FinderConfig, FinderOutcome};
use dupelink::platform::{DirEntryInfo, FileIdentity, FileStat, FileSystem, OsFileSystem};
use filetime::FileTime;
use std::fs::{self, File, Permissions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

pub fn pattern(path: &Path) -> String {
    path.to_str().unwrap().to_string()
}

/// Pattern `path/rest` with the platform separator.
pub fn sub_pattern(path: &Path, rest: &str) -> String {
    let sep = dupelink::scanner::walker::SEPARATOR;
    format!("{}{}{}", pattern(path), sep, rest.replace('/', &sep.to_string()))
}

/// Scan `patterns` in order and return the outcome.
pub fn scan<F: FileSystem + Clone>(
    fs: F,
    config: FinderConfig,
    patterns: &[(&str, bool)],
) -> FinderOutcome {
    let mut finder = DupeFinder::new(fs, config);
    for (p, reference) in patterns {
        finder.scan_pattern(p, *reference).unwrap();
    }
    finder.finish().unwrap()
}

pub fn same_file(a: &Path, b: &Path) -> bool {
    let a = OsFileSystem.identity(a).unwrap();
    let b = OsFileSystem.identity(b).unwrap();
    a.id == b.id
}

/// Real filesystem that counts opens and can be told to fail mutations.
#[derive(Debug, Clone, Default)]
pub struct InstrumentedFs {
    pub opens: Arc<AtomicUsize>,
    pub fail_remove: bool,
    pub fail_link: bool,
    pub fail_permissions: bool,
}

impl InstrumentedFs {
    pub fn failing_remove() -> Self {
        Self {
            fail_remove: true,
            ..Self::default()
        }
    }

    pub fn failing_link() -> Self {
        Self {
            fail_link: true,
            ..Self::default()
        }
    }

    pub fn failing_permissions() -> Self {
        Self {
            fail_permissions: true,
            ..Self::default()
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl FileSystem for InstrumentedFs {
    type Reader = File;

    fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        OsFileSystem.metadata(path)
    }

    fn identity(&self, path: &Path) -> io::Result<FileIdentity> {
        OsFileSystem.identity(path)
    }

    fn is_reparse_point(&self, path: &Path) -> bool {
        OsFileSystem.is_reparse_point(path)
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        OsFileSystem.list_dir(dir)
    }

    fn open(&self, path: &Path) -> io::Result<File> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        OsFileSystem.open(path)
    }

    fn hard_link(&self, existing: &Path, link: &Path) -> io::Result<()> {
        if self.fail_link {
            return Err(io::Error::new(io::ErrorKind::Other, "link refused"));
        }
        OsFileSystem.hard_link(existing, link)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        if self.fail_remove {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "removal refused"));
        }
        OsFileSystem.remove_file(path)
    }

    fn set_permissions(&self, path: &Path, permissions: Permissions) -> io::Result<()> {
        if self.fail_permissions {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "chmod refused"));
        }
        OsFileSystem.set_permissions(path, permissions)
    }

    fn set_times(&self, path: &Path, time: FileTime) -> io::Result<()> {
        OsFileSystem.set_times(path, time)
    }
}
