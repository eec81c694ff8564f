//! Filesystem capability layer.
//!
//! Everything the scanner, index and action engine need from the operating
//! system goes through the [`FileSystem`] trait: metadata and identity
//! queries, directory listing, reparse-point detection, opening files for
//! reading, and the handful of mutations used to resolve duplicates.
//!
//! [`OsFileSystem`] is the real implementation. Tests wrap it to inject
//! failures without touching the rest of the pipeline.
//!
//! # Platform Support
//!
//! - **Unix**: identity is `(st_dev, st_ino)`, link count is `st_nlink`,
//!   reparse points are symbolic links.
//! - **Windows**: identity is `(volume serial, file index)` read from an open
//!   handle, reparse points are detected from the file attributes.

#[cfg(windows)]
mod windows;

use std::fs::{self, File, Permissions};
use std::io::{self, Read};
use std::path::Path;

use filetime::FileTime;

/// Device-scoped unique identity of the data behind a path.
///
/// All hard links to one file share the same `FileId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FileId {
    /// Volume the file lives on (`st_dev` or the volume serial number).
    pub volume: u64,
    /// Volume-relative file index (inode number or NTFS file index).
    pub index: u64,
}

impl FileId {
    /// Create a new identity.
    #[must_use]
    pub const fn new(volume: u64, index: u64) -> Self {
        Self { volume, index }
    }

    /// High 32 bits of the file index.
    #[must_use]
    pub const fn high(&self) -> u32 {
        (self.index >> 32) as u32
    }

    /// Low 32 bits of the file index.
    #[must_use]
    pub const fn low(&self) -> u32 {
        self.index as u32
    }
}

/// Identity plus the number of names the OS reports for the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity {
    /// Identity of the underlying data.
    pub id: FileId,
    /// Hard link count at query time.
    pub link_count: u32,
}

/// Subset of file metadata the pipeline relies on.
#[derive(Debug, Clone)]
pub struct FileStat {
    /// Length in bytes.
    pub size: u64,
    /// Whether the path names a directory (symlinks followed).
    pub is_dir: bool,
    /// Permission bits, restored after a duplicate is replaced by a link.
    pub permissions: Permissions,
    /// Last modification time.
    pub modified: FileTime,
}

impl FileStat {
    /// Build from std metadata.
    #[must_use]
    pub fn from_metadata(metadata: &fs::Metadata) -> Self {
        Self {
            size: metadata.len(),
            is_dir: metadata.is_dir(),
            permissions: metadata.permissions(),
            modified: FileTime::from_last_modification_time(metadata),
        }
    }

    /// Whether the owner lacks write permission.
    #[must_use]
    pub fn is_readonly(&self) -> bool {
        is_readonly(&self.permissions)
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    /// Entry name (no directory part).
    pub name: String,
    /// Whether the entry is a directory, following symlinks and junctions.
    pub is_dir: bool,
}

/// Narrow interface to the operating system.
pub trait FileSystem {
    /// Reader returned by [`FileSystem::open`].
    type Reader: Read;

    /// Query size, type, permissions and modification time (follows links).
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the path cannot be queried.
    fn metadata(&self, path: &Path) -> io::Result<FileStat>;

    /// Query the platform identity and link count (follows links).
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the path cannot be opened or queried.
    fn identity(&self, path: &Path) -> io::Result<FileIdentity>;

    /// Whether `path` itself is a symlink, junction or other reparse point.
    fn is_reparse_point(&self, path: &Path) -> bool;

    /// List a directory. Order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the directory cannot be read.
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>>;

    /// Open a file for reading.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be opened.
    fn open(&self, path: &Path) -> io::Result<Self::Reader>;

    /// Create `link` as a new name for the data at `existing`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the link cannot be created.
    fn hard_link(&self, existing: &Path, link: &Path) -> io::Result<()>;

    /// Remove a file name.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the name cannot be removed.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Replace the permission bits of a file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if permissions cannot be changed.
    fn set_permissions(&self, path: &Path, permissions: Permissions) -> io::Result<()>;

    /// Set both access and modification time.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if timestamps cannot be changed.
    fn set_times(&self, path: &Path, time: FileTime) -> io::Result<()>;
}

/// The real operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    type Reader = File;

    fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        fs::metadata(path).map(|m| FileStat::from_metadata(&m))
    }

    #[cfg(unix)]
    fn identity(&self, path: &Path) -> io::Result<FileIdentity> {
        use std::os::unix::fs::MetadataExt;
        let metadata = fs::metadata(path)?;
        Ok(FileIdentity {
            id: FileId::new(metadata.dev(), metadata.ino()),
            link_count: u32::try_from(metadata.nlink()).unwrap_or(u32::MAX),
        })
    }

    #[cfg(windows)]
    fn identity(&self, path: &Path) -> io::Result<FileIdentity> {
        windows::file_identity(path)
    }

    #[cfg(not(any(unix, windows)))]
    fn identity(&self, path: &Path) -> io::Result<FileIdentity> {
        // No identity source: every file is its own single-link island.
        fs::metadata(path)?;
        Ok(FileIdentity {
            id: FileId::default(),
            link_count: 0,
        })
    }

    fn is_reparse_point(&self, path: &Path) -> bool {
        let Ok(metadata) = fs::symlink_metadata(path) else {
            return false;
        };
        if metadata.file_type().is_symlink() {
            return true;
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::MetadataExt;
            const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x400;
            metadata.file_attributes() & FILE_ATTRIBUTE_REPARSE_POINT != 0
        }
        #[cfg(not(windows))]
        {
            false
        }
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    log::warn!(
                        "Skipping non UTF-8 name in {}: {}",
                        dir.display(),
                        raw.to_string_lossy()
                    );
                    continue;
                }
            };
            let file_type = entry.file_type()?;
            let is_dir = if file_type.is_symlink() {
                // Links count as whatever they point at; dangling ones as files.
                fs::metadata(entry.path()).is_ok_and(|m| m.is_dir())
            } else {
                file_type.is_dir()
            };
            entries.push(DirEntryInfo { name, is_dir });
        }
        Ok(entries)
    }

    fn open(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    fn hard_link(&self, existing: &Path, link: &Path) -> io::Result<()> {
        fs::hard_link(existing, link)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn set_permissions(&self, path: &Path, permissions: Permissions) -> io::Result<()> {
        fs::set_permissions(path, permissions)
    }

    fn set_times(&self, path: &Path, time: FileTime) -> io::Result<()> {
        filetime::set_file_times(path, time, time)
    }
}

/// Whether the owner write bit is clear.
#[must_use]
pub fn is_readonly(permissions: &Permissions) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.mode() & 0o200 == 0
    }
    #[cfg(not(unix))]
    {
        permissions.readonly()
    }
}

/// Copy of `permissions` with the owner write bit set.
#[must_use]
pub fn with_owner_write(permissions: &Permissions) -> Permissions {
    let mut writable = permissions.clone();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        writable.set_mode(permissions.mode() | 0o200);
    }
    #[cfg(not(unix))]
    {
        #[allow(clippy::permissions_set_readonly_false)]
        writable.set_readonly(false);
    }
    writable
}

/// Octal mode bits for script output (`chmod`).
#[must_use]
pub fn mode_bits(permissions: &Permissions) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.mode() & 0o7777
    }
    #[cfg(not(unix))]
    {
        if permissions.readonly() {
            0o444
        } else {
            0o644
        }
    }
}
