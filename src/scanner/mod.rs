//! Scanner module for pattern expansion and file signatures.
//!
//! This module provides functionality for:
//! - Expanding shell-like patterns (`*`, `?`, `**`) into file paths
//! - Computing the cheap prefix signature used to bucket candidates
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Lazy, sorted pattern expansion over single-level listings
//! - [`checksum`]: Rolling CRC + sum signature over a bounded prefix
//!
//! # Example
//!
//! ```no_run
//! use dupelink::platform::OsFileSystem;
//! use dupelink::scanner::{file_signature, PathWalker};
//!
//! let fs = OsFileSystem;
//! for path in PathWalker::new(&fs, "src/**/*.rs", false) {
//!     let size = std::fs::metadata(&path).unwrap().len();
//!     match file_signature(&fs, &path, size) {
//!         Ok(sig) => println!("{sig} {}", path.display()),
//!         Err(e) => eprintln!("Warning: {e}"),
//!     }
//! }
//! ```

pub mod checksum;
pub mod walker;

use std::io::{self, Read};
use std::path::{Path, PathBuf};

// Re-export main types
pub use checksum::{file_signature, Signature, SIGNATURE_BYTES};
pub use walker::{split_pattern, PathWalker, PatternSplit};

/// Errors that can occur while reading a candidate file.
///
/// These are transient: the file is skipped and counted as unreadable.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The file ended before the expected number of bytes.
    #[error("Short read on {path}: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Path being read
        path: PathBuf,
        /// Bytes requested
        expected: u64,
        /// Bytes actually available
        actual: u64,
    },

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(path) | Self::NotFound(path) => path,
            Self::ShortRead { path, .. } | Self::Io { path, .. } => path,
        }
    }
}

/// Fill `buf` from `reader`, stopping early only at end of file.
///
/// Returns the number of bytes read.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
