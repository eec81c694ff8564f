//! Duplicate resolution.
//!
//! This module provides functionality for:
//! - Verifying a signature collision by full content comparison
//! - Replacing a duplicate with a hard link to the first-seen copy
//! - Deleting a duplicate outright
//! - Deferring either action to a script
//!
//! # Resolution
//!
//! [`ActionEngine`] implements [`crate::duplicates::Resolver`]; the duplicate
//! index calls it whenever a new file's key matches a stored one. Its answer
//! is a [`Resolution`]: every value except [`Resolution::NotDuplicate`]
//! consumes the new file.
//!
//! ```no_run
//! use dupelink::actions::{ActionEngine, DupeAction, EngineOptions};
//! use dupelink::platform::OsFileSystem;
//! use dupelink::progress::Progress;
//! use std::sync::Arc;
//!
//! let options = EngineOptions {
//!     action: DupeAction::HardLink,
//!     ..Default::default()
//! };
//! let engine = ActionEngine::new(OsFileSystem, options, Arc::new(Progress::new(true)));
//! ```

pub mod engine;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

// Re-export commonly used types
pub use engine::{ActionEngine, EngineOptions, COMPARE_CHUNK, MAX_HARDLINKS};

/// What to do with confirmed duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DupeAction {
    /// Only report them.
    #[default]
    Report,
    /// Replace each with a hard link to the first-seen copy.
    HardLink,
    /// Delete them.
    Delete,
}

/// Outcome of resolving a candidate against an established record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Sizes or contents differ; keep searching.
    NotDuplicate,
    /// The original already has the maximum number of links.
    LinkLimitReached,
    /// The duplicate is read-only and read-only files are off limits.
    SkippedReadOnly,
    /// A duplicate, but nothing to do.
    NoOp,
    /// The duplicate was deleted (or a delete was scripted).
    Deleted,
    /// The duplicate was replaced by a hard link (or a link was scripted).
    Hardlinked,
}

impl Resolution {
    /// Whether the candidate is consumed and must not be stored.
    #[must_use]
    pub fn is_definitive(self) -> bool {
        self != Self::NotDuplicate
    }
}

/// Fatal errors while mutating the filesystem.
///
/// Any of these aborts the run: a mutation has started and the tree may be
/// in a state nobody asked for.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The duplicate could not be queried moments after it was read.
    #[error("stat failed on '{path}': {source}")]
    Stat {
        /// Duplicate path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Clearing the read-only bit failed.
    #[error("could not make '{path}' writable: {source}")]
    MakeWritable {
        /// Duplicate path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Deleting the duplicate failed.
    #[error("delete of '{path}' failed: {source}")]
    Delete {
        /// Duplicate path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Creating the replacement link failed. The duplicate is already gone.
    #[error("create hard link from '{original}' to '{link}' failed: {source}")]
    Link {
        /// Existing file the link should point at
        original: PathBuf,
        /// Path of the link that could not be created
        link: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Writing to the deferred script failed.
    #[error("writing script failed: {0}")]
    Script(#[source] io::Error),
}

impl ActionError {
    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Stat { path, .. }
            | Self::MakeWritable { path, .. }
            | Self::Delete { path, .. } => Some(path),
            Self::Link { link, .. } => Some(link),
            Self::Script(_) => None,
        }
    }
}
