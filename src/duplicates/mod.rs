//! Duplicate detection.
//!
//! - [`index`]: signature-ordered arena tree with collision chains
//! - [`finder`]: per-file pipeline feeding the index
//! - [`hardlink`]: hard-link group listing
//! - [`stats`]: run counters

pub mod finder;
pub mod hardlink;
pub mod index;
pub mod stats;

use std::io;
use std::path::PathBuf;

use crate::actions::ActionError;

pub use finder::{check_same_volume, literal_base, DupeFinder, FinderConfig, FinderOutcome};
pub use hardlink::{hardlink_groups, report_hardlink_groups, HardlinkGroup};
pub use index::{
    Candidate, Collision, DuplicateIndex, FileRecord, IndexMode, Inserted, RecordId, Resolver,
};
pub use stats::Statistics;

/// Errors raised while inserting into the index.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// Resolving a duplicate failed part way through a mutation.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// The arena could not grow.
    #[error("out of memory growing the file index ({records} records)")]
    Exhausted {
        /// Records stored when growth failed
        records: usize,
    },
}

/// Errors that stop a scan.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The index failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Patterns live on different volumes but hard links were requested.
    #[error("hardlinking across different volumes is not possible ('{first}' and '{second}')")]
    CrossVolume {
        /// Pattern on the first volume seen
        first: String,
        /// Pattern on another volume
        second: String,
    },

    /// The script file could not be created.
    #[error("unable to open script file '{path}': {source}")]
    ScriptOpen {
        /// Requested script path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The script could not be flushed at the end of the run.
    #[error("writing script failed: {0}")]
    ScriptWrite(#[source] io::Error),
}
