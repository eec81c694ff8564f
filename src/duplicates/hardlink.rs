//! Hard-link group listing.
//!
//! # Overview
//!
//! In list mode the index is keyed by file identity, so every name of one
//! physical file lands on the same `same` chain. This module walks the tree
//! in key order and turns each chain whose file has more than one link into a
//! [`HardlinkGroup`].
//!
//! Files with a single link never enter the index in list mode, and a chain
//! head with a link count of one is never reported.
//!
//! # Example
//!
//! ```
//! use dupelink::duplicates::{hardlink_groups, DuplicateIndex};
//!
//! let index = DuplicateIndex::new();
//! assert!(hardlink_groups(&index).is_empty());
//! ```

use std::path::PathBuf;

use crate::output::summary;
use crate::progress::ProgressCallback;

use super::{DuplicateIndex, Statistics};

/// Names of one physical file found by the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardlinkGroup {
    /// Links the OS reports for the file (may exceed `paths.len()`).
    pub link_count: u32,
    /// Names found in the searched tree, in scan order.
    pub paths: Vec<PathBuf>,
}

/// Collect every group whose file has more than one link.
#[must_use]
pub fn hardlink_groups(index: &DuplicateIndex) -> Vec<HardlinkGroup> {
    index
        .in_order()
        .filter(|(_, record)| record.link_count > 1)
        .map(|(id, record)| HardlinkGroup {
            link_count: record.link_count,
            paths: index
                .same_chain(id)
                .map(|(_, r)| r.path.clone())
                .collect(),
        })
        .collect()
}

/// Print every group and the closing count, updating `stats`.
pub fn report_hardlink_groups(
    index: &DuplicateIndex,
    stats: &mut Statistics,
    progress: &dyn ProgressCallback,
) {
    for group in hardlink_groups(index) {
        for line in summary::hardlink_group(&group) {
            progress.on_report(&line);
        }
        stats.hardlink_groups += 1;
    }
    for line in summary::hardlink_group_count(stats.hardlink_groups) {
        progress.on_report(&line);
    }
}
