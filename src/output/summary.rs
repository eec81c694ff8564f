//! Plain-text report lines.
//!
//! Every line the scanner shows the operator on stdout is formatted here,
//! so the wording lives in one place and can be tested without a terminal.

use std::path::Path;

use bytesize::ByteSize;

use crate::duplicates::{HardlinkGroup, Statistics};
use crate::platform::FileIdentity;
use crate::scanner::Signature;

/// Totals printed at the end of a duplicate scan.
#[must_use]
pub fn totals(stats: &Statistics) -> Vec<String> {
    vec![
        String::new(),
        format!(
            "Files: {:>8} kBytes in {:>5} files",
            Statistics::kilobytes(stats.total_bytes),
            stats.total_files
        ),
        format!(
            "Dupes: {:>8} kBytes in {:>5} files",
            Statistics::kilobytes(stats.duplicate_bytes),
            stats.duplicate_files
        ),
    ]
}

/// Skip counters, only when non-zero.
#[must_use]
pub fn skipped(stats: &Statistics) -> Vec<String> {
    let mut lines = Vec::new();
    if stats.zero_length_files > 0 {
        lines.push(format!(
            "  {} files of zero length were skipped",
            stats.zero_length_files
        ));
    }
    if stats.cant_read_files > 0 {
        lines.push(format!(
            "  {} files could not be opened",
            stats.cant_read_files
        ));
    }
    lines
}

/// One-line human readable recap for the log.
#[must_use]
pub fn recap(stats: &Statistics) -> String {
    format!(
        "Scanned {} in {} files, {} in {} duplicates",
        ByteSize::b(stats.total_bytes),
        stats.total_files,
        ByteSize::b(stats.duplicate_bytes),
        stats.duplicate_files
    )
}

/// Header and members of one hard-link group.
#[must_use]
pub fn hardlink_group(group: &HardlinkGroup) -> Vec<String> {
    let mut lines = Vec::with_capacity(group.paths.len() + 2);
    lines.push(String::new());
    lines.push(format!(
        "Hardlink group, {} of {} hardlinked instances found in search tree:",
        group.paths.len(),
        group.link_count
    ));
    lines.extend(
        group
            .paths
            .iter()
            .map(|p| format!("  \"{}\"", p.display())),
    );
    lines
}

/// Closing line of list mode.
#[must_use]
pub fn hardlink_group_count(count: u64) -> Vec<String> {
    vec![
        String::new(),
        format!("Number of hardlink groups found: {count}"),
    ]
}

/// `--sigs` line: signature, size, path.
#[must_use]
pub fn signature_line(signature: Signature, size: u64, path: &Path) -> String {
    format!("{} {:>10} {}", signature, size, path.display())
}

/// Verbose identity line.
#[must_use]
pub fn identity_line(identity: &FileIdentity, path: &Path) -> String {
    format!(
        "Hardlinked ({} links) node={:08x} {:08x}: {}",
        identity.link_count,
        identity.id.high(),
        identity.id.low(),
        path.display()
    )
}
