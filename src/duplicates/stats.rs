//! Run-wide counters.

/// Counters accumulated over one run and printed once at the end.
///
/// All counters only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Paths produced by the walker, before any filtering.
    pub files_matched: u64,
    /// Files that reached the index.
    pub total_files: u64,
    /// Bytes of files that reached the index.
    pub total_bytes: u64,
    /// Confirmed duplicates (content compared or already linked).
    pub duplicate_files: u64,
    /// Bytes of confirmed duplicates.
    pub duplicate_bytes: u64,
    /// Files that could not be queried, opened or read.
    pub cant_read_files: u64,
    /// Zero-length files left out of the index.
    pub zero_length_files: u64,
    /// Hard-link groups reported in list mode.
    pub hardlink_groups: u64,
    /// Duplicates skipped because they were read-only.
    pub readonly_skipped: u64,
    /// Duplicates refused because the original hit the link ceiling.
    pub link_limit_reached: u64,
}

impl Statistics {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a file entering the index.
    pub fn record_indexed(&mut self, size: u64) {
        self.total_files += 1;
        self.total_bytes += size;
    }

    /// Count a confirmed duplicate.
    pub fn record_duplicate(&mut self, size: u64) {
        self.duplicate_files += 1;
        self.duplicate_bytes += size;
    }

    /// Whole kilobytes (1000 bytes), rounded down, as the summary prints them.
    #[must_use]
    pub fn kilobytes(bytes: u64) -> u64 {
        bytes / 1000
    }
}
