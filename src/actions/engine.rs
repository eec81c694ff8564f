//! Action engine: verify a key collision and resolve the duplicate.
//!
//! # Overview
//!
//! For a candidate `A` whose key equals that of the stored record `B`:
//!
//! 1. Different sizes are never duplicates.
//! 2. If `A` and `B` are already the same file on disk, reading is skipped.
//! 3. Otherwise both files are compared in [`COMPARE_CHUNK`] pieces.
//! 4. In report mode that is all.
//! 5. Read-only duplicates are skipped unless explicitly allowed.
//! 6. Hard-linking refuses no-op links and originals at [`MAX_HARDLINKS`].
//! 7. The duplicate is deleted and, when linking, re-created as a link to
//!    `B` carrying `A`'s old permissions and modification time.
//!
//! With a script attached, step 7 is written to the script instead and the
//! filesystem is left alone.
//!
//! # Safety
//!
//! Once a mutation starts, any failure is returned as [`ActionError`] and the
//! run stops. Failure to restore permissions or timestamps only warns.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use crate::duplicates::{Candidate, FileRecord, Resolver, Statistics};
use crate::output::script::{ScriptEntry, ScriptWriter};
use crate::platform::{mode_bits, with_owner_write, FileSystem};
use crate::progress::ProgressCallback;
use crate::scanner::{read_full, ScanError};

use super::{ActionError, DupeAction, Resolution};

/// Most links one physical file may carry.
pub const MAX_HARDLINKS: u32 = 1023;

/// Bytes compared per read during full verification.
pub const COMPARE_CHUNK: usize = 0x10000;

/// How duplicates are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// What to do with a confirmed duplicate.
    pub action: DupeAction,
    /// Allow mutating read-only duplicates.
    pub touch_readonly: bool,
    /// Print each duplicate pair.
    pub print_duplicates: bool,
}

/// Resolves collisions reported by the duplicate index.
pub struct ActionEngine<F: FileSystem, W: Write = BufWriter<File>> {
    fs: F,
    options: EngineOptions,
    progress: Arc<dyn ProgressCallback>,
    script: Option<ScriptWriter<W>>,
}

impl<F: FileSystem> ActionEngine<F> {
    /// Create an engine that acts on the filesystem directly.
    #[must_use]
    pub fn new(fs: F, options: EngineOptions, progress: Arc<dyn ProgressCallback>) -> Self {
        Self {
            fs,
            options,
            progress,
            script: None,
        }
    }
}

impl<F: FileSystem, W: Write> ActionEngine<F, W> {
    /// Create an engine that writes actions to `script` instead.
    #[must_use]
    pub fn with_script(
        fs: F,
        options: EngineOptions,
        progress: Arc<dyn ProgressCallback>,
        script: ScriptWriter<W>,
    ) -> Self {
        Self {
            fs,
            options,
            progress,
            script: Some(script),
        }
    }

    /// Resolution options in effect.
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Flush the script, if any, and return its writer.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing the script fails.
    pub fn finish(self) -> io::Result<Option<W>> {
        self.script.map(ScriptWriter::finish).transpose()
    }

    /// Compare `size` bytes of two files.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if either file cannot be opened or ends early.
    pub fn contents_equal(&self, a: &Path, b: &Path, size: u64) -> Result<bool, ScanError> {
        let mut reader_a = self.fs.open(a).map_err(|e| ScanError::from_io(a, e))?;
        let mut reader_b = self.fs.open(b).map_err(|e| ScanError::from_io(b, e))?;
        let chunk = usize::try_from(size).map_or(COMPARE_CHUNK, |s| s.min(COMPARE_CHUNK));
        let mut buf_a = vec![0u8; chunk];
        let mut buf_b = vec![0u8; chunk];

        let mut left = size;
        while left > 0 {
            let want = usize::try_from(left).map_or(chunk, |l| l.min(chunk));
            read_chunk(a, &mut reader_a, &mut buf_a[..want])?;
            read_chunk(b, &mut reader_b, &mut buf_b[..want])?;
            if buf_a[..want] != buf_b[..want] {
                return Ok(false);
            }
            left -= want as u64;
        }
        Ok(true)
    }

    fn report(&self, line: &str) {
        self.progress.on_report(line);
    }
}

fn read_chunk<R: Read>(path: &Path, reader: &mut R, buf: &mut [u8]) -> Result<(), ScanError> {
    let got = read_full(reader, buf).map_err(|e| ScanError::from_io(path, e))?;
    if got == buf.len() {
        Ok(())
    } else {
        Err(ScanError::ShortRead {
            path: path.to_path_buf(),
            expected: buf.len() as u64,
            actual: got as u64,
        })
    }
}

impl<F: FileSystem, W: Write> Resolver for ActionEngine<F, W> {
    fn resolve(
        &mut self,
        candidate: &Candidate<'_>,
        established: &FileRecord,
        stats: &mut Statistics,
    ) -> Result<Resolution, ActionError> {
        if candidate.size != established.size {
            return Ok(Resolution::NotDuplicate);
        }

        let path = candidate.path;
        if path == established.path {
            // Overlapping patterns met the same name twice.
            log::debug!("Already indexed: {}", path.display());
            return Ok(Resolution::NoOp);
        }
        let already_linked =
            established.link_count > 0 && candidate.identity == established.identity;

        if !already_linked {
            match self.contents_equal(path, &established.path, candidate.size) {
                Ok(true) => stats.record_duplicate(candidate.size),
                Ok(false) => {
                    log::debug!(
                        "Key collision, contents differ: {} / {}",
                        path.display(),
                        established.path.display()
                    );
                    return Ok(Resolution::NotDuplicate);
                }
                Err(e) => {
                    log::warn!("Full compare failed: {e}");
                    return Ok(Resolution::NotDuplicate);
                }
            }
        }

        if self.options.print_duplicates {
            self.report(&format!("Duplicate: '{}'", established.path.display()));
            self.report(&format!("With:      '{}'", path.display()));
            if already_linked {
                self.report("    (hardlinked instances of same file)");
            }
        }

        if self.options.action == DupeAction::Report {
            return Ok(Resolution::NoOp);
        }

        let stat = self.fs.metadata(path).map_err(|source| ActionError::Stat {
            path: path.to_path_buf(),
            source,
        })?;
        let readonly = stat.is_readonly();

        if readonly && !self.options.touch_readonly {
            self.report(&format!(
                "Skipping duplicate readonly file '{}'",
                path.display()
            ));
            stats.readonly_skipped += 1;
            return Ok(Resolution::SkippedReadOnly);
        }

        let link = self.options.action == DupeAction::HardLink;
        if link {
            if already_linked {
                return Ok(Resolution::NoOp);
            }
            if established.link_count >= MAX_HARDLINKS {
                log::warn!(
                    "'{}' already has {} links; not linking '{}'",
                    established.path.display(),
                    established.link_count,
                    path.display()
                );
                stats.link_limit_reached += 1;
                return Ok(Resolution::LinkLimitReached);
            }
        }
        let done = if link {
            Resolution::Hardlinked
        } else {
            Resolution::Deleted
        };

        if let Some(script) = self.script.as_mut() {
            script
                .write_entry(&ScriptEntry {
                    duplicate: path,
                    original: &established.path,
                    readonly,
                    mode: mode_bits(&stat.permissions),
                    link,
                })
                .map_err(ActionError::Script)?;
            return Ok(done);
        }

        if readonly {
            self.fs
                .set_permissions(path, with_owner_write(&stat.permissions))
                .map_err(|source| ActionError::MakeWritable {
                    path: path.to_path_buf(),
                    source,
                })?;
        }

        self.fs
            .remove_file(path)
            .map_err(|source| ActionError::Delete {
                path: path.to_path_buf(),
                source,
            })?;

        if !link {
            log::debug!("Deleted {}", path.display());
            self.report("    Deleted duplicate");
            return Ok(done);
        }

        self.fs
            .hard_link(&established.path, path)
            .map_err(|source| ActionError::Link {
                original: established.path.clone(),
                link: path.to_path_buf(),
                source,
            })?;

        // The link shares the original's inode, so this rewrites both names.
        if let Err(e) = self.fs.set_permissions(path, stat.permissions.clone()) {
            log::warn!("Could not restore permissions on '{}': {}", path.display(), e);
        }
        if let Err(e) = self.fs.set_times(path, stat.modified) {
            log::warn!("Could not restore times on '{}': {}", path.display(), e);
        }
        log::debug!(
            "Linked {} -> {}",
            path.display(),
            established.path.display()
        );
        self.report("    Created hardlink");
        Ok(done)
    }
}
