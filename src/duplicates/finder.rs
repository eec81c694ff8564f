//! Per-file scan pipeline.
//!
//! # Overview
//!
//! [`DupeFinder`] drives one run:
//! 1. Each pattern is expanded by the [`PathWalker`]
//! 2. Each path is queried for size, identity and link count
//! 3. The key is computed: the content [`Signature`], or the file identity in
//!    hard-link listing mode
//! 4. The file is inserted into the [`DuplicateIndex`]; collisions go to the
//!    [`ActionEngine`] unless the pattern is a reference pattern
//!
//! A path matched again by a later pattern is skipped. Unreadable files are
//! counted and skipped. Failures during a mutation stop the run.
//!
//! # Example
//!
//! ```no_run
//! use dupelink::duplicates::{DupeFinder, FinderConfig};
//! use dupelink::platform::OsFileSystem;
//!
//! let mut finder = DupeFinder::new(OsFileSystem, FinderConfig::default());
//! finder.scan_pattern("photos/**/*.jpg", false).unwrap();
//! let outcome = finder.finish().unwrap();
//! println!("{} duplicates", outcome.stats.duplicate_files);
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::actions::{ActionEngine, DupeAction, EngineOptions};
use crate::output::script::{ScriptType, ScriptWriter};
use crate::output::summary;
use crate::platform::{FileId, FileSystem};
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::walker::SEPARATOR;
use crate::scanner::{file_signature, PathWalker, ScanError, Signature};

use super::{Candidate, Collision, DuplicateIndex, FinderError, IndexMode, Statistics};

/// Configuration for a scan.
#[derive(Clone)]
pub struct FinderConfig {
    /// How confirmed duplicates are handled.
    pub engine: EngineOptions,
    /// Key the index by identity and list hard-link groups instead.
    pub list_links: bool,
    /// Index zero-length files too.
    pub include_zero_length: bool,
    /// Descend into symlinked directories and reparse points.
    pub follow_reparse: bool,
    /// Do not warn about unreadable files.
    pub hide_unreadable: bool,
    /// Print each file's signature.
    pub print_signatures: bool,
    /// Print each file's identity and link count.
    pub verbose: bool,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("engine", &self.engine)
            .field("list_links", &self.list_links)
            .field("include_zero_length", &self.include_zero_length)
            .field("follow_reparse", &self.follow_reparse)
            .field("hide_unreadable", &self.hide_unreadable)
            .field("print_signatures", &self.print_signatures)
            .field("verbose", &self.verbose)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            engine: EngineOptions {
                action: DupeAction::Report,
                touch_readonly: false,
                print_duplicates: true,
            },
            list_links: false,
            include_zero_length: false,
            follow_reparse: false,
            hide_unreadable: false,
            print_signatures: false,
            verbose: false,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set how duplicates are resolved.
    #[must_use]
    pub fn with_engine(mut self, engine: EngineOptions) -> Self {
        self.engine = engine;
        self
    }

    /// Switch to hard-link listing mode.
    #[must_use]
    pub fn with_list_links(mut self, list_links: bool) -> Self {
        self.list_links = list_links;
        self
    }

    /// Include zero-length files.
    #[must_use]
    pub fn with_zero_length(mut self, include: bool) -> Self {
        self.include_zero_length = include;
        self
    }

    /// Follow symlinked directories and reparse points.
    #[must_use]
    pub fn with_follow_reparse(mut self, follow: bool) -> Self {
        self.follow_reparse = follow;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Which key the index uses.
    #[must_use]
    pub fn index_mode(&self) -> IndexMode {
        if self.list_links {
            IndexMode::Identity
        } else {
            IndexMode::Content
        }
    }
}

/// Everything a finished scan leaves behind.
#[derive(Debug)]
pub struct FinderOutcome<W = BufWriter<File>> {
    /// Run counters.
    pub stats: Statistics,
    /// Surviving records.
    pub index: DuplicateIndex,
    /// Patterns that matched no files.
    pub unmatched: Vec<String>,
    /// The flushed script writer, if a script was written.
    pub script: Option<W>,
}

/// Drives the scan of one or more patterns.
pub struct DupeFinder<F: FileSystem + Clone, W: Write = BufWriter<File>> {
    fs: F,
    config: FinderConfig,
    progress: Arc<dyn ProgressCallback>,
    engine: ActionEngine<F, W>,
    index: DuplicateIndex,
    stats: Statistics,
    script_identity: Option<FileId>,
    seen: HashSet<PathBuf>,
    unmatched: Vec<String>,
}

impl<F: FileSystem + Clone> DupeFinder<F> {
    /// Create a finder that acts on the filesystem directly.
    #[must_use]
    pub fn new(fs: F, config: FinderConfig) -> Self {
        let progress = progress_of(&config);
        let engine = ActionEngine::new(fs.clone(), config.engine, Arc::clone(&progress));
        Self::assemble(fs, config, progress, engine, None)
    }

    /// Create a finder that writes its actions to a new script at `path`.
    ///
    /// The script itself is never scanned.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::ScriptOpen`] if the file cannot be created or
    /// its header cannot be written.
    pub fn with_script_file(
        fs: F,
        config: FinderConfig,
        path: &Path,
        script_type: ScriptType,
    ) -> Result<Self, FinderError> {
        let open_error = |source| FinderError::ScriptOpen {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(open_error)?;
        let script = ScriptWriter::new(BufWriter::new(file), script_type).map_err(open_error)?;
        let script_identity = fs.identity(path).ok().map(|i| i.id);
        log::info!("Writing {:?} script to {}", script_type, path.display());

        let progress = progress_of(&config);
        let engine =
            ActionEngine::with_script(fs.clone(), config.engine, Arc::clone(&progress), script);
        Ok(Self::assemble(
            fs,
            config,
            progress,
            engine,
            script_identity,
        ))
    }
}

fn progress_of(config: &FinderConfig) -> Arc<dyn ProgressCallback> {
    config
        .progress_callback
        .clone()
        .unwrap_or_else(|| Arc::new(Progress::new(true)))
}

impl<F: FileSystem + Clone, W: Write> DupeFinder<F, W> {
    /// Create a finder around an existing script writer.
    #[must_use]
    pub fn with_script(fs: F, config: FinderConfig, script: ScriptWriter<W>) -> Self {
        let progress = progress_of(&config);
        let engine =
            ActionEngine::with_script(fs.clone(), config.engine, Arc::clone(&progress), script);
        Self::assemble(fs, config, progress, engine, None)
    }

    fn assemble(
        fs: F,
        config: FinderConfig,
        progress: Arc<dyn ProgressCallback>,
        engine: ActionEngine<F, W>,
        script_identity: Option<FileId>,
    ) -> Self {
        Self {
            fs,
            config,
            progress,
            engine,
            index: DuplicateIndex::new(),
            stats: Statistics::new(),
            script_identity,
            seen: HashSet::new(),
            unmatched: Vec::new(),
        }
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Records stored so far.
    #[must_use]
    pub fn index(&self) -> &DuplicateIndex {
        &self.index
    }

    /// Expand `pattern` and process every file it matches.
    ///
    /// Files from a reference pattern are indexed but never resolved as
    /// duplicates. Returns the number of paths the pattern matched.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if resolving a duplicate fails.
    pub fn scan_pattern(&mut self, pattern: &str, reference: bool) -> Result<u64, FinderError> {
        log::debug!(
            "Scanning '{}'{}",
            pattern,
            if reference { " (reference)" } else { "" }
        );
        let before = self.stats.files_matched;
        let fs = self.fs.clone();
        for path in PathWalker::new(&fs, pattern, self.config.follow_reparse) {
            self.process_file(&path, reference)?;
        }

        let matched = self.stats.files_matched - before;
        if matched == 0 {
            log::error!("No files matched '{}'", pattern);
            self.unmatched.push(pattern.to_string());
        }
        Ok(matched)
    }

    /// Run one path through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if resolving a duplicate fails.
    pub fn process_file(&mut self, path: &Path, reference: bool) -> Result<(), FinderError> {
        self.stats.files_matched += 1;
        self.progress
            .on_file(self.stats.files_matched, &path.to_string_lossy());

        // Overlapping patterns may match a path more than once.
        if !self.seen.insert(path.to_path_buf()) {
            log::debug!("Already processed: {}", path.display());
            return Ok(());
        }

        let stat = match self.fs.metadata(path) {
            Ok(stat) => stat,
            Err(e) => {
                self.cant_read(&ScanError::from_io(path, e));
                return Ok(());
            }
        };

        if stat.size == 0 && !self.config.include_zero_length {
            self.stats.zero_length_files += 1;
            return Ok(());
        }

        let identity = match self.fs.identity(path) {
            Ok(identity) => identity,
            Err(e) => {
                self.cant_read(&ScanError::from_io(path, e));
                return Ok(());
            }
        };

        if self.script_identity == Some(identity.id) {
            log::debug!("Skipping the script being written: {}", path.display());
            return Ok(());
        }

        if self.config.verbose {
            self.progress
                .on_report(&summary::identity_line(&identity, path));
        }

        let key = match self.config.index_mode() {
            IndexMode::Identity => {
                if identity.link_count <= 1 {
                    return Ok(());
                }
                Signature::from_identity(&identity.id)
            }
            IndexMode::Content => match file_signature(&self.fs, path, stat.size) {
                Ok(signature) => {
                    if self.config.print_signatures {
                        self.progress
                            .on_report(&summary::signature_line(signature, stat.size, path));
                    }
                    signature
                }
                Err(e) => {
                    self.cant_read(&e);
                    return Ok(());
                }
            },
        };

        let candidate = Candidate {
            key,
            identity: identity.id,
            link_count: identity.link_count,
            size: stat.size,
            path,
        };
        let collision = if reference || self.config.list_links {
            Collision::Chain
        } else {
            Collision::Resolve(&mut self.engine)
        };
        self.index.insert(candidate, collision, &mut self.stats)?;
        Ok(())
    }

    fn cant_read(&mut self, error: &ScanError) {
        self.stats.cant_read_files += 1;
        if !self.config.hide_unreadable {
            log::warn!("Could not read '{}': {}", error.path().display(), error);
        }
    }

    /// Flush the script and hand back the results.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::ScriptWrite`] if the script cannot be flushed.
    pub fn finish(self) -> Result<FinderOutcome<W>, FinderError> {
        let script = self.engine.finish().map_err(FinderError::ScriptWrite)?;
        Ok(FinderOutcome {
            stats: self.stats,
            index: self.index,
            unmatched: self.unmatched,
            script,
        })
    }
}

/// The literal directory prefix of a pattern, before any wildcard.
///
/// A pattern without wildcards is returned whole.
#[must_use]
pub fn literal_base(pattern: &str) -> &str {
    match pattern.find(['*', '?']) {
        None => pattern,
        Some(wild) => match pattern[..wild].rfind(SEPARATOR) {
            Some(0) => &pattern[..1],
            Some(sep) => &pattern[..sep],
            None => ".",
        },
    }
}

/// Make sure every pattern's base lives on the same volume.
///
/// Bases that cannot be queried are ignored; the walker reports them.
///
/// # Errors
///
/// Returns [`FinderError::CrossVolume`] naming the first pair that differs.
pub fn check_same_volume<F: FileSystem>(fs: &F, patterns: &[&str]) -> Result<(), FinderError> {
    let mut first: Option<(&str, u64)> = None;
    for pattern in patterns {
        let base = literal_base(pattern);
        let base = if base.is_empty() { "." } else { base };
        let Ok(identity) = fs.identity(Path::new(base)) else {
            continue;
        };
        match first {
            None => first = Some((pattern, identity.id.volume)),
            Some((first_pattern, volume)) if volume != identity.id.volume => {
                return Err(FinderError::CrossVolume {
                    first: first_pattern.to_string(),
                    second: pattern.to_string(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}
