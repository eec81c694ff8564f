//! Pattern walker producing a sorted, lazy stream of file paths.
//!
//! # Overview
//!
//! [`PathWalker`] expands shell-like patterns using nothing but single-level
//! directory listings:
//!
//! - `*` and `?` match within one path component
//! - a `**` component matches zero or more directory levels
//! - a pattern without wildcards naming a directory means `dir/**`
//! - a pattern without wildcards naming a file yields just that file
//!
//! Entries are sorted by name at every level so the output order is stable
//! across runs on the same tree. Directories that are symlinks or reparse
//! points are not descended into unless `follow_reparse` is set.
//!
//! # How `**` expands
//!
//! A pattern is split at the first component that still holds a wildcard.
//! When a `**` component is found it is removed, the shortened pattern is
//! matched, and then the pattern is retried as `prefix*/**/suffix`, which
//! descends one level and repeats. Pending work lives on an explicit stack,
//! so deep trees never grow the call stack.
//!
//! # Example
//!
//! ```no_run
//! use dupelink::platform::OsFileSystem;
//! use dupelink::scanner::PathWalker;
//!
//! for path in PathWalker::new(&OsFileSystem, "photos/**/*.jpg", false) {
//!     println!("{}", path.display());
//! }
//! ```

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::platform::FileSystem;

/// Path separator used in patterns.
pub const SEPARATOR: char = if cfg!(windows) { '\\' } else { '/' };

/// Longest combined path the walker will build.
pub const MAX_PATH_LEN: usize = if cfg!(windows) { 260 } else { 4096 };

const SEGMENT_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: !cfg!(windows),
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A pattern broken at its first wildcard component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSplit {
    /// Literal directory prefix, including its trailing separator.
    pub base: String,
    /// The single component to match against the base listing.
    pub segment: String,
    /// Everything after the segment (starts with a separator, or is empty).
    pub rest: String,
    /// Whether the segment selects directories (more path follows).
    pub match_dirs: bool,
    /// Pattern to retry afterwards when a `**` component was consumed.
    pub restart: Option<String>,
}

fn is_drive_mark(chars: &[char], i: usize) -> bool {
    cfg!(windows) && chars[i] == ':' && chars.get(i + 1) != Some(&SEPARATOR)
}

fn starts_component(chars: &[char], i: usize) -> bool {
    i == 0 || chars[i - 1] == SEPARATOR || (cfg!(windows) && chars[i - 1] == ':')
}

/// Split `pattern` into base, segment and remainder.
///
/// The first `**` component is removed before splitting and the position is
/// remembered in [`PatternSplit::restart`] as `prefix*/**/suffix`.
#[must_use]
pub fn split_pattern(pattern: &str) -> PatternSplit {
    let mut chars: Vec<char> = pattern.chars().collect();
    let mut match_dirs = true;
    let mut saw_wildcard = false;
    let mut star_star_at = None;
    let mut base_end = 0;
    let mut pattern_end;
    let mut i = 0;

    loop {
        let c = chars.get(i).copied();
        if matches!(c, Some('*' | '?')) {
            saw_wildcard = true;
        }

        if star_star_at.is_none()
            && c == Some('*')
            && chars.get(i + 1) == Some(&'*')
            && starts_component(&chars, i)
        {
            match chars.get(i + 2) {
                None => {
                    // x/** -> x/*
                    star_star_at = Some(i);
                    chars.truncate(i + 1);
                }
                Some(&next) if next == SEPARATOR => {
                    // x/**/y -> x/y
                    star_star_at = Some(i);
                    chars.drain(i..i + 3);
                }
                Some(_) => {}
            }
        }

        match chars.get(i) {
            None => {
                pattern_end = i;
                match_dirs = false;
                break;
            }
            Some(&ch) if ch == SEPARATOR || is_drive_mark(&chars, i) => {
                pattern_end = i;
                if saw_wildcard {
                    break;
                }
                base_end = i + 1;
            }
            Some(_) => {}
        }
        i += 1;
    }

    let restart = star_star_at.map(|at| {
        let mut retry: String = chars[..at].iter().collect();
        retry.push('*');
        retry.push(SEPARATOR);
        retry.push_str("**");
        retry.push(SEPARATOR);
        retry.extend(&chars[at..]);
        retry
    });

    PatternSplit {
        base: chars[..base_end].iter().collect(),
        segment: chars[base_end..pattern_end].iter().collect(),
        rest: chars[pattern_end..].iter().collect(),
        match_dirs,
        restart,
    }
}

/// Join a directory and a name, adding a separator only when needed.
///
/// Returns `None` when the result would exceed [`MAX_PATH_LEN`].
fn cat_path(base: &str, name: &str) -> Option<String> {
    if base.is_empty() {
        return Some(name.to_string());
    }
    if base.len() + name.len() > MAX_PATH_LEN - 2 {
        return None;
    }
    let mut joined = String::with_capacity(base.len() + name.len() + 1);
    joined.push_str(base);
    if !base.ends_with(SEPARATOR) && !(cfg!(windows) && base.ends_with(':')) {
        joined.push(SEPARATOR);
    }
    joined.push_str(name);
    Some(joined)
}

/// Compile one component into a matcher. Brackets are literal.
fn segment_matcher(segment: &str) -> Option<Pattern> {
    if segment.is_empty() {
        return None;
    }
    let mut escaped = String::with_capacity(segment.len() + 4);
    let mut prev_star = false;
    for c in segment.chars() {
        match c {
            '[' => escaped.push_str("[[]"),
            ']' => escaped.push_str("[]]"),
            '*' if prev_star => continue,
            _ => escaped.push(c),
        }
        prev_star = c == '*';
    }
    match Pattern::new(&escaped) {
        Ok(pattern) => Some(pattern),
        Err(e) => {
            log::debug!("Unusable pattern component '{}': {}", segment, e);
            None
        }
    }
}

fn normalize(pattern: &str) -> String {
    let mut pattern = if cfg!(windows) {
        pattern.replace('/', "\\")
    } else {
        pattern.to_string()
    };

    let chars: Vec<char> = pattern.chars().collect();
    let is_drive_root = cfg!(windows) && chars.len() == 3 && chars[1] == ':';
    if chars.len() > 1 && pattern.ends_with(SEPARATOR) && !is_drive_root {
        pattern.pop();
    }
    pattern
}

#[derive(Debug)]
enum Pending {
    Expand(String),
    Visit(PathBuf),
}

/// Lazy iterator over the files matched by one pattern.
pub struct PathWalker<'a, F: FileSystem> {
    fs: &'a F,
    follow_reparse: bool,
    pending: Vec<Pending>,
}

impl<'a, F: FileSystem> PathWalker<'a, F> {
    /// Start walking `pattern`.
    ///
    /// A wildcard-free pattern is resolved immediately: a directory becomes
    /// `dir/**`, a file is yielded as is, and a missing path yields nothing.
    pub fn new(fs: &'a F, pattern: &str, follow_reparse: bool) -> Self {
        let pattern = normalize(pattern);
        let mut pending = Vec::new();

        if pattern.contains(['*', '?']) {
            pending.push(Pending::Expand(pattern));
        } else {
            match fs.metadata(Path::new(&pattern)) {
                Ok(stat) if stat.is_dir => {
                    if let Some(all) = cat_path(&pattern, "**") {
                        pending.push(Pending::Expand(all));
                    }
                }
                Ok(_) => pending.push(Pending::Visit(PathBuf::from(pattern))),
                Err(e) => log::debug!("Cannot stat '{}': {}", pattern, e),
            }
        }

        Self {
            fs,
            follow_reparse,
            pending,
        }
    }

    fn expand(&mut self, pattern: &str) {
        let split = split_pattern(pattern);
        log::trace!(
            "Expand '{}': base '{}' segment '{}' dirs {}",
            pattern,
            split.base,
            split.segment,
            split.match_dirs
        );

        if let Some(restart) = split.restart {
            self.pending.push(Pending::Expand(restart));
        }

        let Some(matcher) = segment_matcher(&split.segment) else {
            return;
        };

        let dir = if split.base.is_empty() {
            Path::new(".")
        } else {
            Path::new(&split.base)
        };
        let mut names: Vec<String> = match self.fs.list_dir(dir) {
            Ok(entries) => entries
                .into_iter()
                .filter(|e| {
                    e.is_dir == split.match_dirs && matcher.matches_with(&e.name, SEGMENT_OPTIONS)
                })
                .map(|e| e.name)
                .collect(),
            Err(e) => {
                log::debug!("Cannot list {}: {}", dir.display(), e);
                return;
            }
        };
        names.sort_unstable();

        let mut work = Vec::with_capacity(names.len());
        for name in names {
            let Some(combined) = cat_path(&split.base, &name) else {
                log::debug!("Path too long, skipping {}{}", split.base, name);
                continue;
            };
            if !split.match_dirs {
                work.push(Pending::Visit(PathBuf::from(combined)));
            } else if self.follow_reparse || !self.fs.is_reparse_point(Path::new(&combined)) {
                work.push(Pending::Expand(combined + &split.rest));
            } else {
                log::debug!("Not descending into reparse point {}", combined);
            }
        }
        self.pending.extend(work.into_iter().rev());
    }
}

impl<F: FileSystem> Iterator for PathWalker<'_, F> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        while let Some(work) = self.pending.pop() {
            match work {
                Pending::Visit(path) => return Some(path),
                Pending::Expand(pattern) => self.expand(&pattern),
            }
        }
        None
    }
}
