//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements
//! [`ProgressCallback`] to show a `Scanned N files: <path>` spinner on stderr
//! while patterns are walked.
//!
//! Operator-facing report lines (duplicate pairs, signatures, action results)
//! also go through the callback so the spinner can be cleared before the line
//! is written to stdout.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Longest path shown next to the file counter.
const MAX_SHOWN_PATH: usize = 100;

/// Progress callback for the scan.
///
/// Implement this trait to receive progress updates and report lines.
pub trait ProgressCallback: Send + Sync {
    /// Called once before the first pattern is walked.
    fn on_scan_start(&self);

    /// Called for each path the walker produces.
    ///
    /// # Arguments
    ///
    /// * `count` - Paths matched so far (1-based)
    /// * `path` - Path about to be processed
    fn on_file(&self, count: u64, path: &str);

    /// Called once after the last pattern.
    fn on_scan_end(&self);

    /// Print one line of the operator report on stdout.
    fn on_report(&self, line: &str) {
        println!("{line}");
    }
}

/// Progress reporter using indicatif.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no spinner is displayed; report lines still print.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupelink::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn scanning_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} Scanned {pos} files: {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(ref pb) = *guard {
                f(pb);
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_scan_start(&self) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        pb.set_style(Self::scanning_style());
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(pb);
        }
    }

    fn on_file(&self, count: u64, path: &str) {
        self.with_bar(|pb| {
            pb.set_position(count);
            pb.set_message(truncate_path(path, MAX_SHOWN_PATH));
        });
    }

    fn on_scan_end(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn on_report(&self, line: &str) {
        let mut printed = false;
        self.with_bar(|pb| {
            pb.suspend(|| println!("{line}"));
            printed = true;
        });
        if !printed {
            println!("{line}");
        }
    }
}

/// Collects report lines in memory instead of printing them.
///
/// Useful when embedding the scanner or asserting on its output.
#[derive(Debug, Default)]
pub struct ReportLog {
    lines: Mutex<Vec<String>>,
}

impl ReportLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines reported so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ProgressCallback for ReportLog {
    fn on_scan_start(&self) {}

    fn on_file(&self, _count: u64, _path: &str) {}

    fn on_scan_end(&self) {}

    fn on_report(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// Cut a path to `max_len` characters, marking the cut with `...`.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }
    let head: String = path.chars().take(max_len).collect();
    format!("{head}...")
}
