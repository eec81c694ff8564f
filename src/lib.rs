//! dupelink - find byte-identical files and replace them with hard links
//!
//! Files matched by glob patterns (with `**` for any depth) are keyed by a
//! cheap signature over their first 32 KiB and size. Files whose keys collide
//! are compared byte by byte; confirmed duplicates are reported, replaced by a
//! hard link to the first copy found, deleted, or written to a script.
//! A second mode lists groups of files that are already hard-linked together.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod platform;
pub mod progress;
pub mod scanner;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actions::DupeAction;
use crate::cli::{Cli, PatternArg};
use crate::config::{Config, RunConfig};
use crate::duplicates::{
    check_same_volume, report_hardlink_groups, DupeFinder, FinderError, FinderOutcome,
};
use crate::error::ExitCode;
use crate::output::summary;
use crate::platform::OsFileSystem;
use crate::progress::{Progress, ProgressCallback};

/// Run dupelink with parsed arguments and return the exit code.
///
/// # Errors
///
/// Returns an error for invalid option combinations, a script that cannot be
/// created, or a fatal filesystem error while resolving a duplicate.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    log::debug!(
        "dupelink {} (log level {})",
        env!("CARGO_PKG_VERSION"),
        logging::current_level_name()
    );
    let config = Config::load();

    if cli.show_config {
        print!("{}", config.to_toml().context("rendering configuration")?);
        return Ok(ExitCode::Success);
    }

    let run = RunConfig::from_cli(&cli, &config);
    run.validate()?;
    let patterns = cli.pattern_args();

    if run.action == DupeAction::HardLink {
        let all: Vec<&str> = patterns.iter().map(|p| p.pattern.as_str()).collect();
        check_same_volume(&OsFileSystem, &all)?;
    }

    let progress = Arc::new(Progress::new(!run.show_progress));
    let finder_config = run.finder_config(progress.clone());
    let outcome = match &run.script {
        Some(path) => {
            let finder =
                DupeFinder::with_script_file(OsFileSystem, finder_config, path, run.script_type)?;
            scan(finder, &patterns, progress.as_ref())?
        }
        None => scan(
            DupeFinder::new(OsFileSystem, finder_config),
            &patterns,
            progress.as_ref(),
        )?,
    };

    Ok(report(&run, outcome, progress.as_ref()))
}

fn scan<W: std::io::Write>(
    mut finder: DupeFinder<OsFileSystem, W>,
    patterns: &[PatternArg],
    progress: &dyn ProgressCallback,
) -> Result<FinderOutcome<W>, FinderError> {
    progress.on_scan_start();
    let scanned = patterns
        .iter()
        .try_for_each(|arg| finder.scan_pattern(&arg.pattern, arg.reference).map(drop));
    progress.on_scan_end();
    scanned?;
    finder.finish()
}

fn report<W>(
    run: &RunConfig,
    outcome: FinderOutcome<W>,
    progress: &dyn ProgressCallback,
) -> ExitCode {
    let mut stats = outcome.stats;

    if run.list_links {
        report_hardlink_groups(&outcome.index, &mut stats, progress);
    } else if stats.total_files == 0 {
        log::error!("No files to process");
        return ExitCode::NothingToProcess;
    } else {
        for line in summary::totals(&stats) {
            progress.on_report(&line);
        }
    }

    for line in summary::skipped(&stats) {
        progress.on_report(&line);
    }
    log::info!("{}", summary::recap(&stats));
    if stats.readonly_skipped > 0 || stats.link_limit_reached > 0 {
        log::info!(
            "{} read-only duplicates skipped, {} duplicates over the hard-link limit",
            stats.readonly_skipped,
            stats.link_limit_reached
        );
    }

    if outcome.unmatched.is_empty() {
        ExitCode::Success
    } else {
        ExitCode::NoFilesMatched
    }
}
