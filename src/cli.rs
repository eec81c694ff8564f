//! Command-line interface definitions for dupelink.
//!
//! All options are flat (no subcommands); patterns and `--ref` patterns may
//! be interleaved and are processed in the order they appear.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates among all JPEGs under photos/, at any depth
//! dupelink 'photos/**/*.jpg'
//!
//! # Replace duplicates with hard links, keeping the archive untouched
//! dupelink --hardlink --ref 'archive/**' 'incoming/**'
//!
//! # Write the actions to a script instead of performing them
//! dupelink --bat fix.sh --script-type posix 'music/**'
//!
//! # List groups of files that are already hard-linked together
//! dupelink --listlink 'projects/**'
//! ```

use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::output::ScriptType;

/// Find byte-identical files and replace them with hard links.
///
/// Patterns may use `*` and `?` within one path segment and `**` to match
/// any number of directories. A directory on its own is scanned recursively.
#[derive(Debug, Parser)]
#[command(name = "dupelink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v prints signatures, duplicates and link counts; -vv traces)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress everything except errors and the report
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub show_config: bool,

    /// Write the actions to a script instead of performing them
    ///
    /// Without --del the script replaces duplicates with hard links.
    #[arg(long, value_name = "FILE")]
    pub bat: Option<PathBuf>,

    /// Script flavour for --bat (default: batch on Windows, posix elsewhere)
    #[arg(long, value_enum, value_name = "TYPE", requires = "bat")]
    pub script_type: Option<ScriptType>,

    /// Replace duplicates with a hard link to the first copy found
    #[arg(long, conflicts_with = "delete")]
    pub hardlink: bool,

    /// Delete duplicates
    #[arg(long = "del")]
    pub delete: bool,

    /// Also act on read-only duplicates
    #[arg(long)]
    pub rdonly: bool,

    /// Include zero-length files
    #[arg(short = 'z', long)]
    pub zero_length: bool,

    /// List groups of files that are hard-linked together
    #[arg(long, conflicts_with_all = ["bat", "hardlink", "delete", "rdonly"])]
    pub listlink: bool,

    /// Descend into symlinked directories and reparse points
    #[arg(short = 'j', long)]
    pub follow_reparse: bool,

    /// Do not warn about files that cannot be read
    #[arg(short = 'u', long)]
    pub hide_unreadable: bool,

    /// Hide the progress indicator
    #[arg(short = 'p', long)]
    pub no_progress: bool,

    /// Print each file's signature
    #[arg(long)]
    pub sigs: bool,

    /// Reference pattern: its files are compared against but never touched
    ///
    /// Can be specified multiple times.
    #[arg(long = "ref", value_name = "PATTERN", action = ArgAction::Append)]
    pub reference: Vec<String>,

    /// File patterns to scan
    #[arg(value_name = "PATTERN", required_unless_present_any = ["reference", "show_config"])]
    pub patterns: Vec<String>,

    /// Patterns and reference patterns in command-line order.
    #[arg(skip)]
    ordered: Vec<PatternArg>,
}

/// One pattern in scan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternArg {
    /// The pattern text.
    pub pattern: String,
    /// Whether it came from `--ref`.
    pub reference: bool,
}

impl Cli {
    /// Parse the process arguments, exiting with clap's message on error.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::try_parse_ordered_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Parse `args` and remember where each pattern appeared.
    ///
    /// # Errors
    ///
    /// Returns clap's error for invalid or conflicting options.
    pub fn try_parse_ordered_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        let mut cli = Self::from_arg_matches(&matches)?;
        cli.ordered = ordered_patterns(&matches);
        Ok(cli)
    }

    /// Patterns in processing order.
    ///
    /// When the order is unknown (the value was built by `Cli::parse`),
    /// reference patterns come first.
    #[must_use]
    pub fn pattern_args(&self) -> Vec<PatternArg> {
        if !self.ordered.is_empty() {
            return self.ordered.clone();
        }
        let references = self.reference.iter().map(|p| PatternArg {
            pattern: p.clone(),
            reference: true,
        });
        let patterns = self.patterns.iter().map(|p| PatternArg {
            pattern: p.clone(),
            reference: false,
        });
        references.chain(patterns).collect()
    }
}

fn ordered_patterns(matches: &ArgMatches) -> Vec<PatternArg> {
    let mut indexed: Vec<(usize, PatternArg)> = Vec::new();
    for (id, reference) in [("reference", true), ("patterns", false)] {
        let (Some(indices), Some(values)) =
            (matches.indices_of(id), matches.get_many::<String>(id))
        else {
            continue;
        };
        indexed.extend(indices.zip(values).map(|(index, pattern)| {
            (
                index,
                PatternArg {
                    pattern: pattern.clone(),
                    reference,
                },
            )
        }));
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, arg)| arg).collect()
}
