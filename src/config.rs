//! Application configuration management.
//!
//! Two layers live here:
//!
//! - [`Config`]: persistent defaults, merged by `figment` from built-in
//!   values, `config.toml` in the platform config directory and `DUPELINK_*`
//!   environment variables (later layers win)
//! - [`RunConfig`]: the explicit settings of one run, built from the command
//!   line on top of a [`Config`]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actions::{DupeAction, EngineOptions};
use crate::cli::Cli;
use crate::duplicates::{FinderConfig, IndexMode};
use crate::output::ScriptType;
use crate::progress::ProgressCallback;

/// Prefix of the environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "DUPELINK_";

/// Persistent defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Index zero-length files.
    pub include_zero_length: bool,
    /// Descend into symlinked directories and reparse points.
    pub follow_reparse: bool,
    /// Do not warn about unreadable files.
    pub hide_unreadable: bool,
    /// Never show the progress indicator.
    pub hide_progress: bool,
    /// Script flavour used by `--bat`.
    pub script_type: ScriptType,
}

impl Config {
    /// Load the layered configuration, falling back to defaults on error.
    pub fn load() -> Self {
        match Self::figment().extract() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// The provider stack behind [`Config::load`].
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = Self::config_path() {
            log::trace!("Config file: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Render as TOML, as shown by `--show-config`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Platform-specific location of `config.toml`.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dupelink", "dupelink")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Option combinations rejected before any file is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Hard-link listing never changes files.
    #[error("--listlink cannot be combined with {0}")]
    ListLinkConflict(&'static str),
}

/// Settings of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// What to do with confirmed duplicates.
    pub action: DupeAction,
    /// Script to write instead of acting.
    pub script: Option<PathBuf>,
    /// Script flavour.
    pub script_type: ScriptType,
    /// Act on read-only duplicates too.
    pub touch_readonly: bool,
    /// Index zero-length files.
    pub include_zero_length: bool,
    /// Hard-link listing mode.
    pub list_links: bool,
    /// Descend into symlinked directories and reparse points.
    pub follow_reparse: bool,
    /// Do not warn about unreadable files.
    pub hide_unreadable: bool,
    /// Show the progress indicator.
    pub show_progress: bool,
    /// Print duplicate pairs.
    pub print_duplicates: bool,
    /// Print each file's signature.
    pub print_signatures: bool,
    /// Print each file's identity and link count.
    pub verbose: bool,
}

impl RunConfig {
    /// Combine the command line with the persistent defaults.
    ///
    /// Boolean switches can only be turned on by either layer. `-v` shows
    /// everything, including unreadable files; `--sigs` alone replaces the
    /// duplicate pairs with signature lines.
    #[must_use]
    pub fn from_cli(cli: &Cli, config: &Config) -> Self {
        let verbose = cli.verbose > 0;
        let action = if cli.delete {
            DupeAction::Delete
        } else if cli.hardlink || cli.bat.is_some() {
            DupeAction::HardLink
        } else {
            DupeAction::Report
        };

        Self {
            action,
            script: cli.bat.clone(),
            script_type: cli.script_type.unwrap_or(config.script_type),
            touch_readonly: cli.rdonly,
            include_zero_length: cli.zero_length || config.include_zero_length,
            list_links: cli.listlink,
            follow_reparse: cli.follow_reparse || config.follow_reparse,
            hide_unreadable: (cli.hide_unreadable || config.hide_unreadable) && !verbose,
            show_progress: !(cli.no_progress || cli.quiet || config.hide_progress),
            print_duplicates: verbose || !cli.sigs,
            print_signatures: verbose || cli.sigs,
            verbose,
        }
    }

    /// Reject combinations that make no sense together.
    ///
    /// # Errors
    ///
    /// Returns the first conflict found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.list_links {
            if self.script.is_some() {
                return Err(ConfigError::ListLinkConflict("--bat"));
            }
            match self.action {
                DupeAction::HardLink => return Err(ConfigError::ListLinkConflict("--hardlink")),
                DupeAction::Delete => return Err(ConfigError::ListLinkConflict("--del")),
                DupeAction::Report => {}
            }
            if self.touch_readonly {
                return Err(ConfigError::ListLinkConflict("--rdonly"));
            }
        }
        Ok(())
    }

    /// Which key the index is built on.
    #[must_use]
    pub fn index_mode(&self) -> IndexMode {
        if self.list_links {
            IndexMode::Identity
        } else {
            IndexMode::Content
        }
    }

    /// Options for the duplicate resolver.
    #[must_use]
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            action: self.action,
            touch_readonly: self.touch_readonly,
            print_duplicates: self.print_duplicates,
        }
    }

    /// Options for the scan driver.
    #[must_use]
    pub fn finder_config(&self, progress: Arc<dyn ProgressCallback>) -> FinderConfig {
        FinderConfig {
            engine: self.engine_options(),
            list_links: self.list_links,
            include_zero_length: self.include_zero_length,
            follow_reparse: self.follow_reparse,
            hide_unreadable: self.hide_unreadable,
            print_signatures: self.print_signatures && !self.list_links,
            verbose: self.verbose,
            progress_callback: Some(progress),
        }
    }
}
