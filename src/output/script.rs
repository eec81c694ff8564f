//! Deferred-action script generation.
//!
//! With `--bat <FILE>` nothing on disk is touched while scanning. Each
//! resolved duplicate becomes a small block of commands instead, and running
//! the script later performs the same deletes and links.
//!
//! # Features
//!
//! * **Two flavours**: Windows batch (`del`, `fsutil hardlink create`) and
//!   POSIX shell (`rm`, `ln`).
//! * **Read-only aware**: forced delete and permission restore for files that
//!   were read-only.
//! * **Robust Escaping**: `%` is doubled in batch files; POSIX paths are
//!   single-quoted.
//!
//! # Usage
//!
//! ```
//! use dupelink::output::script::{ScriptEntry, ScriptType, ScriptWriter};
//! use std::path::Path;
//!
//! let mut script = ScriptWriter::new(Vec::new(), ScriptType::Posix).unwrap();
//! script
//!     .write_entry(&ScriptEntry {
//!         duplicate: Path::new("b.txt"),
//!         original: Path::new("a.txt"),
//!         readonly: false,
//!         mode: 0o644,
//!         link: true,
//!     })
//!     .unwrap();
//! let text = String::from_utf8(script.finish().unwrap()).unwrap();
//! assert!(text.contains("ln 'a.txt' 'b.txt'"));
//! ```

use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Type of script to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    /// Windows batch file (cmd.exe)
    Batch,
    /// POSIX-compliant shell script (sh/bash/zsh)
    Posix,
}

impl ScriptType {
    /// Detect the appropriate script type for the current platform.
    #[must_use]
    pub fn detect() -> Self {
        if cfg!(windows) {
            Self::Batch
        } else {
            Self::Posix
        }
    }
}

impl Default for ScriptType {
    fn default() -> Self {
        Self::detect()
    }
}

/// One resolved duplicate, as the script should replay it.
#[derive(Debug, Clone, Copy)]
pub struct ScriptEntry<'a> {
    /// Path to remove (and re-create as a link).
    pub duplicate: &'a Path,
    /// First-seen copy that stays.
    pub original: &'a Path,
    /// Whether the duplicate was read-only.
    pub readonly: bool,
    /// Permission bits of the duplicate, for restoring read-only files.
    pub mode: u32,
    /// Re-create the duplicate as a hard link (otherwise delete only).
    pub link: bool,
}

/// Streams script commands to a writer.
pub struct ScriptWriter<W: Write> {
    writer: W,
    script_type: ScriptType,
    entries: usize,
}

impl<W: Write> ScriptWriter<W> {
    /// Start a script, writing its header immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn new(mut writer: W, script_type: ScriptType) -> io::Result<Self> {
        match script_type {
            ScriptType::Batch => {
                writeln!(writer, "@echo off")?;
                writeln!(writer, "REM Batch file for replacing duplicates with hard links")?;
                writeln!(writer, "REM created by dupelink")?;
            }
            ScriptType::Posix => {
                writeln!(writer, "#!/bin/sh")?;
                writeln!(writer, "set +x")?;
                writeln!(writer, "# Script for replacing duplicates with hard links")?;
                writeln!(writer, "# created by dupelink")?;
            }
        }
        writeln!(writer)?;
        Ok(Self {
            writer,
            script_type,
            entries: 0,
        })
    }

    /// Append the commands for one duplicate.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_entry(&mut self, entry: &ScriptEntry<'_>) -> io::Result<()> {
        match self.script_type {
            ScriptType::Batch => self.write_batch(entry)?,
            ScriptType::Posix => self.write_posix(entry)?,
        }
        self.entries += 1;
        Ok(())
    }

    fn write_batch(&mut self, entry: &ScriptEntry<'_>) -> io::Result<()> {
        let duplicate = escape_batch(entry.duplicate);
        let force = if entry.readonly { "/F" } else { "" };
        writeln!(self.writer, "del {force} {duplicate}")?;
        if entry.link {
            writeln!(
                self.writer,
                "fsutil hardlink create {} {}",
                duplicate,
                escape_batch(entry.original)
            )?;
            if entry.readonly {
                writeln!(self.writer, "attrib +r {duplicate}")?;
            }
        } else {
            writeln!(self.writer, "rem duplicate of {}", escape_batch(entry.original))?;
        }
        Ok(())
    }

    fn write_posix(&mut self, entry: &ScriptEntry<'_>) -> io::Result<()> {
        let duplicate = escape_posix(entry.duplicate);
        if entry.readonly {
            writeln!(self.writer, "rm -f {duplicate}")?;
        } else {
            writeln!(self.writer, "rm {duplicate}")?;
        }
        if entry.link {
            writeln!(
                self.writer,
                "ln {} {}",
                escape_posix(entry.original),
                duplicate
            )?;
            if entry.readonly {
                writeln!(self.writer, "chmod {:o} {}", entry.mode, duplicate)?;
            }
        } else {
            writeln!(self.writer, "# duplicate of {}", escape_posix(entry.original))?;
        }
        Ok(())
    }

    /// Number of entries written so far.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Flush and hand back the writer.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

fn escape_batch(path: &Path) -> String {
    let s = path.to_string_lossy();
    // Double quotes; % would otherwise expand as a variable
    format!("\"{}\"", s.replace('%', "%%"))
}

fn escape_posix(path: &Path) -> String {
    let s = path.to_string_lossy();
    // Wrap in single quotes, escape single quotes as '\''
    format!("'{}'", s.replace('\'', "'\\''"))
}
