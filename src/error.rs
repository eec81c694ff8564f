//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the dupelink binary.
///
/// - 0: Success (the run completed)
/// - 1: General error (fatal filesystem error, bad configuration, unexpected failure)
/// - 2: A pattern matched no files
/// - 3: Nothing to process (no files survived filtering)
///
/// clap's own usage errors exit with status 2 before any of these apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed.
    Success = 0,
    /// General error: the run was aborted.
    GeneralError = 1,
    /// At least one pattern matched no files.
    NoFilesMatched = 2,
    /// No file was left to process.
    NothingToProcess = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DL000",
            Self::GeneralError => "DL001",
            Self::NoFilesMatched => "DL002",
            Self::NothingToProcess => "DL003",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DL001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}
