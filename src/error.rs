//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the certscan application.
///
/// - 0: Success (certificate resolved, or payload printed)
/// - 1: General error (unexpected failure)
/// - 2: Not resolved (no code, malformed payload, stopped, timed out)
/// - 3: Source unavailable (camera feed missing or refused)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: a certificate identifier was handed off.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Not resolved: the scan ended without a usable certificate.
    NotResolved = 2,
    /// Source unavailable: the capture source could not be opened or was lost.
    SourceUnavailable = 3,
    /// Interrupted: Scan was interrupted by user (Ctrl+C).
    Interrupted = 130,
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
            Self::Success => "CS000",
            Self::GeneralError => "CS001",
            Self::NotResolved => "CS002",
            Self::SourceUnavailable => "CS003",
            Self::Interrupted => "CS130",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "CS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
