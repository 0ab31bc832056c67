//! The outcome of a compile and its process exit code.

use std::fmt;

use strand_common::InternalError;
use strand_config::ExitCodeMode;
use strand_resolver::ResolveError;
use thiserror::Error;

/// Exit code of a process that crashed with an uncaught panic.
pub const CRASH_EXIT_CODE: i32 = 253;

/// Overall result of a compile.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CompileStatus {
    /// No problems.
    Ok,
    /// Only non-fatal warnings.
    Warnings,
    /// At least one fatal problem.
    Errors,
    /// The compile could not run to completion for another reason.
    Other,
}

impl CompileStatus {
    /// The extended exit code of this status.
    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Warnings => 1,
            Self::Errors => 2,
            Self::Other => 127,
        }
    }

    /// The process exit code under `mode`.
    ///
    /// In collapsed mode only errors fail the process.
    pub fn exit_code(self, mode: ExitCodeMode) -> i32 {
        match mode {
            ExitCodeMode::Extended => self.code(),
            ExitCodeMode::Collapse => match self {
                Self::Errors => 1,
                _ => 0,
            },
        }
    }
}

impl fmt::Display for CompileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "ok",
            Self::Warnings => "warnings",
            Self::Errors => "errors",
            Self::Other => "other",
        };
        f.write_str(text)
    }
}

/// Summary of one compile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileResult {
    /// Overall status.
    pub status: CompileStatus,
    /// Human-readable summary for failed compiles.
    pub message: Option<String>,
    /// Errors reported, type errors excluded.
    pub error_count: usize,
    /// Static type problems reported.
    pub type_error_count: usize,
    /// Warnings reported.
    pub warning_count: usize,
    /// Some unit's set of top-level names changed since the last compile.
    pub files_changed: bool,
}

impl CompileResult {
    /// The process exit code under `mode`.
    pub fn exit_code(&self, mode: ExitCodeMode) -> i32 {
        self.status.exit_code(mode)
    }
}

/// Why a compile produced no result.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Broken installation, such as a missing core library.
    #[error(transparent)]
    Internal(#[from] InternalError),
    /// The caller cancelled the compile.
    #[error("compilation was cancelled")]
    Cancelled,
}

impl From<ResolveError> for CompileError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Cancelled => Self::Cancelled,
            ResolveError::Internal(e) => Self::Internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_codes() {
        assert_eq!(CompileStatus::Ok.exit_code(ExitCodeMode::Extended), 0);
        assert_eq!(CompileStatus::Warnings.exit_code(ExitCodeMode::Extended), 1);
        assert_eq!(CompileStatus::Errors.exit_code(ExitCodeMode::Extended), 2);
        assert_eq!(CompileStatus::Other.exit_code(ExitCodeMode::Extended), 127);
    }

    #[test]
    fn collapsed_codes() {
        assert_eq!(CompileStatus::Ok.exit_code(ExitCodeMode::Collapse), 0);
        assert_eq!(CompileStatus::Warnings.exit_code(ExitCodeMode::Collapse), 0);
        assert_eq!(CompileStatus::Errors.exit_code(ExitCodeMode::Collapse), 1);
        assert_eq!(CompileStatus::Other.exit_code(ExitCodeMode::Collapse), 0);
    }

    #[test]
    fn resolve_errors_convert() {
        let err: CompileError = ResolveError::Cancelled.into();
        assert!(matches!(err, CompileError::Cancelled));
        let err: CompileError =
            ResolveError::Internal(InternalError::new("Could not resolve std:core")).into();
        assert_eq!(err.to_string(), "internal analysis error: Could not resolve std:core");
    }
}
