//! Errors of context operations and the diagnostics the context reports
//! itself.

use strand_common::InternalError;
use strand_diagnostics::{Category, Diagnostic, DiagnosticCode};
use strand_resolver::ResolveError;
use strand_source::Span;
use thiserror::Error;

/// An HTML script tag names a library that does not exist.
pub const I003: DiagnosticCode = DiagnosticCode {
    category: Category::Io,
    number: 3,
};

/// Creates an error for a script source that cannot be found.
pub fn error_missing_script(uri: &str, span: Span) -> Diagnostic {
    Diagnostic::error(I003, format!("cannot find script source '{uri}'"), span)
}

/// Why a context operation produced no value.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The source could not be read.
    #[error("cannot read '{uri}': {source}")]
    Unreadable {
        /// The source's URI.
        uri: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The source holds no Strand code.
    #[error("'{0}' is not a Strand source")]
    NotAUnit(String),
    /// An HTML operation was asked of another kind of source.
    #[error("'{0}' is not an HTML file")]
    NotHtml(String),
    /// A unit was resolved within a library that does not include it.
    #[error("'{unit}' is not a unit of '{library}'")]
    NotInLibrary {
        /// The unit's URI.
        unit: String,
        /// The library's URI.
        library: String,
    },
    /// A library operation was asked of a part.
    #[error("cannot compute a library element for the part '{0}'")]
    NotALibrary(String),
    /// The caller cancelled a resolution.
    #[error("analysis was cancelled")]
    Cancelled,
    /// Broken installation, such as a missing core library.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl From<ResolveError> for ContextError {
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
    fn resolve_errors_convert() {
        let err: ContextError = ResolveError::Cancelled.into();
        assert!(matches!(err, ContextError::Cancelled));
        let err: ContextError =
            ResolveError::Internal(InternalError::new("Could not resolve std:core")).into();
        assert!(err.to_string().contains("Could not resolve std:core"));
    }

    #[test]
    fn unreadable_names_the_source() {
        let err = ContextError::Unreadable {
            uri: "/p/a.st".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.to_string(), "cannot read '/p/a.st': gone");
    }
}
