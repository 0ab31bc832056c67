//! Diagnostic codes and helper functions for lexical and syntax errors.

use strand_diagnostics::{Category, Diagnostic, DiagnosticCode};
use strand_source::Span;

/// Unrecognized character or malformed literal.
pub const S000: DiagnosticCode = DiagnosticCode {
    category: Category::Syntax,
    number: 0,
};

/// Unexpected token.
pub const S001: DiagnosticCode = DiagnosticCode {
    category: Category::Syntax,
    number: 1,
};

/// Directive written after a declaration.
pub const S002: DiagnosticCode = DiagnosticCode {
    category: Category::Syntax,
    number: 2,
};

/// Creates a lexical error.
pub fn error_lexical(msg: &str, span: Span) -> Diagnostic {
    Diagnostic::error(S000, msg, span)
}

/// Creates an "expected X, found Y" error.
pub fn error_expected(what: &str, found: &str, span: Span) -> Diagnostic {
    Diagnostic::error(S001, format!("expected {what}, found {found}"), span)
}

/// Creates an error for a directive that follows a declaration.
pub fn error_directive_after_declaration(span: Span) -> Diagnostic {
    Diagnostic::error(
        S002,
        "directives must appear before any declarations",
        span,
    )
    .with_help("move this directive to the top of the file")
}
