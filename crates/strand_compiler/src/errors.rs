//! Diagnostic codes and helper functions for loading and directive problems.
//!
//! `I001`--`I002` are I/O problems with sources, `D001`--`D010` are
//! structural problems with library, part, import and export directives, and
//! `C001` reports an artifact that could not be persisted.

use strand_diagnostics::{Category, Diagnostic, DiagnosticCode};
use strand_source::Span;

/// A directive names a source that does not exist.
pub const I001: DiagnosticCode = DiagnosticCode {
    category: Category::Io,
    number: 1,
};

/// A source exists but could not be read.
pub const I002: DiagnosticCode = DiagnosticCode {
    category: Category::Io,
    number: 2,
};

/// The same unit is included twice by one library.
pub const D001: DiagnosticCode = DiagnosticCode {
    category: Category::Directive,
    number: 1,
};

/// Console and browser libraries imported together.
pub const D002: DiagnosticCode = DiagnosticCode {
    category: Category::Directive,
    number: 2,
};

/// An experimental system library is imported.
pub const D003: DiagnosticCode = DiagnosticCode {
    category: Category::Directive,
    number: 3,
};

/// An exported library has no `library` directive.
pub const D004: DiagnosticCode = DiagnosticCode {
    category: Category::Directive,
    number: 4,
};

/// An imported library has no `library` directive.
pub const D005: DiagnosticCode = DiagnosticCode {
    category: Category::Directive,
    number: 5,
};

/// Two imported libraries declare the same name.
pub const D006: DiagnosticCode = DiagnosticCode {
    category: Category::Directive,
    number: 6,
};

/// A part has no `part of` directive.
pub const D007: DiagnosticCode = DiagnosticCode {
    category: Category::Directive,
    number: 7,
};

/// A part has directives other than a single `part of`.
pub const D008: DiagnosticCode = DiagnosticCode {
    category: Category::Directive,
    number: 8,
};

/// A part names a library other than the one including it.
pub const D009: DiagnosticCode = DiagnosticCode {
    category: Category::Directive,
    number: 9,
};

/// An import or export targets a part instead of a library.
pub const D010: DiagnosticCode = DiagnosticCode {
    category: Category::Directive,
    number: 10,
};

/// An artifact could not be written.
pub const C001: DiagnosticCode = DiagnosticCode {
    category: Category::Compiler,
    number: 1,
};

/// Creates a missing source error at the directive naming it.
pub fn error_missing_source(uri: &str, span: Span) -> Diagnostic {
    Diagnostic::error(I001, format!("cannot find source '{uri}'"), span)
}

/// Creates an error for a source that exists but cannot be read.
pub fn error_unreadable_source(uri: &str, reason: &str, span: Span) -> Diagnostic {
    Diagnostic::error(I002, format!("cannot read '{uri}': {reason}"), span)
}

/// Creates a duplicate part error.
pub fn error_unit_already_included(uri: &str, span: Span) -> Diagnostic {
    Diagnostic::error(D001, format!("unit '{uri}' was already included"), span)
}

/// Creates the console/browser combination error.
pub fn error_console_browser_mix(span: Span) -> Diagnostic {
    Diagnostic::error(
        D002,
        "console and browser libraries cannot be used together",
        span,
    )
    .with_note("'std:io' needs a console process and 'std:html' needs a browser document")
}

/// Creates the warning for an experimental library.
pub fn warning_not_fully_implemented(uri: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(
        D003,
        format!("'{uri}' is not fully implemented yet"),
        span,
    )
}

/// Creates an error for exporting a library without a name.
pub fn error_export_without_name(path: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        D004,
        format!("exported library '{path}' has no library directive"),
        span,
    )
}

/// Creates an error for importing a library without a name.
pub fn error_import_without_name(path: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        D005,
        format!("imported library '{path}' has no library directive"),
        span,
    )
}

/// Creates a duplicate imported library name error.
pub fn error_duplicate_imported_name(name: &str, first: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        D006,
        format!("library name '{name}' is already imported from '{first}'"),
        span,
    )
}

/// Creates a missing `part of` error.
pub fn error_missing_part_of(library: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        D007,
        "part is missing a 'part of' directive",
        span,
    )
    .with_help(format!("add 'part of {library};' at the top of the file"))
}

/// Creates an error for directives a part may not contain.
pub fn error_illegal_part_directives(path: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        D008,
        format!("part '{path}' may only contain a single 'part of' directive"),
        span,
    )
}

/// Creates a wrong `part of` name error.
pub fn error_wrong_part_of_name(expected: &str, found: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        D009,
        format!("expected 'part of {expected}', found 'part of {found}'"),
        span,
    )
}

/// Creates an error for an import or export of a part.
pub fn error_not_a_library(path: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        D010,
        format!("'{path}' is a part, not a library"),
        span,
    )
}

/// Creates an error for an artifact that could not be written.
pub fn error_artifact_write(what: &str, reason: &str) -> Diagnostic {
    Diagnostic::error(C001, format!("cannot write {what}: {reason}"), Span::DUMMY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_diagnostics::Severity;

    #[test]
    fn codes_display_with_prefix() {
        assert_eq!(format!("{I001}"), "I001");
        assert_eq!(format!("{D006}"), "D006");
        assert_eq!(format!("{C001}"), "C001");
    }

    #[test]
    fn experimental_import_is_a_warning() {
        let d = warning_not_fully_implemented("std:mirrors", Span::DUMMY);
        assert_eq!(d.severity, Severity::Warning);
        assert!(!d.is_type_problem());
        let d = error_console_browser_mix(Span::DUMMY);
        assert_eq!(d.severity, Severity::Error);
    }

    #[test]
    fn messages_name_the_directive_target() {
        let d = error_duplicate_imported_name("util", "lib/util.st", Span::DUMMY);
        assert!(d.message.contains("'util'"));
        assert!(d.message.contains("lib/util.st"));
        let d = error_wrong_part_of_name("app", "other", Span::DUMMY);
        assert_eq!(d.message, "expected 'part of app', found 'part of other'");
    }
}
